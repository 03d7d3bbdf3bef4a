use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{GatewayOrder, OrderRequest, PaymentGateway};

pub struct RazorpayGateway {
    key_id: String,
    key_secret: String,
    api_url: String,
    client: reqwest::Client,
}

impl RazorpayGateway {
    pub fn new(key_id: String, key_secret: String, api_url: String) -> Self {
        Self {
            key_id,
            key_secret,
            api_url: api_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, request: &OrderRequest) -> anyhow::Result<GatewayOrder> {
        let body = json!({
            "amount": request.amount,
            "currency": request.currency,
            "receipt": request.receipt,
            "payment_capture": 1,
        });

        let resp = self
            .client
            .post(format!("{}/orders", self.api_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .context("failed to call Razorpay API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse Razorpay response")?;

        if !status.is_success() {
            let description = data["error"]["description"]
                .as_str()
                .unwrap_or("unknown error");
            anyhow::bail!("Razorpay API error ({}): {}", status, description);
        }

        serde_json::from_value(data).context("unexpected Razorpay order payload")
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}
