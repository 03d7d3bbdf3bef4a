use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::wizard::{BookingWizard, WizardError};
use crate::models::BookingDraft;
use crate::services::lifecycle::{OrderTicket, PaymentSummary};

/// What the external checkout widget hands back after a successful payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutResponse {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// The gateway's checkout UI, opened between order creation and verification.
#[async_trait]
pub trait CheckoutWidget: Send + Sync {
    async fn open(&self, ticket: &OrderTicket, booking_id: &str)
        -> anyhow::Result<CheckoutResponse>;
}

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error("booking failed: {0}")]
    Booking(String),

    #[error("payment setup failed: {0}")]
    Order(String),

    #[error("checkout not completed: {0}")]
    Checkout(String),

    #[error("payment verification failed: {0}")]
    Verification(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowReceipt {
    pub booking_id: String,
    pub order_id: String,
    pub payment_id: String,
}

pub struct BookingApi {
    base_url: String,
    client: reqwest::Client,
}

impl BookingApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn create_booking(&self, draft: &BookingDraft) -> Result<String, FlowError> {
        let body = serde_json::to_value(draft).map_err(|e| FlowError::Booking(e.to_string()))?;
        let data = self
            .post_json("/api/bookings", &body)
            .await
            .map_err(|e| FlowError::Booking(format!("{e:#}")))?;

        data["bookingId"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| FlowError::Booking("bookingId missing from response".to_string()))
    }

    pub async fn create_order(&self, booking_id: &str, amount: f64) -> Result<OrderTicket, FlowError> {
        let data = self
            .post_json(
                "/api/payment/create-order",
                &json!({ "amount": amount, "bookingId": booking_id }),
            )
            .await
            .map_err(|e| FlowError::Order(format!("{e:#}")))?;

        serde_json::from_value(data).map_err(|e| FlowError::Order(e.to_string()))
    }

    pub async fn verify_payment(
        &self,
        booking_id: &str,
        checkout: &CheckoutResponse,
    ) -> Result<String, FlowError> {
        let data = self
            .post_json(
                "/api/payment/verify-payment",
                &json!({
                    "razorpay_order_id": checkout.razorpay_order_id,
                    "razorpay_payment_id": checkout.razorpay_payment_id,
                    "razorpay_signature": checkout.razorpay_signature,
                    "bookingId": booking_id,
                }),
            )
            .await
            .map_err(|e| FlowError::Verification(format!("{e:#}")))?;

        Ok(data["paymentId"]
            .as_str()
            .unwrap_or(&checkout.razorpay_payment_id)
            .to_string())
    }

    pub async fn payment_status(&self, booking_id: &str) -> anyhow::Result<PaymentSummary> {
        let resp = self
            .client
            .get(format!("{}/api/payment/status/{booking_id}", self.base_url))
            .send()
            .await
            .context("failed to reach booking server")?;
        let data = read_json(resp).await?;
        serde_json::from_value(data).context("unexpected payment status payload")
    }

    /// Runs create → order → checkout → verify for a wizard on its contact
    /// step. The first failure halts the flow and is returned as-is; nothing
    /// is retried.
    pub async fn complete(
        &self,
        wizard: &mut BookingWizard,
        checkout: &dyn CheckoutWidget,
    ) -> Result<FlowReceipt, FlowError> {
        let draft = wizard.draft()?;
        let amount = wizard.total_price();

        let booking_id = self.create_booking(&draft).await?;
        tracing::info!(booking_id = %booking_id, amount, "booking created, requesting payment order");

        let ticket = self.create_order(&booking_id, amount).await?;

        let response = checkout
            .open(&ticket, &booking_id)
            .await
            .map_err(|e| FlowError::Checkout(format!("{e:#}")))?;

        let payment_id = self.verify_payment(&booking_id, &response).await?;
        wizard.mark_submitted();

        Ok(FlowReceipt {
            booking_id,
            order_id: ticket.order_id,
            payment_id,
        })
    }

    async fn post_json(&self, path: &str, body: &Value) -> anyhow::Result<Value> {
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .context("failed to reach booking server")?;
        read_json(resp).await
    }
}

async fn read_json(resp: reqwest::Response) -> anyhow::Result<Value> {
    let status = resp.status();
    let data: Value = resp.json().await.context("failed to parse server response")?;

    if !status.is_success() {
        let message = data["error"].as_str().unwrap_or("server error");
        match data["details"].as_str() {
            Some(details) => anyhow::bail!("{message} ({status}): {details}"),
            None => anyhow::bail!("{message} ({status})"),
        }
    }
    Ok(data)
}
