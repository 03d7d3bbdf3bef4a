pub mod razorpay;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::errors::AppError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    /// Amount in minor currency units (paise for INR).
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: &OrderRequest) -> anyhow::Result<GatewayOrder>;

    /// Public key handed to the checkout widget.
    fn key_id(&self) -> &str;
}

pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn receipt_for(booking_id: &str) -> String {
    format!("receipt_{booking_id}")
}

/// Requests an auto-captured order for `amount` (major units) tagged with the
/// booking's receipt label.
pub async fn create_order(
    gateway: &dyn PaymentGateway,
    amount: f64,
    currency: &str,
    booking_id: &str,
) -> Result<GatewayOrder, AppError> {
    if booking_id.is_empty() || !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::Gateway(
            "Amount and bookingId are required".to_string(),
        ));
    }

    let request = OrderRequest {
        amount: to_minor_units(amount),
        currency: currency.to_string(),
        receipt: receipt_for(booking_id),
    };

    gateway
        .create_order(&request)
        .await
        .map_err(|e| AppError::Gateway(format!("{e:#}")))
}

/// Hex HMAC-SHA256 of `orderId|paymentId`, the value the checkout widget
/// returns as its signature.
pub fn sign(order_id: &str, payment_id: &str, secret: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn verify_signature(order_id: &str, payment_id: &str, signature: &str, secret: &str) -> bool {
    let expected = sign(order_id, payment_id, secret);
    !expected.is_empty() && constant_time_eq(&expected, signature)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}
