use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::json_body;
use crate::errors::AppError;
use crate::models::LenientNumber;
use crate::services::lifecycle::{self, PaymentConfirmation, VerifyOutcome};
use crate::state::AppState;

// POST /api/payment/create-order
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub amount: Option<LenientNumber>,
    pub currency: Option<String>,
    pub booking_id: Option<String>,
}

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let req = json_body(payload)?;

    let amount = req.amount.as_ref().and_then(LenientNumber::as_f64);
    let booking_id = req.booking_id.filter(|id| !id.trim().is_empty());
    let (Some(amount), Some(booking_id)) = (amount.filter(|a| *a > 0.0), booking_id) else {
        return Err(AppError::Validation(
            "Amount and bookingId are required".to_string(),
        ));
    };

    tracing::info!(booking_id = %booking_id, amount, "create-order request");

    let currency = req.currency.filter(|c| !c.trim().is_empty());
    let ticket =
        lifecycle::place_order(&state, &booking_id, amount, currency.as_deref()).await?;

    Ok(Json(json!({
        "success": true,
        "orderId": ticket.order_id,
        "amount": ticket.amount,
        "currency": ticket.currency,
        "key": ticket.key,
    })))
}

// POST /api/payment/verify-payment
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[serde(alias = "razorpay_order_id")]
    pub order_id: Option<String>,
    #[serde(alias = "razorpay_payment_id")]
    pub payment_id: Option<String>,
    #[serde(alias = "razorpay_signature")]
    pub signature: Option<String>,
    pub booking_id: Option<String>,
}

pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let req = json_body(payload)?;

    let (Some(order_id), Some(payment_id), Some(signature), Some(booking_id)) =
        (req.order_id, req.payment_id, req.signature, req.booking_id)
    else {
        return Err(AppError::Validation(
            "orderId, paymentId, signature and bookingId are required".to_string(),
        ));
    };

    let confirmation = PaymentConfirmation {
        order_id,
        payment_id,
        signature,
        booking_id,
    };

    let outcome = {
        let db = state.db()?;
        lifecycle::verify_payment(&db, &state.config.razorpay_key_secret, &confirmation)?
    };

    let response = match outcome {
        VerifyOutcome::Verified(booking) => Json(json!({
            "success": true,
            "message": "Payment verified successfully",
            "paymentId": booking.payment_id,
        }))
        .into_response(),
        VerifyOutcome::Recorded(booking) => (
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "error": format!(
                    "Payment recorded but booking is {}",
                    booking.status.as_str()
                ),
                "paymentId": booking.payment_id,
            })),
        )
            .into_response(),
        VerifyOutcome::Rejected(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "Payment verification failed",
            })),
        )
            .into_response(),
    };

    Ok(response)
}

// GET /api/payment/status/:booking_id
pub async fn payment_status(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let summary = {
        let db = state.db()?;
        lifecycle::payment_summary(&db, &booking_id)?
    };

    Ok(Json(json!({
        "success": true,
        "paymentStatus": summary.payment_status,
        "paymentId": summary.payment_id,
        "razorpayOrderId": summary.razorpay_order_id,
    })))
}
