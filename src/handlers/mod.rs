pub mod bookings;
pub mod catalog;
pub mod health;
pub mod payment;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::errors::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route(
            "/api/bookings/:booking_id",
            get(bookings::get_booking)
                .put(bookings::update_booking)
                .delete(bookings::cancel_booking),
        )
        .route("/api/payment/create-order", post(payment::create_order))
        .route("/api/payment/verify-payment", post(payment::verify_payment))
        .route(
            "/api/payment/status/:booking_id",
            get(payment::payment_status),
        )
        .route("/api/packages", get(catalog::list_packages))
        .route("/api/packages/:id", get(catalog::get_package))
        .route("/api/guides", get(catalog::list_guides))
        .route("/api/vehicles", get(catalog::list_vehicles))
        .with_state(state)
}

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// Malformed JSON is a client error like any other missing field.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}
