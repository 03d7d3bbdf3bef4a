use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{check_auth, json_body};
use crate::errors::AppError;
use crate::models::{BookingDraft, BookingStatus};
use crate::services::lifecycle;
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BookingDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let draft = json_body(payload)?;

    let booking = {
        let db = state.db()?;
        lifecycle::create_booking(&db, draft)?
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "bookingId": booking.booking_id,
            "message": "Booking created successfully",
            "booking": booking,
        })),
    ))
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<BookingStatus>,
    pub limit: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let bookings = {
        let db = state.db()?;
        crate::db::queries::list_bookings(&db, query.status, limit)?
    };

    Ok(Json(json!({ "success": true, "bookings": bookings })))
}

// GET /api/bookings/:booking_id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let booking = {
        let db = state.db()?;
        lifecycle::get_booking(&db, &booking_id)?
    };

    Ok(Json(json!({ "success": true, "booking": booking })))
}

// PUT /api/bookings/:booking_id
#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: Option<BookingStatus>,
}

pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(booking_id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = json_body(payload)?
        .status
        .ok_or_else(|| AppError::Validation("status is required".to_string()))?;

    let booking = {
        let db = state.db()?;
        lifecycle::override_status(&db, &booking_id, status)?
    };

    Ok(Json(json!({
        "success": true,
        "message": "Booking updated successfully",
        "booking": booking,
    })))
}

// DELETE /api/bookings/:booking_id
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(booking_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let booking = {
        let db = state.db()?;
        lifecycle::cancel_booking(&db, &booking_id)?
    };

    Ok(Json(json!({
        "success": true,
        "message": "Booking cancelled successfully",
        "booking": booking,
    })))
}
