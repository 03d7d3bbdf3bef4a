use std::fmt;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingDraft, BookingStatus, BookingUpdate, PaymentStatus};
use crate::services::{booking_id, payment, pricing};
use crate::state::AppState;

const MAX_ID_ATTEMPTS: u32 = 3;

/// Where a booking sits in the create → order → verify sequence, derived from
/// its stored `status`, `paymentStatus` and order reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Created,
    Ordered,
    Paid,
    PaymentFailed,
    Cancelled,
    Completed,
}

impl LifecycleState {
    pub fn of(booking: &Booking) -> Self {
        match booking.status {
            BookingStatus::Cancelled => LifecycleState::Cancelled,
            BookingStatus::Completed => LifecycleState::Completed,
            BookingStatus::Confirmed => LifecycleState::Paid,
            BookingStatus::Pending => match booking.payment_status {
                PaymentStatus::Paid => LifecycleState::Paid,
                PaymentStatus::Failed => LifecycleState::PaymentFailed,
                PaymentStatus::Pending | PaymentStatus::Refunded => {
                    if booking.razorpay_order_id.is_some() {
                        LifecycleState::Ordered
                    } else {
                        LifecycleState::Created
                    }
                }
            },
        }
    }

    pub fn accepts_order(self) -> bool {
        matches!(
            self,
            LifecycleState::Created | LifecycleState::Ordered | LifecycleState::PaymentFailed
        )
    }

    pub fn accepts_verification(self) -> bool {
        matches!(self, LifecycleState::Ordered | LifecycleState::PaymentFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Created => "created",
            LifecycleState::Ordered => "ordered",
            LifecycleState::Paid => "paid",
            LifecycleState::PaymentFailed => "payment_failed",
            LifecycleState::Cancelled => "cancelled",
            LifecycleState::Completed => "completed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Create / read ──

pub fn create_booking(conn: &Connection, draft: BookingDraft) -> Result<Booking, AppError> {
    let new = draft.validate().map_err(AppError::Validation)?;
    let quote = pricing::quote(conn, &new)?;
    let now = queries::now_timestamp();

    let mut booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        booking_id: String::new(),
        name: new.name,
        email: new.email,
        phone: new.phone,
        special_requests: new.special_requests,
        booking_type: new.booking_type,
        package_id: new.package_id,
        start_date: new.start_date,
        number_of_people: new.number_of_people,
        selected_guide: new.selected_guide,
        selected_vehicle: new.selected_vehicle,
        selected_cities: new.selected_cities,
        selected_places: new.selected_places,
        custom_duration: new.custom_duration,
        total_price: quote.total,
        status: BookingStatus::Pending,
        payment_id: None,
        payment_status: PaymentStatus::Pending,
        razorpay_order_id: None,
        created_at: now,
        updated_at: now,
    };

    insert_with_fresh_id(conn, &mut booking, booking_id::generate)?;

    tracing::info!(
        booking_id = %booking.booking_id,
        booking_type = booking.booking_type.as_str(),
        total_price = booking.total_price,
        "booking created"
    );
    Ok(booking)
}

/// Inserts `booking` under an id drawn from `next_id`, drawing again when the
/// id is already taken, up to `MAX_ID_ATTEMPTS` times.
fn insert_with_fresh_id(
    conn: &Connection,
    booking: &mut Booking,
    mut next_id: impl FnMut() -> String,
) -> Result<(), AppError> {
    let mut attempt = 1;
    loop {
        booking.booking_id = next_id();
        match queries::insert_booking(conn, booking) {
            Ok(()) => return Ok(()),
            Err(e) if is_unique_violation(&e) && attempt < MAX_ID_ATTEMPTS => {
                tracing::warn!(booking_id = %booking.booking_id, attempt, "booking id collision, regenerating");
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

pub fn get_booking(conn: &Connection, booking_id: &str) -> Result<Booking, AppError> {
    queries::get_booking(conn, booking_id)?.ok_or_else(|| AppError::NotFound("Booking".into()))
}

fn apply_update(
    conn: &Connection,
    booking_id: &str,
    update: &BookingUpdate,
) -> Result<Booking, AppError> {
    queries::update_booking(conn, booking_id, update)?
        .ok_or_else(|| AppError::NotFound("Booking".into()))
}

// ── Administrative transitions ──

/// Sets `status` directly, bypassing the payment sub-state.
pub fn override_status(
    conn: &Connection,
    booking_id: &str,
    status: BookingStatus,
) -> Result<Booking, AppError> {
    let booking = apply_update(
        conn,
        booking_id,
        &BookingUpdate {
            status: Some(status),
            ..Default::default()
        },
    )?;

    if matches!(status, BookingStatus::Confirmed | BookingStatus::Completed)
        && booking.payment_status != PaymentStatus::Paid
    {
        tracing::warn!(
            booking_id,
            status = status.as_str(),
            payment_status = booking.payment_status.as_str(),
            "status overridden without a completed payment"
        );
    } else {
        tracing::info!(booking_id, status = status.as_str(), "booking status overridden");
    }

    Ok(booking)
}

/// Soft cancel. The payment status is left as it was.
pub fn cancel_booking(conn: &Connection, booking_id: &str) -> Result<Booking, AppError> {
    let booking = apply_update(
        conn,
        booking_id,
        &BookingUpdate {
            status: Some(BookingStatus::Cancelled),
            ..Default::default()
        },
    )?;
    tracing::info!(booking_id, "booking cancelled");
    Ok(booking)
}

// ── Payment transitions ──

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderTicket {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub key: String,
}

/// Issues a gateway order for the booking's stored total and attaches the
/// order id. `amount_hint` is what the client believes it owes; it is logged
/// when it disagrees but never charged.
pub async fn place_order(
    state: &AppState,
    booking_id: &str,
    amount_hint: f64,
    currency: Option<&str>,
) -> Result<OrderTicket, AppError> {
    let booking = {
        let db = state.db()?;
        get_booking(&db, booking_id)?
    };

    let lifecycle = LifecycleState::of(&booking);
    if !lifecycle.accepts_order() {
        return Err(AppError::InvalidState(format!(
            "booking {booking_id} is {lifecycle} and cannot take a new payment order"
        )));
    }

    let amount = booking.total_price;
    if amount <= 0.0 {
        return Err(AppError::Validation(
            "Booking total must be greater than zero".to_string(),
        ));
    }
    if (amount_hint - amount).abs() > 0.005 {
        tracing::warn!(booking_id, amount_hint, amount, "order amount differs from booking total, charging booking total");
    }

    let currency = currency.unwrap_or(state.config.default_currency.as_str());
    let order = payment::create_order(state.gateway.as_ref(), amount, currency, booking_id).await?;

    {
        let db = state.db()?;
        queries::insert_payment_order(&db, &order.id, booking_id, order.amount, &order.currency)?;
        apply_update(
            &db,
            booking_id,
            &BookingUpdate {
                razorpay_order_id: Some(order.id.clone()),
                payment_status: Some(PaymentStatus::Pending),
                ..Default::default()
            },
        )?;
    }

    tracing::info!(booking_id, order_id = %order.id, amount = order.amount, "payment order attached");

    Ok(OrderTicket {
        order_id: order.id,
        amount: order.amount,
        currency: order.currency,
        key: state.gateway.key_id().to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
    pub booking_id: String,
}

#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    Verified(Booking),
    /// Valid payment against a cancelled booking. The payment is stored for
    /// refund handling and the booking stays cancelled.
    Recorded(Booking),
    /// Signature mismatch. The booking is marked `paymentStatus=failed` and
    /// stays `pending` so the customer can pay again.
    Rejected(Booking),
}

/// Checks the gateway signature and settles the booking. A valid signature
/// for any order issued to this booking is accepted, including one replaced
/// by a later re-order.
pub fn verify_payment(
    conn: &Connection,
    secret: &str,
    confirmation: &PaymentConfirmation,
) -> Result<VerifyOutcome, AppError> {
    let booking_id = confirmation.booking_id.as_str();
    let order_id = confirmation.order_id.as_str();
    let payment_id = confirmation.payment_id.as_str();
    let booking = get_booking(conn, booking_id)?;
    let lifecycle = LifecycleState::of(&booking);

    let current_order = booking.razorpay_order_id.as_deref() == Some(order_id);
    if !current_order && !queries::order_issued_for(conn, order_id, booking_id)? {
        return Err(AppError::InvalidState(format!(
            "order {order_id} was not issued for booking {booking_id}"
        )));
    }

    let valid = payment::verify_signature(order_id, payment_id, &confirmation.signature, secret);

    if !valid {
        if !lifecycle.accepts_verification() {
            return Err(AppError::InvalidState(format!(
                "booking {booking_id} is {lifecycle} and cannot be verified"
            )));
        }
        let booking = apply_update(
            conn,
            booking_id,
            &BookingUpdate {
                payment_status: Some(PaymentStatus::Failed),
                ..Default::default()
            },
        )?;
        tracing::warn!(booking_id, order_id, "payment signature mismatch");
        return Ok(VerifyOutcome::Rejected(booking));
    }

    match booking.payment_id.clone() {
        Some(existing) if existing == payment_id => {
            return Ok(match booking.status {
                BookingStatus::Cancelled => VerifyOutcome::Recorded(booking),
                _ => VerifyOutcome::Verified(booking),
            });
        }
        Some(existing) => {
            return Err(AppError::InvalidState(format!(
                "booking {booking_id} is already paid by {existing}"
            )));
        }
        None => {}
    }

    if !current_order {
        tracing::info!(
            booking_id,
            order_id,
            superseded_by = booking.razorpay_order_id.as_deref().unwrap_or_default(),
            "payment settled a superseded order"
        );
    }

    let status = match booking.status {
        BookingStatus::Pending => Some(BookingStatus::Confirmed),
        _ => None,
    };
    let booking = apply_update(
        conn,
        booking_id,
        &BookingUpdate {
            status,
            payment_status: Some(PaymentStatus::Paid),
            payment_id: Some(payment_id.to_string()),
            razorpay_order_id: Some(order_id.to_string()),
        },
    )?;

    if booking.status == BookingStatus::Cancelled {
        tracing::warn!(booking_id, payment_id, "payment received for a cancelled booking, recorded for refund");
        Ok(VerifyOutcome::Recorded(booking))
    } else {
        tracing::info!(booking_id, payment_id, status = booking.status.as_str(), "payment verified");
        Ok(VerifyOutcome::Verified(booking))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub razorpay_order_id: Option<String>,
}

pub fn payment_summary(conn: &Connection, booking_id: &str) -> Result<PaymentSummary, AppError> {
    let booking = get_booking(conn, booking_id)?;
    Ok(PaymentSummary {
        payment_status: booking.payment_status,
        payment_id: booking.payment_id,
        razorpay_order_id: booking.razorpay_order_id,
    })
}
