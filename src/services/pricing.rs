use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{BookingType, NewBooking, Package};

/// Per-person, per-day base rate for customized trips.
pub const CUSTOM_DAY_RATE: f64 = 5000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TripPricing {
    pub base_per_person: f64,
    pub people: u32,
    pub days: u32,
    pub guide_rate: Option<f64>,
    pub vehicle_rate: Option<f64>,
}

/// `base × people + guideRate × days + vehicleRate × days`
pub fn compute_total(pricing: &TripPricing) -> f64 {
    let days = f64::from(pricing.days.max(1));
    let mut total = pricing.base_per_person * f64::from(pricing.people.max(1));
    if let Some(rate) = pricing.guide_rate {
        total += rate * days;
    }
    if let Some(rate) = pricing.vehicle_rate {
        total += rate * days;
    }
    total
}

/// Base price per person and trip length for the chosen booking type.
pub fn trip_basis(
    booking_type: BookingType,
    package: Option<&Package>,
    custom_duration: Option<u32>,
) -> (f64, u32) {
    match booking_type {
        BookingType::Fixed => package
            .map(|p| (p.price, p.duration.max(1)))
            .unwrap_or((0.0, 1)),
        BookingType::Customized => {
            let days = custom_duration.unwrap_or(1).max(1);
            (CUSTOM_DAY_RATE * f64::from(days), days)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    Catalog,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub total: f64,
    pub source: PriceSource,
}

/// Recomputes the booking total from the catalog and rate tables. The
/// client's figure is only used when a fixed booking names no package.
pub fn quote(conn: &Connection, booking: &NewBooking) -> Result<PriceQuote, AppError> {
    let guide_rate = match &booking.selected_guide {
        Some(id) => {
            let guide = queries::get_guide(conn, id)?
                .ok_or_else(|| AppError::Validation(format!("Unknown guide: {id}")))?;
            if !guide.is_available {
                return Err(AppError::Validation(format!("Guide {id} is not available")));
            }
            Some(guide.price_per_day)
        }
        None => None,
    };
    let vehicle_rate = match &booking.selected_vehicle {
        Some(id) => {
            let vehicle = queries::get_vehicle(conn, id)?
                .ok_or_else(|| AppError::Validation(format!("Unknown vehicle: {id}")))?;
            if !vehicle.is_available {
                return Err(AppError::Validation(format!("Vehicle {id} is not available")));
            }
            Some(vehicle.price_per_day)
        }
        None => None,
    };

    let package = match (booking.booking_type, &booking.package_id) {
        (BookingType::Fixed, Some(id)) => Some(
            queries::get_package(conn, id)?
                .ok_or_else(|| AppError::Validation(format!("Unknown package: {id}")))?,
        ),
        (BookingType::Fixed, None) => {
            let total = booking.client_total.ok_or_else(|| {
                AppError::Validation("totalPrice is required when no package is selected".into())
            })?;
            tracing::info!(total, "no package to price from, keeping client total");
            return Ok(PriceQuote {
                total,
                source: PriceSource::Client,
            });
        }
        (BookingType::Customized, _) => None,
    };

    let (base_per_person, days) =
        trip_basis(booking.booking_type, package.as_ref(), booking.custom_duration);
    let total = compute_total(&TripPricing {
        base_per_person,
        people: booking.number_of_people,
        days,
        guide_rate,
        vehicle_rate,
    });

    if let Some(client_total) = booking.client_total {
        if (client_total - total).abs() > 0.005 {
            tracing::warn!(client_total, total, "client total disagrees with catalog price");
        }
    }

    Ok(PriceQuote {
        total,
        source: PriceSource::Catalog,
    })
}
