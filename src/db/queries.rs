use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Booking, BookingStatus, BookingType, BookingUpdate, Guide, Package, PaymentStatus, Vehicle,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const DATE_FORMAT: &str = "%Y-%m-%d";

const BOOKING_COLUMNS: &str = "id, booking_id, name, email, phone, special_requests, booking_type, \
     package_id, start_date, number_of_people, selected_guide, selected_vehicle, selected_cities, \
     selected_places, custom_duration, total_price, status, payment_id, payment_status, \
     razorpay_order_id, created_at, updated_at";

pub fn now_timestamp() -> NaiveDateTime {
    Utc::now().naive_utc()
}

// ── Bookings ──

/// Inserts a booking row. The raw `rusqlite::Error` is returned so callers can
/// tell a `booking_id` uniqueness violation apart from other failures.
pub fn insert_booking(conn: &Connection, booking: &Booking) -> rusqlite::Result<()> {
    let cities = serde_json::to_string(&booking.selected_cities)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    let places = serde_json::to_string(&booking.selected_places)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    conn.execute(
        "INSERT INTO bookings (id, booking_id, name, email, phone, special_requests, booking_type,
            package_id, start_date, number_of_people, selected_guide, selected_vehicle,
            selected_cities, selected_places, custom_duration, total_price, status, payment_id,
            payment_status, razorpay_order_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18,
            ?19, ?20, ?21, ?22)",
        params![
            booking.id,
            booking.booking_id,
            booking.name,
            booking.email,
            booking.phone,
            booking.special_requests,
            booking.booking_type.as_str(),
            booking.package_id,
            booking.start_date.format(DATE_FORMAT).to_string(),
            booking.number_of_people,
            booking.selected_guide,
            booking.selected_vehicle,
            cities,
            places,
            booking.custom_duration,
            booking.total_price,
            booking.status.as_str(),
            booking.payment_id,
            booking.payment_status.as_str(),
            booking.razorpay_order_id,
            booking.created_at.format(TIMESTAMP_FORMAT).to_string(),
            booking.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = ?1");
    let result = conn
        .query_row(&sql, params![booking_id], |row| Ok(parse_booking_row(row)))
        .optional()?;

    match result {
        Some(booking) => Ok(Some(booking?)),
        None => Ok(None),
    }
}

/// Newest first. `status_filter` narrows to a single status.
pub fn list_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let mut bookings = vec![];

    match status_filter {
        Some(status) => {
            let sql = format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1 \
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![status.as_str(), limit], |row| {
                Ok(parse_booking_row(row))
            })?;
            for row in rows {
                bookings.push(row??);
            }
        }
        None => {
            let sql = format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC, rowid DESC LIMIT ?1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit], |row| Ok(parse_booking_row(row)))?;
            for row in rows {
                bookings.push(row??);
            }
        }
    }

    Ok(bookings)
}

/// Applies a partial update and stamps `updated_at`. Returns the updated
/// booking, or `None` when no booking has that id.
pub fn update_booking(
    conn: &Connection,
    booking_id: &str,
    update: &BookingUpdate,
) -> anyhow::Result<Option<Booking>> {
    let now = now_timestamp().format(TIMESTAMP_FORMAT).to_string();
    let count = conn.execute(
        "UPDATE bookings SET
            status = COALESCE(?1, status),
            payment_status = COALESCE(?2, payment_status),
            payment_id = COALESCE(?3, payment_id),
            razorpay_order_id = COALESCE(?4, razorpay_order_id),
            updated_at = ?5
         WHERE booking_id = ?6",
        params![
            update.status.map(|s| s.as_str()),
            update.payment_status.map(|s| s.as_str()),
            update.payment_id,
            update.razorpay_order_id,
            now,
            booking_id,
        ],
    )?;

    if count == 0 {
        return Ok(None);
    }
    get_booking(conn, booking_id)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let booking_type: String = row.get(6)?;
    let start_date: String = row.get(8)?;
    let cities_json: String = row.get(12)?;
    let places_json: String = row.get(13)?;
    let status: String = row.get(16)?;
    let payment_status: String = row.get(18)?;
    let created_at: String = row.get(20)?;
    let updated_at: String = row.get(21)?;

    Ok(Booking {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        special_requests: row.get(5)?,
        booking_type: BookingType::parse(&booking_type),
        package_id: row.get(7)?,
        start_date: NaiveDate::parse_from_str(&start_date, DATE_FORMAT)?,
        number_of_people: row.get(9)?,
        selected_guide: row.get(10)?,
        selected_vehicle: row.get(11)?,
        selected_cities: serde_json::from_str(&cities_json)
            .context("selected_cities is not a JSON string list")?,
        selected_places: serde_json::from_str(&places_json)
            .context("selected_places is not a JSON string list")?,
        custom_duration: row.get(14)?,
        total_price: row.get(15)?,
        status: BookingStatus::parse(&status),
        payment_id: row.get(17)?,
        payment_status: PaymentStatus::parse(&payment_status),
        razorpay_order_id: row.get(19)?,
        created_at: NaiveDateTime::parse_from_str(&created_at, TIMESTAMP_FORMAT)?,
        updated_at: NaiveDateTime::parse_from_str(&updated_at, TIMESTAMP_FORMAT)?,
    })
}

// ── Payment orders ──

/// Records a gateway order issued for a booking. A booking keeps only its
/// latest order id; this table remembers every one it was given.
pub fn insert_payment_order(
    conn: &Connection,
    order_id: &str,
    booking_id: &str,
    amount: i64,
    currency: &str,
) -> anyhow::Result<()> {
    let now = now_timestamp().format(TIMESTAMP_FORMAT).to_string();
    conn.execute(
        "INSERT INTO payment_orders (order_id, booking_id, amount, currency, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![order_id, booking_id, amount, currency, now],
    )?;
    Ok(())
}

pub fn order_issued_for(conn: &Connection, order_id: &str, booking_id: &str) -> anyhow::Result<bool> {
    let issued: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM payment_orders WHERE order_id = ?1 AND booking_id = ?2",
        params![order_id, booking_id],
        |row| row.get(0),
    )?;
    Ok(issued)
}

// ── Catalog ──

pub fn list_packages(conn: &Connection) -> anyhow::Result<Vec<Package>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, package_type, description, duration, nights, price, guide_available
         FROM packages ORDER BY created_at DESC, rowid ASC",
    )?;
    let rows = stmt.query_map([], parse_package_row)?;

    let mut packages = vec![];
    for row in rows {
        packages.push(row?);
    }
    Ok(packages)
}

pub fn get_package(conn: &Connection, id: &str) -> anyhow::Result<Option<Package>> {
    let package = conn
        .query_row(
            "SELECT id, name, package_type, description, duration, nights, price, guide_available
             FROM packages WHERE id = ?1",
            params![id],
            parse_package_row,
        )
        .optional()?;
    Ok(package)
}

fn parse_package_row(row: &rusqlite::Row) -> rusqlite::Result<Package> {
    Ok(Package {
        id: row.get(0)?,
        name: row.get(1)?,
        package_type: row.get(2)?,
        description: row.get(3)?,
        duration: row.get(4)?,
        nights: row.get(5)?,
        price: row.get(6)?,
        guide_available: row.get(7)?,
    })
}

pub fn list_guides(conn: &Connection) -> anyhow::Result<Vec<Guide>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, experience_years, languages, price_per_day, is_available
         FROM guides ORDER BY id",
    )?;
    let rows = stmt.query_map([], parse_guide_row)?;

    let mut guides = vec![];
    for row in rows {
        guides.push(row?);
    }
    Ok(guides)
}

pub fn get_guide(conn: &Connection, id: &str) -> anyhow::Result<Option<Guide>> {
    let guide = conn
        .query_row(
            "SELECT id, name, experience_years, languages, price_per_day, is_available
             FROM guides WHERE id = ?1",
            params![id],
            parse_guide_row,
        )
        .optional()?;
    Ok(guide)
}

fn parse_guide_row(row: &rusqlite::Row) -> rusqlite::Result<Guide> {
    let languages: String = row.get(3)?;
    Ok(Guide {
        id: row.get(0)?,
        name: row.get(1)?,
        experience: row.get(2)?,
        languages: serde_json::from_str(&languages).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?,
        price_per_day: row.get(4)?,
        is_available: row.get(5)?,
    })
}

pub fn list_vehicles(conn: &Connection) -> anyhow::Result<Vec<Vehicle>> {
    let mut stmt = conn.prepare(
        "SELECT id, model, vehicle_type, capacity, price_per_day, is_available
         FROM vehicles ORDER BY id",
    )?;
    let rows = stmt.query_map([], parse_vehicle_row)?;

    let mut vehicles = vec![];
    for row in rows {
        vehicles.push(row?);
    }
    Ok(vehicles)
}

pub fn get_vehicle(conn: &Connection, id: &str) -> anyhow::Result<Option<Vehicle>> {
    let vehicle = conn
        .query_row(
            "SELECT id, model, vehicle_type, capacity, price_per_day, is_available
             FROM vehicles WHERE id = ?1",
            params![id],
            parse_vehicle_row,
        )
        .optional()?;
    Ok(vehicle)
}

fn parse_vehicle_row(row: &rusqlite::Row) -> rusqlite::Result<Vehicle> {
    Ok(Vehicle {
        id: row.get(0)?,
        model: row.get(1)?,
        vehicle_type: row.get(2)?,
        capacity: row.get(3)?,
        price_per_day: row.get(4)?,
        is_available: row.get(5)?,
    })
}
