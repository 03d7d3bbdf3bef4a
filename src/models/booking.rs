use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub booking_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub special_requests: String,
    pub booking_type: BookingType,
    pub package_id: Option<String>,
    pub start_date: NaiveDate,
    pub number_of_people: u32,
    pub selected_guide: Option<String>,
    pub selected_vehicle: Option<String>,
    pub selected_cities: Vec<String>,
    pub selected_places: Vec<String>,
    pub custom_duration: Option<u32>,
    pub total_price: f64,
    pub status: BookingStatus,
    pub payment_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub razorpay_order_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingType {
    Fixed,
    Customized,
}

impl BookingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingType::Fixed => "fixed",
            BookingType::Customized => "customized",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "customized" => BookingType::Customized,
            _ => BookingType::Fixed,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "confirmed" => BookingStatus::Confirmed,
            "cancelled" => BookingStatus::Cancelled,
            "completed" => BookingStatus::Completed,
            _ => BookingStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "paid" => PaymentStatus::Paid,
            "failed" => PaymentStatus::Failed,
            "refunded" => PaymentStatus::Refunded,
            _ => PaymentStatus::Pending,
        }
    }
}

/// Partial update of the mutable booking fields. `None` leaves the stored
/// value untouched.
#[derive(Debug, Clone, Default)]
pub struct BookingUpdate {
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_id: Option<String>,
    pub razorpay_order_id: Option<String>,
}

/// A number as browsers tend to submit it: either a JSON number or the raw
/// text of a form input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LenientNumber {
    Number(f64),
    Text(String),
}

impl LenientNumber {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LenientNumber::Number(n) if n.is_finite() => Some(*n),
            LenientNumber::Number(_) => None,
            LenientNumber::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Integer reading; fractional input is truncated.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|n| n.trunc() as i64)
    }
}

/// Booking fields as submitted by the client, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub special_requests: Option<String>,
    pub package_id: Option<String>,
    pub booking_type: Option<BookingType>,
    pub start_date: Option<String>,
    pub number_of_people: Option<LenientNumber>,
    pub selected_guide: Option<String>,
    pub selected_vehicle: Option<String>,
    pub selected_cities: Option<Vec<String>>,
    pub selected_places: Option<Vec<String>>,
    pub custom_duration: Option<LenientNumber>,
    pub total_price: Option<LenientNumber>,
}

/// A draft that passed validation. Every optional field is a real `Option`;
/// empty strings from the form have been folded into `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub special_requests: String,
    pub booking_type: BookingType,
    pub package_id: Option<String>,
    pub start_date: NaiveDate,
    pub number_of_people: u32,
    pub selected_guide: Option<String>,
    pub selected_vehicle: Option<String>,
    pub selected_cities: Vec<String>,
    pub selected_places: Vec<String>,
    pub custom_duration: Option<u32>,
    pub client_total: Option<f64>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_start_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

impl BookingDraft {
    pub fn validate(self) -> Result<NewBooking, String> {
        let name = present(self.name);
        let email = present(self.email);
        let phone = present(self.phone);
        let start_date = present(self.start_date);

        let (Some(name), Some(email), Some(phone), Some(start_date)) =
            (name, email, phone, start_date)
        else {
            return Err(
                "Missing required fields: name, email, phone, and startDate are required"
                    .to_string(),
            );
        };

        let start_date = parse_start_date(&start_date)
            .ok_or_else(|| format!("Invalid startDate: {start_date}"))?;

        let booking_type = self
            .booking_type
            .ok_or_else(|| "bookingType is required (fixed or customized)".to_string())?;

        let selected_cities: Vec<String> = self
            .selected_cities
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| present(Some(c)))
            .collect();
        let selected_places: Vec<String> = self
            .selected_places
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| present(Some(p)))
            .collect();

        if booking_type == BookingType::Customized && selected_cities.is_empty() {
            return Err("At least one city must be selected for customized packages".to_string());
        }

        let number_of_people = match self.number_of_people {
            None => 1,
            Some(n) => match n.as_i64() {
                Some(n) if n >= 1 => u32::try_from(n)
                    .map_err(|_| "numberOfPeople is too large".to_string())?,
                _ => return Err("numberOfPeople must be at least 1".to_string()),
            },
        };

        let custom_duration = match self.custom_duration {
            None => None,
            Some(LenientNumber::Text(s)) if s.trim().is_empty() => None,
            Some(d) => match d.as_i64() {
                Some(d) if d >= 1 => Some(
                    u32::try_from(d).map_err(|_| "customDuration is too large".to_string())?,
                ),
                _ => return Err("customDuration must be a positive number of days".to_string()),
            },
        };

        let client_total = match self.total_price {
            None => None,
            Some(t) => match t.as_f64() {
                Some(t) if t >= 0.0 => Some(t),
                _ => return Err("totalPrice must be a non-negative number".to_string()),
            },
        };

        Ok(NewBooking {
            name,
            email: email.to_lowercase(),
            phone,
            special_requests: self.special_requests.unwrap_or_default(),
            booking_type,
            package_id: present(self.package_id),
            start_date,
            number_of_people,
            selected_guide: present(self.selected_guide),
            selected_vehicle: present(self.selected_vehicle),
            selected_cities,
            selected_places,
            custom_duration,
            client_total,
        })
    }
}
