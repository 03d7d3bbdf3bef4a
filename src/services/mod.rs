pub mod booking_id;
pub mod lifecycle;
pub mod payment;
pub mod pricing;
