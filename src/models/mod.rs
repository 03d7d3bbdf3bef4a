pub mod booking;
pub mod catalog;

pub use booking::{
    Booking, BookingDraft, BookingStatus, BookingType, BookingUpdate, LenientNumber, NewBooking,
    PaymentStatus,
};
pub use catalog::{Guide, Package, Vehicle};
