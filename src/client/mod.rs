//! The customer-facing booking flow: a step-by-step wizard that collects the
//! trip, computes the price, and drives the server through
//! create → order → checkout → verify.

pub mod api;
pub mod wizard;

pub use api::{BookingApi, CheckoutResponse, CheckoutWidget, FlowError, FlowReceipt};
pub use wizard::{BookingWizard, ContactDetails, TripDetails, WizardError, WizardStep};
