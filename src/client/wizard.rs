use chrono::NaiveDate;

use crate::models::{BookingDraft, BookingType, Guide, LenientNumber, Package, Vehicle};
use crate::services::pricing::{self, TripPricing};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    TripDetails,
    GuideVehicle,
    Contact,
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("no package selected: please select a travel package")]
    NoPackageSelected,

    #[error("missing date: please select a start date")]
    MissingDate,

    #[error("no cities selected: please select at least one city")]
    NoCitiesSelected,

    #[error("missing information: please fill in your contact details")]
    MissingContact,

    #[error("invalid total: the total amount must be greater than zero")]
    InvalidTotal,

    #[error("booking already submitted")]
    AlreadySubmitted,

    #[error("expected step {expected:?}, wizard is at {actual:?}")]
    WrongStep {
        expected: WizardStep,
        actual: WizardStep,
    },
}

#[derive(Debug, Clone)]
pub struct TripDetails {
    pub booking_type: BookingType,
    pub package: Option<Package>,
    pub start_date: Option<NaiveDate>,
    pub number_of_people: u32,
    pub selected_cities: Vec<String>,
    pub selected_places: Vec<String>,
    pub custom_duration: u32,
}

impl Default for TripDetails {
    fn default() -> Self {
        Self {
            booking_type: BookingType::Fixed,
            package: None,
            start_date: None,
            number_of_people: 2,
            selected_cities: vec![],
            selected_places: vec![],
            custom_duration: 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub special_requests: String,
}

#[derive(Debug, Clone)]
pub struct BookingWizard {
    step: WizardStep,
    pub trip: TripDetails,
    pub guide: Option<Guide>,
    pub vehicle: Option<Vehicle>,
    pub contact: ContactDetails,
}

impl Default for BookingWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::TripDetails,
            trip: TripDetails::default(),
            guide: None,
            vehicle: None,
            contact: ContactDetails::default(),
        }
    }

    /// Starts from a catalog package; its type decides fixed vs customized.
    pub fn for_package(package: Package) -> Self {
        let mut wizard = Self::new();
        wizard.trip.booking_type = BookingType::parse(&package.package_type);
        wizard.trip.package = Some(package);
        wizard
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn toggle_city(&mut self, city: &str) {
        toggle(&mut self.trip.selected_cities, city);
    }

    pub fn toggle_place(&mut self, place: &str) {
        toggle(&mut self.trip.selected_places, place);
    }

    /// Moves to the next step once the current one is complete.
    pub fn advance(&mut self) -> Result<WizardStep, WizardError> {
        self.step = match self.step {
            WizardStep::TripDetails => {
                self.check_trip()?;
                WizardStep::GuideVehicle
            }
            WizardStep::GuideVehicle => WizardStep::Contact,
            WizardStep::Contact => {
                self.check_contact()?;
                WizardStep::Submitted
            }
            WizardStep::Submitted => return Err(WizardError::AlreadySubmitted),
        };
        Ok(self.step)
    }

    pub fn back(&mut self) -> WizardStep {
        self.step = match self.step {
            WizardStep::GuideVehicle => WizardStep::TripDetails,
            WizardStep::Contact => WizardStep::GuideVehicle,
            other => other,
        };
        self.step
    }

    pub fn trip_days(&self) -> u32 {
        pricing::trip_basis(
            self.trip.booking_type,
            self.trip.package.as_ref(),
            Some(self.trip.custom_duration),
        )
        .1
    }

    pub fn total_price(&self) -> f64 {
        let (base_per_person, days) = pricing::trip_basis(
            self.trip.booking_type,
            self.trip.package.as_ref(),
            Some(self.trip.custom_duration),
        );
        pricing::compute_total(&TripPricing {
            base_per_person,
            people: self.trip.number_of_people,
            days,
            guide_rate: self.guide.as_ref().map(|g| g.price_per_day),
            vehicle_rate: self.vehicle.as_ref().map(|v| v.price_per_day),
        })
    }

    /// The request body for the create step. Only available on the contact
    /// step with every earlier step complete.
    pub fn draft(&self) -> Result<BookingDraft, WizardError> {
        if self.step != WizardStep::Contact {
            return Err(WizardError::WrongStep {
                expected: WizardStep::Contact,
                actual: self.step,
            });
        }
        self.check_trip()?;
        self.check_contact()?;

        let customized = self.trip.booking_type == BookingType::Customized;
        Ok(BookingDraft {
            name: Some(self.contact.name.clone()),
            email: Some(self.contact.email.clone()),
            phone: Some(self.contact.phone.clone()),
            special_requests: Some(self.contact.special_requests.clone()),
            package_id: self.trip.package.as_ref().map(|p| p.id.clone()),
            booking_type: Some(self.trip.booking_type),
            start_date: self.trip.start_date.map(|d| d.format("%Y-%m-%d").to_string()),
            number_of_people: Some(LenientNumber::Number(f64::from(self.trip.number_of_people))),
            selected_guide: self.guide.as_ref().map(|g| g.id.clone()),
            selected_vehicle: self.vehicle.as_ref().map(|v| v.id.clone()),
            selected_cities: Some(self.trip.selected_cities.clone()),
            selected_places: Some(self.trip.selected_places.clone()),
            custom_duration: customized
                .then(|| LenientNumber::Number(f64::from(self.trip.custom_duration))),
            total_price: Some(LenientNumber::Number(self.total_price())),
        })
    }

    pub(crate) fn mark_submitted(&mut self) {
        self.step = WizardStep::Submitted;
    }

    fn check_trip(&self) -> Result<(), WizardError> {
        if self.trip.booking_type == BookingType::Fixed && self.trip.package.is_none() {
            return Err(WizardError::NoPackageSelected);
        }
        if self.trip.start_date.is_none() {
            return Err(WizardError::MissingDate);
        }
        if self.trip.booking_type == BookingType::Customized
            && self.trip.selected_cities.is_empty()
        {
            return Err(WizardError::NoCitiesSelected);
        }
        Ok(())
    }

    fn check_contact(&self) -> Result<(), WizardError> {
        let contact = &self.contact;
        if [&contact.name, &contact.email, &contact.phone]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(WizardError::MissingContact);
        }
        if self.total_price() <= 0.0 {
            return Err(WizardError::InvalidTotal);
        }
        Ok(())
    }
}

fn toggle(items: &mut Vec<String>, item: &str) {
    if let Some(pos) = items.iter().position(|i| i == item) {
        items.remove(pos);
    } else {
        items.push(item.to_string());
    }
}
