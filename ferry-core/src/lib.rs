pub mod booking;
pub mod clock;
pub mod identity;
pub mod payment;
pub mod repository;
pub mod route;
pub mod schedule;
pub mod settings;
pub mod trip;

pub use booking::{Booking, BookingStatus, Leg, LegKind, Passenger};
pub use clock::{Clock, FixedClock, SystemClock};
pub use identity::Requester;
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use route::{Port, Route};
pub use schedule::{DailySchedule, RecurringSchedule};
pub use settings::FerrySettings;
pub use trip::{DepartureTime, SeatSet, TripKey};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown port: {0}")]
    UnknownPort(String),
    #[error("Origin and destination must differ: {0}")]
    SameOriginAndDestination(String),
    #[error("Invalid departure time '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid seat number: {0}")]
    InvalidSeatNumber(String),
    #[error("Invalid leg '{0}', expected 'outbound' or 'return'")]
    InvalidLeg(String),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Parse a `YYYY-MM-DD` calendar date as submitted by booking forms.
pub fn parse_date(raw: &str) -> CoreResult<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CoreError::InvalidDate(raw.to_string()))
}
