use ferry_core::{LegKind, SeatSet, TripKey};
use ferry_shared::Masked;
use serde::{Deserialize, Serialize};

/// Booking form as submitted by a customer. Everything arrives as raw text
/// and is validated by `BookingManager::create_booking`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBooking {
    pub name: String,
    pub email: Masked<String>,
    pub phone: String,
    pub origin: String,
    pub destination: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    pub seats: u32,
    #[serde(default)]
    pub round_trip: bool,
    #[serde(default)]
    pub return_date: Option<String>,
    #[serde(default)]
    pub return_time: Option<String>,
}

/// What a seat picker needs to draw one leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatMap {
    pub leg: LegKind,
    pub trip: TripKey,
    pub capacity: u32,
    /// Seats held by other bookings on the same sailing.
    pub taken: SeatSet,
    /// Seats already assigned to this booking.
    pub selected: SeatSet,
    pub seats_required: u32,
}
