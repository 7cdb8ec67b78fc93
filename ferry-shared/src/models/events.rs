use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub reference: String,
    pub route: String,
    pub date: String,
    pub time: String,
    pub seats: u32,
    pub round_trip: bool,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SeatsAssignedEvent {
    pub reference: String,
    /// "outbound" or "return"
    pub leg: String,
    pub route: String,
    pub date: String,
    pub time: String,
    pub seat_numbers: Vec<u32>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentRecordedEvent {
    pub reference: String,
    pub method: String,
    pub status: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCancelledEvent {
    pub reference: String,
    pub released_seats: u32,
    pub timestamp: i64,
}

/// Envelope broadcast to live subscribers (seat maps, admin dashboard).
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingEvent {
    Created(BookingCreatedEvent),
    SeatsAssigned(SeatsAssignedEvent),
    PaymentRecorded(PaymentRecordedEvent),
    Cancelled(BookingCancelledEvent),
}

impl BookingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BookingEvent::Created(_) => "booking_created",
            BookingEvent::SeatsAssigned(_) => "seats_assigned",
            BookingEvent::PaymentRecorded(_) => "payment_recorded",
            BookingEvent::Cancelled(_) => "booking_cancelled",
        }
    }
}
