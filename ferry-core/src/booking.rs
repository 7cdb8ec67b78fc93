use chrono::{DateTime, Utc};
use ferry_shared::Masked;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::identity::Requester;
use crate::payment::Payment;
use crate::trip::{SeatSet, TripKey};
use crate::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Passenger {
    pub name: String,
    pub email: Masked<String>,
    pub phone: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LegKind {
    Outbound,
    Return,
}

impl LegKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegKind::Outbound => "outbound",
            LegKind::Return => "return",
        }
    }
}

impl fmt::Display for LegKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LegKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "outbound" => Ok(LegKind::Outbound),
            "return" => Ok(LegKind::Return),
            _ => Err(CoreError::InvalidLeg(s.to_string())),
        }
    }
}

/// One directional segment of a booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Leg {
    pub trip: TripKey,
    pub price_per_seat: Decimal,
    /// Empty until the customer picks seats.
    pub assigned_seats: SeatSet,
}

impl Leg {
    pub fn new(trip: TripKey, price_per_seat: Decimal) -> Self {
        Self {
            trip,
            price_per_seat,
            assigned_seats: SeatSet::new(),
        }
    }
}

/// Lifecycle of a booking. Capacity is held from `PendingSeats` onwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    PendingSeats,
    SeatsAssigned,
    PaymentRecorded,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingSeats => "PENDING_SEATS",
            BookingStatus::SeatsAssigned => "SEATS_ASSIGNED",
            BookingStatus::PaymentRecorded => "PAYMENT_RECORDED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_SEATS" => Ok(BookingStatus::PendingSeats),
            "SEATS_ASSIGNED" => Ok(BookingStatus::SeatsAssigned),
            "PAYMENT_RECORDED" => Ok(BookingStatus::PaymentRecorded),
            _ => Err(CoreError::ValidationError(format!("unknown booking status '{}'", s))),
        }
    }
}

/// The persisted reservation tying passenger, legs, seats, price and payment together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Booking {
    pub id: Uuid,
    pub reference: String,
    pub user_id: Option<String>,
    pub passenger: Passenger,
    pub outbound: Leg,
    pub return_leg: Option<Leg>,
    /// Seats requested per leg.
    pub seats: u32,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub payment: Option<Payment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_round_trip(&self) -> bool {
        self.return_leg.is_some()
    }

    pub fn leg(&self, kind: LegKind) -> Option<&Leg> {
        match kind {
            LegKind::Outbound => Some(&self.outbound),
            LegKind::Return => self.return_leg.as_ref(),
        }
    }

    pub fn leg_mut(&mut self, kind: LegKind) -> Option<&mut Leg> {
        match kind {
            LegKind::Outbound => Some(&mut self.outbound),
            LegKind::Return => self.return_leg.as_mut(),
        }
    }

    /// Every leg holds exactly `seats` assigned seat numbers.
    pub fn seats_complete(&self) -> bool {
        let expected = self.seats as usize;
        self.outbound.assigned_seats.len() == expected
            && self
                .return_leg
                .as_ref()
                .map_or(true, |leg| leg.assigned_seats.len() == expected)
    }

    /// Price recomputed from the legs: per-seat price times seat count, summed.
    pub fn computed_total(&self) -> Decimal {
        let seats = Decimal::from(self.seats);
        let outbound = self.outbound.price_per_seat * seats;
        let inbound = self
            .return_leg
            .as_ref()
            .map_or(Decimal::ZERO, |leg| leg.price_per_seat * seats);
        outbound + inbound
    }

    pub fn is_owned_by(&self, requester: &Requester) -> bool {
        match (&self.user_id, &requester.user_id) {
            (Some(owner), Some(caller)) => owner == caller,
            _ => false,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{Port, Route};
    use chrono::NaiveDate;

    fn sample_booking(round_trip: bool) -> Booking {
        let route = Route::new(Port::Male, Port::Maafushi).unwrap();
        let date = NaiveDate::from_ymd_opt(2030, 1, 10).unwrap();
        let outbound = Leg::new(
            TripKey::new(route, date, "09:00".parse().unwrap()),
            Decimal::from(200),
        );
        let return_leg = round_trip.then(|| {
            Leg::new(
                TripKey::new(route.reverse(), date, "17:00".parse().unwrap()),
                Decimal::from(180),
            )
        });
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4(),
            reference: "AB12CD34".to_string(),
            user_id: Some("user-1".to_string()),
            passenger: Passenger {
                name: "Aisha".to_string(),
                email: Masked::new("aisha@example.com".to_string()),
                phone: "+9607771234".to_string(),
            },
            outbound,
            return_leg,
            seats: 2,
            total_price: Decimal::ZERO,
            status: BookingStatus::PendingSeats,
            payment: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_computed_total() {
        assert_eq!(sample_booking(false).computed_total(), Decimal::from(400));
        assert_eq!(sample_booking(true).computed_total(), Decimal::from(760));
    }

    #[test]
    fn test_seats_complete_requires_every_leg() {
        let mut booking = sample_booking(true);
        assert!(!booking.seats_complete());

        booking.outbound.assigned_seats = SeatSet::from_numbers([1, 2]).unwrap();
        assert!(!booking.seats_complete());

        booking.leg_mut(LegKind::Return).unwrap().assigned_seats =
            SeatSet::from_numbers([3, 4]).unwrap();
        assert!(booking.seats_complete());
    }

    #[test]
    fn test_ownership() {
        let booking = sample_booking(false);
        assert!(booking.is_owned_by(&Requester::customer("user-1")));
        assert!(!booking.is_owned_by(&Requester::customer("user-2")));
        assert!(!booking.is_owned_by(&Requester::anonymous()));
    }

    #[test]
    fn test_leg_kind_parsing() {
        assert_eq!("Return".parse::<LegKind>().unwrap(), LegKind::Return);
        assert!("inbound".parse::<LegKind>().is_err());
    }
}
