use chrono::{Duration, NaiveDate};
use ferry_catalog::{CapacityEngine, CapacityError, ConfigStore, PricingError};
use ferry_core::repository::BookingRepository;
use ferry_core::{
    parse_date, Booking, BookingStatus, Clock, DepartureTime, Leg, LegKind, Passenger,
    PaymentStatus, Requester, Route, SeatSet, TripKey,
};
use ferry_shared::Masked;
use ferry_shared::models::events::{
    BookingCancelledEvent, BookingCreatedEvent, BookingEvent, PaymentRecordedEvent,
    SeatsAssignedEvent,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{NewBooking, SeatMap};
use crate::payment::PaymentInput;

const REFERENCE_ATTEMPTS: usize = 8;

/// Column widths of the passenger fields in storage.
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 100;
pub const MAX_PHONE_LEN: usize = 30;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid booking: {0}")]
    BookingInvalid(String),

    #[error("Booking not found: {0}")]
    NotFound(String),

    #[error("Not enough seats on the {leg} sailing: requested {requested}, remaining {remaining}")]
    SeatsUnavailable {
        leg: LegKind,
        requested: u32,
        remaining: u32,
    },

    #[error("Expected {expected} seat(s), got {got}")]
    SeatCountMismatch {
        expected: u32,
        got: u32,
    },

    #[error("Seat {0} is already taken")]
    SeatConflict(u32),

    #[error("Seat {seat} does not exist on a ferry of {capacity} seats")]
    InvalidSeat {
        seat: u32,
        capacity: u32,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not permitted: {0}")]
    NotPermitted(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

fn persistence(e: Box<dyn std::error::Error + Send + Sync>) -> BookingError {
    BookingError::Persistence(e.to_string())
}

fn capacity_error(leg: LegKind, e: CapacityError) -> BookingError {
    match e {
        CapacityError::SeatsUnavailable { requested, remaining } => {
            BookingError::SeatsUnavailable { leg, requested, remaining }
        }
        CapacityError::Persistence(msg) => BookingError::Persistence(msg),
    }
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, BookingError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BookingError::BookingInvalid(format!("{} is required", field)));
    }
    Ok(trimmed)
}

fn bounded<'a>(value: &'a str, field: &str, max_len: usize) -> Result<&'a str, BookingError> {
    let trimmed = required(value, field)?;
    if trimmed.chars().count() > max_len {
        return Err(BookingError::BookingInvalid(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(trimmed)
}

fn parse_trip_date(raw: &str, field: &str) -> Result<NaiveDate, BookingError> {
    parse_date(required(raw, field)?).map_err(|e| BookingError::BookingInvalid(e.to_string()))
}

fn parse_trip_time(raw: &str, field: &str) -> Result<DepartureTime, BookingError> {
    required(raw, field)?
        .parse::<DepartureTime>()
        .map_err(|e| BookingError::BookingInvalid(e.to_string()))
}

/// Drives a booking through reserve -> assign seats -> pay. Capacity and
/// seat checks read current bookings and then write; two concurrent requests
/// for the last seats can both pass.
pub struct BookingManager {
    bookings: Arc<dyn BookingRepository>,
    config: Arc<ConfigStore>,
    capacity: Arc<CapacityEngine>,
    clock: Arc<dyn Clock>,
    events: Option<broadcast::Sender<BookingEvent>>,
}

impl BookingManager {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        config: Arc<ConfigStore>,
        capacity: Arc<CapacityEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            config,
            capacity,
            clock,
            events: None,
        }
    }

    /// Publish lifecycle events on this channel.
    pub fn with_events(mut self, events: broadcast::Sender<BookingEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn publish(&self, event: BookingEvent) {
        if let Some(tx) = &self.events {
            // No subscribers is fine
            if tx.send(event).is_err() {
                debug!("No live subscribers for booking events");
            }
        }
    }

    /// Reserve capacity for a new booking. Seat numbers are picked later.
    pub async fn create_booking(
        &self,
        requester: &Requester,
        input: NewBooking,
    ) -> Result<Booking, BookingError> {
        let name = bounded(&input.name, "name", MAX_NAME_LEN)?.to_string();
        let email = bounded(input.email.expose(), "email", MAX_EMAIL_LEN)?.to_string();
        let phone = bounded(&input.phone, "phone", MAX_PHONE_LEN)?.to_string();

        let route = Route::parse(
            required(&input.origin, "origin")?,
            required(&input.destination, "destination")?,
        )
        .map_err(|e| BookingError::BookingInvalid(e.to_string()))?;
        let date = parse_trip_date(&input.date, "date")?;
        let time = parse_trip_time(&input.time, "time")?;

        let today = self.clock.today();
        if date < today {
            return Err(BookingError::BookingInvalid(format!(
                "travel date {} is in the past",
                date
            )));
        }

        let ferry_capacity = self.config.capacity().await;
        if input.seats == 0 || input.seats > ferry_capacity {
            return Err(BookingError::BookingInvalid(format!(
                "seats must be between 1 and {}",
                ferry_capacity
            )));
        }

        let outbound_trip = TripKey::new(route, date, time);
        self.capacity
            .ensure_available(&outbound_trip, input.seats)
            .await
            .map_err(|e| capacity_error(LegKind::Outbound, e))?;

        let outbound_price = self.config.price_for(&route).await.map_err(|e| match e {
            PricingError::RouteNotFound(_) => {
                BookingError::BookingInvalid(format!("route {} is not available", route))
            }
            other => BookingError::Persistence(other.to_string()),
        })?;
        let outbound = Leg::new(outbound_trip, outbound_price);

        let return_leg = if input.round_trip {
            let return_date =
                parse_trip_date(input.return_date.as_deref().unwrap_or(""), "return_date")?;
            let return_time =
                parse_trip_time(input.return_time.as_deref().unwrap_or(""), "return_time")?;
            if return_date < date {
                return Err(BookingError::BookingInvalid(
                    "return date cannot be before the outbound date".to_string(),
                ));
            }

            let return_trip = TripKey::new(route.reverse(), return_date, return_time);
            self.capacity
                .ensure_available(&return_trip, input.seats)
                .await
                .map_err(|e| capacity_error(LegKind::Return, e))?;

            // Reverse fare, or the outbound fare when the reverse is unpriced
            let return_price = self
                .config
                .price_for(&route.reverse())
                .await
                .unwrap_or(outbound_price);
            Some(Leg::new(return_trip, return_price))
        } else {
            None
        };

        let now = self.clock.now();
        let mut booking = Booking {
            id: Uuid::new_v4(),
            reference: self.generate_reference().await?,
            user_id: requester.user_id.clone(),
            passenger: Passenger {
                name,
                email: Masked::new(email),
                phone,
            },
            outbound,
            return_leg,
            seats: input.seats,
            total_price: Default::default(),
            status: BookingStatus::PendingSeats,
            payment: None,
            created_at: now,
            updated_at: now,
        };
        booking.total_price = booking.computed_total();

        self.bookings.insert_booking(&booking).await.map_err(persistence)?;

        info!(
            "Booking {} created: {} x{} ({})",
            booking.reference,
            booking.outbound.trip,
            booking.seats,
            if booking.is_round_trip() { "round trip" } else { "one way" }
        );
        self.publish(BookingEvent::Created(BookingCreatedEvent {
            booking_id: booking.id,
            reference: booking.reference.clone(),
            route: route.to_string(),
            date: date.to_string(),
            time: booking.outbound.trip.time.to_string(),
            seats: booking.seats,
            round_trip: booking.is_round_trip(),
            timestamp: now.timestamp(),
        }));

        Ok(booking)
    }

    async fn generate_reference(&self) -> Result<String, BookingError> {
        for _ in 0..REFERENCE_ATTEMPTS {
            let candidate = new_reference();
            if !self.bookings.reference_exists(&candidate).await.map_err(persistence)? {
                return Ok(candidate);
            }
            warn!("Booking reference collision on {}, retrying", candidate);
        }
        Err(BookingError::Persistence("could not allocate a unique booking reference".to_string()))
    }

    pub async fn get(&self, reference: &str) -> Result<Booking, BookingError> {
        self.bookings
            .get_booking(reference)
            .await
            .map_err(persistence)?
            .ok_or_else(|| BookingError::NotFound(reference.to_string()))
    }

    /// Bookings attached to a user id are only read or touched by that user
    /// or an admin. Anonymous bookings are addressed by reference alone.
    fn ensure_can_access(
        &self,
        requester: &Requester,
        booking: &Booking,
    ) -> Result<(), BookingError> {
        if booking.user_id.is_none() || requester.is_admin || booking.is_owned_by(requester) {
            return Ok(());
        }
        Err(BookingError::NotPermitted(format!(
            "booking {} belongs to another user",
            booking.reference
        )))
    }

    /// Union of seats held by other bookings on the same sailing and leg kind.
    async fn seats_taken_by_others(
        &self,
        booking: &Booking,
        kind: LegKind,
        trip: &TripKey,
    ) -> Result<SeatSet, BookingError> {
        let mut taken = SeatSet::new();
        for other in self.bookings.bookings_on_trip(trip, kind).await.map_err(persistence)? {
            if other.reference == booking.reference {
                continue;
            }
            if let Some(leg) = other.leg(kind) {
                taken.extend(&leg.assigned_seats);
            }
        }
        Ok(taken)
    }

    pub async fn seat_map(
        &self,
        requester: &Requester,
        reference: &str,
        kind: LegKind,
    ) -> Result<SeatMap, BookingError> {
        let booking = self.get(reference).await?;
        self.ensure_can_access(requester, &booking)?;
        let leg = booking.leg(kind).ok_or_else(|| {
            BookingError::BookingInvalid(format!("booking {} has no return leg", reference))
        })?;

        Ok(SeatMap {
            leg: kind,
            trip: leg.trip.clone(),
            capacity: self.config.capacity().await,
            taken: self.seats_taken_by_others(&booking, kind, &leg.trip).await?,
            selected: leg.assigned_seats.clone(),
            seats_required: booking.seats,
        })
    }

    /// Pick seat numbers for one leg. Resubmitting the booking's own seats is
    /// accepted. The booking moves to `SeatsAssigned` once every leg is full.
    pub async fn assign_seats(
        &self,
        requester: &Requester,
        reference: &str,
        kind: LegKind,
        seat_numbers: &[u32],
    ) -> Result<Booking, BookingError> {
        let mut booking = self.get(reference).await?;
        self.ensure_can_access(requester, &booking)?;

        if booking.status == BookingStatus::PaymentRecorded {
            return Err(BookingError::InvalidState(format!(
                "seats of booking {} cannot change after payment",
                reference
            )));
        }

        let trip = booking
            .leg(kind)
            .map(|leg| leg.trip.clone())
            .ok_or_else(|| {
                BookingError::BookingInvalid(format!("booking {} has no return leg", reference))
            })?;

        let requested = SeatSet::from_numbers(seat_numbers.iter().copied())
            .map_err(|e| BookingError::BookingInvalid(e.to_string()))?;
        // Seat ids form a set; a repeated id counts once
        if requested.len() != booking.seats as usize {
            return Err(BookingError::SeatCountMismatch {
                expected: booking.seats,
                got: requested.len() as u32,
            });
        }

        let capacity = self.config.capacity().await;
        if let Some(seat) = requested.iter().find(|seat| *seat > capacity) {
            return Err(BookingError::InvalidSeat { seat, capacity });
        }

        let taken = self.seats_taken_by_others(&booking, kind, &trip).await?;
        if let Some(seat) = requested.first_overlap(&taken) {
            return Err(BookingError::SeatConflict(seat));
        }

        if let Some(leg) = booking.leg_mut(kind) {
            leg.assigned_seats = requested;
        }
        booking.status = if booking.seats_complete() {
            BookingStatus::SeatsAssigned
        } else {
            BookingStatus::PendingSeats
        };
        booking.updated_at = self.clock.now();

        self.bookings.update_booking(&booking).await.map_err(persistence)?;

        let assigned: Vec<u32> = booking
            .leg(kind)
            .map(|leg| leg.assigned_seats.iter().collect())
            .unwrap_or_default();
        info!("Booking {} {} seats: {:?}", reference, kind, assigned);
        self.publish(BookingEvent::SeatsAssigned(SeatsAssignedEvent {
            reference: booking.reference.clone(),
            leg: kind.as_str().to_string(),
            route: trip.route.to_string(),
            date: trip.date.to_string(),
            time: trip.time.to_string(),
            seat_numbers: assigned,
            timestamp: booking.updated_at.timestamp(),
        }));

        Ok(booking)
    }

    pub async fn record_payment(
        &self,
        requester: &Requester,
        reference: &str,
        input: PaymentInput,
    ) -> Result<Booking, BookingError> {
        let mut booking = self.get(reference).await?;
        self.ensure_can_access(requester, &booking)?;

        if booking.status != BookingStatus::SeatsAssigned {
            return Err(BookingError::InvalidState(format!(
                "booking {} is {}, seats must be assigned before payment",
                reference, booking.status
            )));
        }

        let now = self.clock.now();
        let payment = input.into_payment(&booking.reference, now)?;
        let (method, status) = (payment.method, payment.status);

        booking.payment = Some(payment);
        booking.status = BookingStatus::PaymentRecorded;
        booking.updated_at = now;
        self.bookings.update_booking(&booking).await.map_err(persistence)?;

        info!("Booking {} payment recorded: {} ({})", reference, method, status);
        self.publish(BookingEvent::PaymentRecorded(PaymentRecordedEvent {
            reference: booking.reference.clone(),
            method: method.label().to_string(),
            status: status.as_str().to_string(),
            timestamp: now.timestamp(),
        }));

        Ok(booking)
    }

    /// Admin confirmation of a bank transfer or redirected checkout.
    pub async fn confirm_payment(&self, reference: &str) -> Result<Booking, BookingError> {
        let mut booking = self.get(reference).await?;
        let now = self.clock.now();

        let payment = booking
            .payment
            .as_mut()
            .filter(|p| p.status.awaiting_confirmation())
            .ok_or_else(|| {
                BookingError::InvalidState(format!(
                    "booking {} has no payment awaiting confirmation",
                    reference
                ))
            })?;
        payment.status = PaymentStatus::Paid;
        let method = payment.method;
        booking.updated_at = now;

        self.bookings.update_booking(&booking).await.map_err(persistence)?;

        info!("Booking {} payment confirmed", reference);
        self.publish(BookingEvent::PaymentRecorded(PaymentRecordedEvent {
            reference: booking.reference.clone(),
            method: method.label().to_string(),
            status: PaymentStatus::Paid.as_str().to_string(),
            timestamp: now.timestamp(),
        }));

        Ok(booking)
    }

    /// Delete a booking, releasing its seats immediately. Owners and admins
    /// only; anonymous bookings can only be cancelled by an admin.
    pub async fn cancel(
        &self,
        requester: &Requester,
        reference: &str,
    ) -> Result<Booking, BookingError> {
        let booking = self.get(reference).await?;
        if !requester.is_admin && !booking.is_owned_by(requester) {
            return Err(BookingError::NotPermitted(format!(
                "only the owner or an admin can cancel booking {}",
                reference
            )));
        }

        if !self.bookings.delete_booking(reference).await.map_err(persistence)? {
            return Err(BookingError::NotFound(reference.to_string()));
        }

        info!("Booking {} cancelled, {} seat(s) released", reference, booking.seats);
        self.publish(BookingEvent::Cancelled(BookingCancelledEvent {
            reference: booking.reference.clone(),
            released_seats: booking.seats,
            timestamp: self.clock.now().timestamp(),
        }));

        Ok(booking)
    }

    /// All bookings, newest first.
    pub async fn list(&self) -> Result<Vec<Booking>, BookingError> {
        self.bookings.list_bookings().await.map_err(persistence)
    }

    pub async fn for_user(&self, user_id: &str) -> Result<Vec<Booking>, BookingError> {
        self.bookings.list_bookings_for_user(user_id).await.map_err(persistence)
    }

    /// Bookings whose payment is waiting on an admin or a third party.
    pub async fn pending_payments(&self) -> Result<Vec<Booking>, BookingError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|b| b.payment.as_ref().is_some_and(|p| p.status.awaiting_confirmation()))
            .collect())
    }

    /// Delete bookings created more than `days` days ago.
    pub async fn purge_older_than(&self, days: u32) -> Result<u64, BookingError> {
        if days == 0 {
            return Err(BookingError::BookingInvalid("days must be at least 1".to_string()));
        }
        let cutoff = Duration::try_days(i64::from(days))
            .and_then(|age| self.clock.now().checked_sub_signed(age))
            .ok_or_else(|| BookingError::BookingInvalid(format!("days out of range: {}", days)))?;
        let deleted = self
            .bookings
            .delete_bookings_created_before(cutoff)
            .await
            .map_err(persistence)?;
        info!("Purged {} bookings created before {}", deleted, cutoff);
        Ok(deleted)
    }
}

/// First eight hex digits of a random uuid, upper-cased.
fn new_reference() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::{FixedClock, PaymentMethod};
    use ferry_store::{MemorySettings, MemoryStore};
    use rust_decimal::Decimal;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 6, 1).unwrap()
    }

    struct Harness {
        store: Arc<MemoryStore>,
        config: Arc<ConfigStore>,
        capacity: Arc<CapacityEngine>,
        manager: BookingManager,
    }

    async fn harness(ferry_capacity: u32) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let config =
            Arc::new(ConfigStore::load(Arc::new(MemorySettings::new()), ferry_capacity).await);
        let capacity = Arc::new(CapacityEngine::new(store.clone(), config.clone()));
        let manager = BookingManager::new(
            store.clone(),
            config.clone(),
            capacity.clone(),
            Arc::new(FixedClock::on(today())),
        );
        Harness { store, config, capacity, manager }
    }

    fn request(seats: u32) -> NewBooking {
        NewBooking {
            name: "Mariyam Hassan".to_string(),
            email: Masked::new("mariyam@example.com".to_string()),
            phone: "+960 7654321".to_string(),
            origin: "Male".to_string(),
            destination: "K.Maafushi".to_string(),
            date: "2030-06-02".to_string(),
            time: "08:00".to_string(),
            seats,
            ..Default::default()
        }
    }

    fn round_trip(seats: u32) -> NewBooking {
        NewBooking {
            round_trip: true,
            return_date: Some("2030-06-05".to_string()),
            return_time: Some("17:00".to_string()),
            ..request(seats)
        }
    }

    fn outbound_trip() -> TripKey {
        TripKey::new(
            Route::parse("Male", "K.Maafushi").unwrap(),
            NaiveDate::from_ymd_opt(2030, 6, 2).unwrap(),
            "08:00".parse().unwrap(),
        )
    }

    fn customer() -> Requester {
        Requester::customer("guest-1")
    }

    #[tokio::test]
    async fn test_create_one_way_booking() {
        let h = harness(35).await;
        let booking = h.manager.create_booking(&customer(), request(2)).await.unwrap();

        assert_eq!(booking.reference.len(), 8);
        assert!(booking
            .reference
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_eq!(booking.status, BookingStatus::PendingSeats);
        assert_eq!(booking.total_price, Decimal::from(400));
        assert_eq!(booking.user_id.as_deref(), Some("guest-1"));
        assert!(booking.outbound.assigned_seats.is_empty());
        assert_eq!(h.capacity.remaining_seats(&outbound_trip()).await.unwrap(), 33);
    }

    #[tokio::test]
    async fn test_round_trip_price_uses_reverse_fare() {
        let h = harness(35).await;
        let booking = h.manager.create_booking(&customer(), round_trip(2)).await.unwrap();
        // 200 out, back-filled 200 home
        assert_eq!(booking.total_price, Decimal::from(800));

        h.config
            .set_price(Route::parse("K.Maafushi", "Male").unwrap(), Decimal::from(150))
            .await
            .unwrap();
        let booking = h.manager.create_booking(&customer(), round_trip(2)).await.unwrap();
        assert_eq!(booking.total_price, Decimal::from(700));
        let return_leg = booking.return_leg.unwrap();
        assert_eq!(return_leg.trip.route, Route::parse("K.Maafushi", "Male").unwrap());
        assert_eq!(return_leg.price_per_seat, Decimal::from(150));
    }

    #[tokio::test]
    async fn test_capacity_allows_exactly_capacity_single_seat_bookings() {
        let h = harness(5).await;
        for _ in 0..5 {
            h.manager.create_booking(&customer(), request(1)).await.unwrap();
        }
        let result = h.manager.create_booking(&customer(), request(1)).await;
        assert!(matches!(
            result,
            Err(BookingError::SeatsUnavailable {
                leg: LegKind::Outbound,
                requested: 1,
                remaining: 0
            })
        ));
    }

    #[tokio::test]
    async fn test_capacity_two_scenario() {
        let h = harness(2).await;
        let x = h.manager.create_booking(&customer(), request(1)).await.unwrap();
        assert_eq!(h.capacity.remaining_seats(&outbound_trip()).await.unwrap(), 1);

        let y = h.manager.create_booking(&customer(), request(2)).await;
        assert!(matches!(y, Err(BookingError::SeatsUnavailable { remaining: 1, .. })));

        h.manager.create_booking(&customer(), request(1)).await.unwrap();
        assert_eq!(h.capacity.remaining_seats(&outbound_trip()).await.unwrap(), 0);

        h.manager.cancel(&customer(), &x.reference).await.unwrap();
        assert_eq!(h.capacity.remaining_seats(&outbound_trip()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_return_leg_capacity_is_checked() {
        let h = harness(2).await;
        // Two seats already sail home on the return sailing
        let home = NewBooking {
            origin: "K.Maafushi".to_string(),
            destination: "Male".to_string(),
            date: "2030-06-05".to_string(),
            time: "17:00".to_string(),
            ..request(2)
        };
        h.manager.create_booking(&customer(), home).await.unwrap();

        let result = h.manager.create_booking(&customer(), round_trip(1)).await;
        assert!(matches!(
            result,
            Err(BookingError::SeatsUnavailable { leg: LegKind::Return, remaining: 0, .. })
        ));
        // Nothing persisted for the rejected request
        assert_eq!(h.store.list_bookings().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let h = harness(10).await;
        let cases = vec![
            NewBooking { name: "  ".to_string(), ..request(1) },
            NewBooking { name: "A".repeat(MAX_NAME_LEN + 1), ..request(1) },
            NewBooking {
                email: Masked::new(format!("{}@example.com", "m".repeat(MAX_EMAIL_LEN))),
                ..request(1)
            },
            NewBooking { phone: "7".repeat(MAX_PHONE_LEN + 1), ..request(1) },
            NewBooking { origin: "Atlantis".to_string(), ..request(1) },
            NewBooking { destination: "Male".to_string(), ..request(1) },
            NewBooking { date: "02/06/2030".to_string(), ..request(1) },
            NewBooking { date: "2030-05-31".to_string(), ..request(1) },
            NewBooking { time: "8am".to_string(), ..request(1) },
            request(0),
            request(11),
            NewBooking { return_time: None, ..round_trip(1) },
            NewBooking { return_date: Some("2030-06-01".to_string()), ..round_trip(1) },
            NewBooking {
                origin: "K.Maafushi".to_string(),
                destination: "K.Dhiffushi".to_string(),
                ..request(1)
            },
        ];

        for input in cases {
            let result = h.manager.create_booking(&customer(), input.clone()).await;
            assert!(
                matches!(result, Err(BookingError::BookingInvalid(_))),
                "expected BookingInvalid for {:?}, got {:?}",
                input,
                result
            );
        }
        assert!(h.store.list_bookings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_day_travel_is_allowed() {
        let h = harness(10).await;
        let input = NewBooking { date: "2030-06-01".to_string(), ..request(1) };
        assert!(h.manager.create_booking(&Requester::anonymous(), input).await.is_ok());
    }

    #[tokio::test]
    async fn test_persistence_failure_leaves_no_booking() {
        let h = harness(10).await;
        h.store.set_fail_writes(true);
        let result = h.manager.create_booking(&customer(), request(1)).await;
        assert!(matches!(result, Err(BookingError::Persistence(_))));

        h.store.set_fail_writes(false);
        assert!(h.store.list_bookings().await.unwrap().is_empty());
        assert_eq!(h.capacity.remaining_seats(&outbound_trip()).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_assign_seats_flow() {
        let h = harness(35).await;
        let booking = h.manager.create_booking(&customer(), request(2)).await.unwrap();

        let reference = booking.reference.as_str();

        let mismatch =
            h.manager.assign_seats(&customer(), reference, LegKind::Outbound, &[1]).await;
        assert!(matches!(mismatch, Err(BookingError::SeatCountMismatch { expected: 2, got: 1 })));

        // A repeated seat id counts once
        let repeated =
            h.manager.assign_seats(&customer(), reference, LegKind::Outbound, &[4, 4]).await;
        assert!(matches!(repeated, Err(BookingError::SeatCountMismatch { expected: 2, got: 1 })));

        let out_of_range =
            h.manager.assign_seats(&customer(), reference, LegKind::Outbound, &[1, 36]).await;
        assert!(matches!(out_of_range, Err(BookingError::InvalidSeat { seat: 36, capacity: 35 })));

        let zero = h.manager.assign_seats(&customer(), reference, LegKind::Outbound, &[0, 1]).await;
        assert!(matches!(zero, Err(BookingError::BookingInvalid(_))));

        let updated = h
            .manager
            .assign_seats(&customer(), &booking.reference, LegKind::Outbound, &[5, 6])
            .await
            .unwrap();
        assert_eq!(updated.status, BookingStatus::SeatsAssigned);
        assert_eq!(updated.outbound.assigned_seats.to_csv(), "5,6");

        // Own seats again: no self-conflict
        let again = h
            .manager
            .assign_seats(&customer(), &booking.reference, LegKind::Outbound, &[6, 5])
            .await
            .unwrap();
        assert_eq!(again.outbound.assigned_seats.to_csv(), "5,6");
    }

    #[tokio::test]
    async fn test_seat_conflict_across_bookings() {
        let h = harness(35).await;
        let first = h.manager.create_booking(&customer(), request(2)).await.unwrap();
        let second = h.manager.create_booking(&customer(), request(2)).await.unwrap();

        h.manager
            .assign_seats(&customer(), &first.reference, LegKind::Outbound, &[3, 4])
            .await
            .unwrap();
        let clash = h
            .manager
            .assign_seats(&customer(), &second.reference, LegKind::Outbound, &[4, 5])
            .await;
        assert!(matches!(clash, Err(BookingError::SeatConflict(4))));

        let map = h
            .manager
            .seat_map(&customer(), &second.reference, LegKind::Outbound)
            .await
            .unwrap();
        assert_eq!(map.taken.to_csv(), "3,4");
        assert!(map.selected.is_empty());
        assert_eq!(map.capacity, 35);
    }

    #[tokio::test]
    async fn test_return_seats_are_independent_of_outbound() {
        let h = harness(35).await;
        let booking = h.manager.create_booking(&customer(), round_trip(1)).await.unwrap();

        let partial = h
            .manager
            .assign_seats(&customer(), &booking.reference, LegKind::Outbound, &[1])
            .await
            .unwrap();
        assert_eq!(partial.status, BookingStatus::PendingSeats);

        let payment_too_early = h
            .manager
            .record_payment(&customer(), &booking.reference, PaymentInput::Stripe)
            .await;
        assert!(matches!(payment_too_early, Err(BookingError::InvalidState(_))));

        // Seat 1 on the return sailing is a different physical seat
        let complete = h
            .manager
            .assign_seats(&customer(), &booking.reference, LegKind::Return, &[1])
            .await
            .unwrap();
        assert_eq!(complete.status, BookingStatus::SeatsAssigned);
    }

    #[tokio::test]
    async fn test_return_leg_on_one_way_booking() {
        let h = harness(35).await;
        let booking = h.manager.create_booking(&customer(), request(1)).await.unwrap();
        let result = h
            .manager
            .assign_seats(&customer(), &booking.reference, LegKind::Return, &[1])
            .await;
        assert!(matches!(result, Err(BookingError::BookingInvalid(_))));
    }

    #[tokio::test]
    async fn test_payment_and_confirmation() {
        let h = harness(35).await;
        let booking = h.manager.create_booking(&customer(), request(1)).await.unwrap();
        h.manager
            .assign_seats(&customer(), &booking.reference, LegKind::Outbound, &[9])
            .await
            .unwrap();

        let paid = h
            .manager
            .record_payment(
                &customer(),
                &booking.reference,
                PaymentInput::BankTransfer { slip: Some("slip.jpg".to_string()) },
            )
            .await
            .unwrap();
        assert_eq!(paid.status, BookingStatus::PaymentRecorded);
        let payment = paid.payment.as_ref().unwrap();
        assert_eq!(payment.method, PaymentMethod::BankTransfer);
        assert_eq!(payment.status, PaymentStatus::Pending);

        assert_eq!(h.manager.pending_payments().await.unwrap().len(), 1);

        let again = h
            .manager
            .record_payment(&customer(), &booking.reference, PaymentInput::Stripe)
            .await;
        assert!(matches!(again, Err(BookingError::InvalidState(_))));

        let seats_after_payment = h
            .manager
            .assign_seats(&customer(), &booking.reference, LegKind::Outbound, &[10])
            .await;
        assert!(matches!(seats_after_payment, Err(BookingError::InvalidState(_))));

        let confirmed = h.manager.confirm_payment(&booking.reference).await.unwrap();
        assert_eq!(confirmed.payment.unwrap().status, PaymentStatus::Paid);
        assert!(h.manager.pending_payments().await.unwrap().is_empty());

        let twice = h.manager.confirm_payment(&booking.reference).await;
        assert!(matches!(twice, Err(BookingError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_cancel_permissions() {
        let h = harness(35).await;
        let owned = h.manager.create_booking(&customer(), request(1)).await.unwrap();
        let anonymous =
            h.manager.create_booking(&Requester::anonymous(), request(1)).await.unwrap();

        let stranger = Requester::customer("guest-2");
        assert!(matches!(
            h.manager.cancel(&stranger, &owned.reference).await,
            Err(BookingError::NotPermitted(_))
        ));
        assert!(matches!(
            h.manager.assign_seats(&stranger, &owned.reference, LegKind::Outbound, &[1]).await,
            Err(BookingError::NotPermitted(_))
        ));
        assert!(matches!(
            h.manager.cancel(&Requester::anonymous(), &anonymous.reference).await,
            Err(BookingError::NotPermitted(_))
        ));

        h.manager.cancel(&customer(), &owned.reference).await.unwrap();
        h.manager.cancel(&Requester::admin("admin"), &anonymous.reference).await.unwrap();
        assert!(matches!(
            h.manager.get(&owned.reference).await,
            Err(BookingError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_seat_map_is_private_to_owner() {
        let h = harness(35).await;
        let owned = h.manager.create_booking(&customer(), request(1)).await.unwrap();
        let anonymous =
            h.manager.create_booking(&Requester::anonymous(), request(1)).await.unwrap();

        let stranger = Requester::customer("guest-2");
        assert!(matches!(
            h.manager.seat_map(&stranger, &owned.reference, LegKind::Outbound).await,
            Err(BookingError::NotPermitted(_))
        ));
        assert!(matches!(
            h.manager.seat_map(&Requester::anonymous(), &owned.reference, LegKind::Outbound).await,
            Err(BookingError::NotPermitted(_))
        ));

        h.manager.seat_map(&customer(), &owned.reference, LegKind::Outbound).await.unwrap();
        h.manager
            .seat_map(&Requester::admin("admin"), &owned.reference, LegKind::Outbound)
            .await
            .unwrap();
        h.manager.seat_map(&stranger, &anonymous.reference, LegKind::Outbound).await.unwrap();
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let h = harness(35).await;
        let (tx, mut rx) = broadcast::channel(16);
        let manager = h.manager.with_events(tx);

        let booking = manager.create_booking(&customer(), request(1)).await.unwrap();
        manager
            .assign_seats(&customer(), &booking.reference, LegKind::Outbound, &[2])
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            BookingEvent::Created(e) => assert_eq!(e.reference, booking.reference),
            other => panic!("unexpected event {:?}", other),
        }
        match rx.recv().await.unwrap() {
            BookingEvent::SeatsAssigned(e) => assert_eq!(e.seat_numbers, vec![2]),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_purge_and_listing() {
        let h = harness(35).await;
        let mine = h.manager.create_booking(&customer(), request(1)).await.unwrap();
        h.manager.create_booking(&Requester::customer("guest-9"), request(1)).await.unwrap();

        assert_eq!(h.manager.list().await.unwrap().len(), 2);
        let for_me = h.manager.for_user("guest-1").await.unwrap();
        assert_eq!(for_me.len(), 1);
        assert_eq!(for_me[0].reference, mine.reference);

        assert!(matches!(
            h.manager.purge_older_than(0).await,
            Err(BookingError::BookingInvalid(_))
        ));
        // Created "now" on the fixed clock, so nothing is older than a day
        assert_eq!(h.manager.purge_older_than(1).await.unwrap(), 0);
        assert_eq!(h.manager.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_purge_rejects_days_beyond_calendar_range() {
        let h = harness(35).await;
        h.manager.create_booking(&customer(), request(1)).await.unwrap();

        let result = h.manager.purge_older_than(200_000_000).await;
        assert!(matches!(result, Err(BookingError::BookingInvalid(_))));
        assert_eq!(h.manager.list().await.unwrap().len(), 1);
    }
}
