use ferry_core::repository::BookingRepository;
use ferry_core::TripKey;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::pricing::ConfigStore;

/// Seat counts for one sailing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub capacity: u32,
    pub booked: u32,
    pub remaining: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum CapacityError {
    #[error("Seats unavailable: requested {requested}, remaining {remaining}")]
    SeatsUnavailable {
        requested: u32,
        remaining: u32,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Live seat accounting against the process-wide capacity. Counts are read
/// from stored bookings on every call; there is no separate counter.
pub struct CapacityEngine {
    bookings: Arc<dyn BookingRepository>,
    config: Arc<ConfigStore>,
}

impl CapacityEngine {
    pub fn new(bookings: Arc<dyn BookingRepository>, config: Arc<ConfigStore>) -> Self {
        Self { bookings, config }
    }

    pub async fn booked_seats(&self, trip: &TripKey) -> Result<u32, CapacityError> {
        self.bookings
            .booked_seat_count(trip)
            .await
            .map_err(|e| CapacityError::Persistence(e.to_string()))
    }

    pub async fn availability(&self, trip: &TripKey) -> Result<Availability, CapacityError> {
        let capacity = self.config.capacity().await;
        let booked = self.booked_seats(trip).await?;
        Ok(Availability {
            capacity,
            booked,
            remaining: capacity.saturating_sub(booked),
        })
    }

    pub async fn remaining_seats(&self, trip: &TripKey) -> Result<u32, CapacityError> {
        Ok(self.availability(trip).await?.remaining)
    }

    /// Check that `requested` more seats fit on the sailing. Returns the seats
    /// that would remain afterwards.
    ///
    /// Nothing is held between this check and the caller's insert.
    pub async fn ensure_available(
        &self,
        trip: &TripKey,
        requested: u32,
    ) -> Result<u32, CapacityError> {
        let availability = self.availability(trip).await?;
        if requested > availability.remaining {
            return Err(CapacityError::SeatsUnavailable {
                requested,
                remaining: availability.remaining,
            });
        }
        Ok(availability.remaining - requested)
    }
}
