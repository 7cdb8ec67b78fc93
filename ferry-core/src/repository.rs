use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::booking::{Booking, LegKind};
use crate::route::Route;
use crate::schedule::{DailySchedule, RecurringSchedule};
use crate::settings::FerrySettings;
use crate::trip::{DepartureTime, TripKey};

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;
pub type StoreResult<T> = Result<T, StoreError>;

/// Repository trait for booking data access
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()>;

    /// Replace the stored booking with the same reference.
    async fn update_booking(&self, booking: &Booking) -> StoreResult<()>;

    async fn get_booking(&self, reference: &str) -> StoreResult<Option<Booking>>;

    async fn reference_exists(&self, reference: &str) -> StoreResult<bool>;

    /// Returns `false` when nothing was deleted.
    async fn delete_booking(&self, reference: &str) -> StoreResult<bool>;

    /// Sum of requested seats over bookings whose outbound leg is this trip,
    /// whether or not seat numbers have been picked yet.
    async fn booked_seat_count(&self, trip: &TripKey) -> StoreResult<u32>;

    /// Bookings whose leg of the given kind sails on this trip.
    async fn bookings_on_trip(&self, trip: &TripKey, leg: LegKind) -> StoreResult<Vec<Booking>>;

    /// All bookings, newest first.
    async fn list_bookings(&self) -> StoreResult<Vec<Booking>>;

    /// Bookings attached to one user, newest first.
    async fn list_bookings_for_user(&self, user_id: &str) -> StoreResult<Vec<Booking>>;

    async fn delete_bookings_created_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

/// Repository trait for recurring and date-specific timetables
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Active date-specific entries for one route and date.
    async fn active_daily(&self, route: &Route, date: NaiveDate) -> StoreResult<Vec<DailySchedule>>;

    /// Active recurring entries for one route.
    async fn active_recurring(&self, route: &Route) -> StoreResult<Vec<RecurringSchedule>>;

    async fn list_recurring(&self) -> StoreResult<Vec<RecurringSchedule>>;

    async fn list_daily(&self) -> StoreResult<Vec<DailySchedule>>;

    async fn find_recurring(
        &self,
        route: &Route,
        time: &DepartureTime,
    ) -> StoreResult<Option<RecurringSchedule>>;

    async fn insert_recurring(
        &self,
        route: &Route,
        time: &DepartureTime,
    ) -> StoreResult<RecurringSchedule>;

    async fn find_daily(
        &self,
        route: &Route,
        date: NaiveDate,
        time: &DepartureTime,
    ) -> StoreResult<Option<DailySchedule>>;

    async fn insert_daily(
        &self,
        route: &Route,
        date: NaiveDate,
        time: &DepartureTime,
    ) -> StoreResult<DailySchedule>;

    async fn delete_recurring(&self, id: i64) -> StoreResult<bool>;

    async fn delete_daily(&self, id: i64) -> StoreResult<bool>;
}

/// Durable home of the admin settings blob (capacity and price overrides).
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// `None` when nothing has been saved yet.
    async fn load_settings(&self) -> StoreResult<Option<FerrySettings>>;

    /// Rewrites the whole document.
    async fn save_settings(&self, settings: &FerrySettings) -> StoreResult<()>;
}
