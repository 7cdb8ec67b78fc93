use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use ferry_core::repository::{
    BookingRepository, ScheduleRepository, SettingsRepository, StoreResult,
};
use ferry_core::{
    Booking, DailySchedule, DepartureTime, FerrySettings, LegKind, RecurringSchedule, Route,
    TripKey,
};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::RwLock;

/// Process-local store used when no database is configured, and by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bookings: RwLock<Vec<Booking>>,
    recurring: RwLock<Vec<RecurringSchedule>>,
    daily: RwLock<Vec<DailySchedule>>,
    next_schedule_id: AtomicI64,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, as an unreachable backend would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err("memory store is rejecting writes".into());
        }
        Ok(())
    }

    fn next_id(&self) -> i64 {
        self.next_schedule_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

fn newest_first(mut bookings: Vec<Booking>) -> Vec<Booking> {
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    bookings
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()> {
        self.check_writable()?;
        let mut bookings = self.bookings.write().await;
        if bookings.iter().any(|b| b.reference == booking.reference) {
            return Err(format!("duplicate booking reference {}", booking.reference).into());
        }
        bookings.push(booking.clone());
        Ok(())
    }

    async fn update_booking(&self, booking: &Booking) -> StoreResult<()> {
        self.check_writable()?;
        let mut bookings = self.bookings.write().await;
        let slot = bookings
            .iter_mut()
            .find(|b| b.reference == booking.reference)
            .ok_or_else(|| format!("booking {} does not exist", booking.reference))?;
        *slot = booking.clone();
        Ok(())
    }

    async fn get_booking(&self, reference: &str) -> StoreResult<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings.iter().find(|b| b.reference == reference).cloned())
    }

    async fn reference_exists(&self, reference: &str) -> StoreResult<bool> {
        let bookings = self.bookings.read().await;
        Ok(bookings.iter().any(|b| b.reference == reference))
    }

    async fn delete_booking(&self, reference: &str) -> StoreResult<bool> {
        self.check_writable()?;
        let mut bookings = self.bookings.write().await;
        let before = bookings.len();
        bookings.retain(|b| b.reference != reference);
        Ok(bookings.len() < before)
    }

    async fn booked_seat_count(&self, trip: &TripKey) -> StoreResult<u32> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .iter()
            .filter(|b| &b.outbound.trip == trip)
            .map(|b| b.seats)
            .sum())
    }

    async fn bookings_on_trip(&self, trip: &TripKey, leg: LegKind) -> StoreResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .iter()
            .filter(|b| b.leg(leg).is_some_and(|l| &l.trip == trip))
            .cloned()
            .collect())
    }

    async fn list_bookings(&self) -> StoreResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(newest_first(bookings.clone()))
    }

    async fn list_bookings_for_user(&self, user_id: &str) -> StoreResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(newest_first(
            bookings
                .iter()
                .filter(|b| b.user_id.as_deref() == Some(user_id))
                .cloned()
                .collect(),
        ))
    }

    async fn delete_bookings_created_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        self.check_writable()?;
        let mut bookings = self.bookings.write().await;
        let before = bookings.len();
        bookings.retain(|b| b.created_at >= cutoff);
        Ok((before - bookings.len()) as u64)
    }
}

#[async_trait]
impl ScheduleRepository for MemoryStore {
    async fn active_daily(
        &self,
        route: &Route,
        date: NaiveDate,
    ) -> StoreResult<Vec<DailySchedule>> {
        let daily = self.daily.read().await;
        Ok(daily
            .iter()
            .filter(|d| d.active && &d.route == route && d.date == date)
            .cloned()
            .collect())
    }

    async fn active_recurring(&self, route: &Route) -> StoreResult<Vec<RecurringSchedule>> {
        let recurring = self.recurring.read().await;
        Ok(recurring
            .iter()
            .filter(|s| s.active && &s.route == route)
            .cloned()
            .collect())
    }

    async fn list_recurring(&self) -> StoreResult<Vec<RecurringSchedule>> {
        let mut recurring = self.recurring.read().await.clone();
        recurring.sort_by(|a, b| (a.route, &a.time).cmp(&(b.route, &b.time)));
        Ok(recurring)
    }

    async fn list_daily(&self) -> StoreResult<Vec<DailySchedule>> {
        let mut daily = self.daily.read().await.clone();
        daily.sort_by(|a, b| (a.date, a.route, &a.time).cmp(&(b.date, b.route, &b.time)));
        Ok(daily)
    }

    async fn find_recurring(
        &self,
        route: &Route,
        time: &DepartureTime,
    ) -> StoreResult<Option<RecurringSchedule>> {
        let recurring = self.recurring.read().await;
        Ok(recurring
            .iter()
            .find(|s| &s.route == route && &s.time == time)
            .cloned())
    }

    async fn insert_recurring(
        &self,
        route: &Route,
        time: &DepartureTime,
    ) -> StoreResult<RecurringSchedule> {
        self.check_writable()?;
        let entry = RecurringSchedule {
            id: self.next_id(),
            route: *route,
            time: time.clone(),
            active: true,
            created_at: Utc::now(),
        };
        self.recurring.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn find_daily(
        &self,
        route: &Route,
        date: NaiveDate,
        time: &DepartureTime,
    ) -> StoreResult<Option<DailySchedule>> {
        let daily = self.daily.read().await;
        Ok(daily
            .iter()
            .find(|d| &d.route == route && d.date == date && &d.time == time)
            .cloned())
    }

    async fn insert_daily(
        &self,
        route: &Route,
        date: NaiveDate,
        time: &DepartureTime,
    ) -> StoreResult<DailySchedule> {
        self.check_writable()?;
        let entry = DailySchedule {
            id: self.next_id(),
            route: *route,
            date,
            time: time.clone(),
            active: true,
            created_at: Utc::now(),
        };
        self.daily.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn delete_recurring(&self, id: i64) -> StoreResult<bool> {
        self.check_writable()?;
        let mut recurring = self.recurring.write().await;
        let before = recurring.len();
        recurring.retain(|s| s.id != id);
        Ok(recurring.len() < before)
    }

    async fn delete_daily(&self, id: i64) -> StoreResult<bool> {
        self.check_writable()?;
        let mut daily = self.daily.write().await;
        let before = daily.len();
        daily.retain(|d| d.id != id);
        Ok(daily.len() < before)
    }
}

/// Settings kept in memory only; useful for tests and throwaway instances.
#[derive(Debug, Default)]
pub struct MemorySettings {
    settings: RwLock<Option<FerrySettings>>,
    fail_writes: AtomicBool,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: FerrySettings) -> Self {
        Self {
            settings: RwLock::new(Some(settings)),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn saved(&self) -> Option<FerrySettings> {
        self.settings.read().await.clone()
    }
}

#[async_trait]
impl SettingsRepository for MemorySettings {
    async fn load_settings(&self) -> StoreResult<Option<FerrySettings>> {
        Ok(self.settings.read().await.clone())
    }

    async fn save_settings(&self, settings: &FerrySettings) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err("settings store is rejecting writes".into());
        }
        *self.settings.write().await = Some(settings.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::{Leg, Passenger, Port, BookingStatus};
    use ferry_shared::Masked;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn trip(time: &str) -> TripKey {
        TripKey::new(
            Route::new(Port::Male, Port::Hulhumale).unwrap(),
            NaiveDate::from_ymd_opt(2030, 5, 1).unwrap(),
            time.parse().unwrap(),
        )
    }

    fn booking(reference: &str, trip: TripKey, seats: u32) -> Booking {
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4(),
            reference: reference.to_string(),
            user_id: None,
            passenger: Passenger {
                name: "Test".to_string(),
                email: Masked::new("test@example.com".to_string()),
                phone: "123".to_string(),
            },
            outbound: Leg::new(trip, Decimal::from(100)),
            return_leg: None,
            seats,
            total_price: Decimal::from(100 * seats),
            status: BookingStatus::PendingSeats,
            payment: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_booked_seat_count_matches_exact_trip() {
        let store = MemoryStore::new();
        store.insert_booking(&booking("AAAA0001", trip("08:00"), 2)).await.unwrap();
        store.insert_booking(&booking("AAAA0002", trip("08:00"), 3)).await.unwrap();
        store.insert_booking(&booking("AAAA0003", trip("10:00"), 4)).await.unwrap();

        assert_eq!(store.booked_seat_count(&trip("08:00")).await.unwrap(), 5);
        assert_eq!(store.booked_seat_count(&trip("10:00")).await.unwrap(), 4);
        assert_eq!(store.booked_seat_count(&trip("14:00")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_reference_rejected() {
        let store = MemoryStore::new();
        store.insert_booking(&booking("DUPE0001", trip("08:00"), 1)).await.unwrap();
        assert!(store.insert_booking(&booking("DUPE0001", trip("08:00"), 1)).await.is_err());
        assert!(store.reference_exists("DUPE0001").await.unwrap());
    }

    #[tokio::test]
    async fn test_failing_writes_leave_store_untouched() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        assert!(store.insert_booking(&booking("FAIL0001", trip("08:00"), 1)).await.is_err());
        assert!(store.list_bookings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_daily_lookup_ignores_inactive_and_other_dates() {
        let store = MemoryStore::new();
        let route = Route::new(Port::Male, Port::Hulhumale).unwrap();
        let date = NaiveDate::from_ymd_opt(2030, 5, 1).unwrap();
        store.insert_daily(&route, date, &"10:00".parse().unwrap()).await.unwrap();
        store
            .insert_daily(&route, date.succ_opt().unwrap(), &"11:00".parse().unwrap())
            .await
            .unwrap();

        let found = store.active_daily(&route, date).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].time.as_str(), "10:00");
    }
}
