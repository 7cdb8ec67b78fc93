use std::sync::Arc;
use ferry_catalog::{CapacityEngine, ConfigStore, ScheduleResolver};
use ferry_core::repository::{BookingRepository, ScheduleRepository, SettingsRepository};
use ferry_core::Clock;
use ferry_order::BookingManager;
use ferry_shared::models::events::BookingEvent;
use ferry_store::app_config::AuthConfig;
use ferry_store::RedisClient;
use tokio::sync::broadcast;

const EVENT_BUFFER: usize = 100;

/// Storage backends the service runs on.
pub struct Backends {
    pub bookings: Arc<dyn BookingRepository>,
    pub schedules: Arc<dyn ScheduleRepository>,
    pub settings: Arc<dyn SettingsRepository>,
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingManager>,
    pub schedules: Arc<ScheduleResolver>,
    pub capacity: Arc<CapacityEngine>,
    pub config: Arc<ConfigStore>,
    pub clock: Arc<dyn Clock>,
    /// Rate limiting is skipped when absent.
    pub redis: Option<Arc<RedisClient>>,
    pub sse_tx: broadcast::Sender<BookingEvent>,
    pub auth: AuthConfig,
}

impl AppState {
    /// Wire the services together. Loads the persisted ferry settings,
    /// falling back to `default_capacity` and the built-in fares.
    pub async fn build(
        backends: Backends,
        clock: Arc<dyn Clock>,
        default_capacity: u32,
        auth: AuthConfig,
        redis: Option<Arc<RedisClient>>,
    ) -> Self {
        let config = Arc::new(ConfigStore::load(backends.settings, default_capacity).await);
        let capacity = Arc::new(CapacityEngine::new(backends.bookings.clone(), config.clone()));
        let schedules = Arc::new(ScheduleResolver::new(backends.schedules, capacity.clone()));

        let (sse_tx, _) = broadcast::channel(EVENT_BUFFER);
        let bookings = Arc::new(
            BookingManager::new(backends.bookings, config.clone(), capacity.clone(), clock.clone())
                .with_events(sse_tx.clone()),
        );

        Self {
            bookings,
            schedules,
            capacity,
            config,
            clock,
            redis,
            sse_tx,
            auth,
        }
    }
}
