use std::net::SocketAddr;
use std::sync::Arc;
use ferry_api::{app, AppState, Backends};
use ferry_core::repository::{BookingRepository, ScheduleRepository};
use ferry_core::SystemClock;
use ferry_store::{
    app_config::Config, DbClient, JsonSettingsFile, MemoryStore, RedisClient,
    StoreBookingRepository, StoreScheduleRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "ferry_api=debug,tower_http=debug,axum::rejection=trace".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Starting ferry booking API on port {}", config.server.port);

    let (bookings, schedules): (Arc<dyn BookingRepository>, Arc<dyn ScheduleRepository>) =
        match &config.database.url {
            Some(url) => {
                let db = DbClient::new(url, config.database.max_connections).await?;
                db.migrate().await?;
                tracing::info!("Connected to Postgres");
                (
                    Arc::new(StoreBookingRepository::new(db.pool.clone())),
                    Arc::new(StoreScheduleRepository::new(db.pool.clone())),
                )
            }
            None => {
                tracing::warn!("No database configured, bookings are kept in memory");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
        };

    let redis = match &config.redis.url {
        Some(url) => match RedisClient::new(url).await {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!("Redis unavailable, rate limiting disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let backends = Backends {
        bookings,
        schedules,
        settings: Arc::new(JsonSettingsFile::new(&config.booking.settings_path)),
    };

    let state = AppState::build(
        backends,
        Arc::new(SystemClock),
        config.booking.default_capacity,
        config.auth.clone(),
        redis,
    )
    .await;

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
