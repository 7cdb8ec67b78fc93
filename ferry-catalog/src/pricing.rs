use ferry_core::repository::SettingsRepository;
use ferry_core::settings::DEFAULT_CAPACITY;
use ferry_core::{FerrySettings, Port, Route};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub const MIN_CAPACITY: u32 = 1;
pub const MAX_CAPACITY: u32 = 100;
/// Fares are quoted to the laari.
pub const MAX_PRICE_SCALE: u32 = 2;

/// Per-seat fares from the two hubs. Island-to-hub fares come from back-fill.
const DEFAULT_FARES: &[(Port, Port, i64)] = &[
    (Port::Male, Port::Hulhumale, 100),
    (Port::Male, Port::Maafushi, 200),
    (Port::Male, Port::Guraidhoo, 200),
    (Port::Male, Port::Dhiffushi, 300),
    (Port::Male, Port::Rasdhoo, 300),
    (Port::Male, Port::Thinadhoo, 300),
    (Port::Male, Port::VelanaAirport, 100),
    (Port::VelanaAirport, Port::Male, 100),
    (Port::VelanaAirport, Port::Hulhumale, 100),
    (Port::VelanaAirport, Port::Maafushi, 200),
    (Port::VelanaAirport, Port::Guraidhoo, 200),
    (Port::VelanaAirport, Port::Dhiffushi, 300),
    (Port::VelanaAirport, Port::Rasdhoo, 300),
    (Port::VelanaAirport, Port::Thinadhoo, 300),
];

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("Invalid price {0}: must be greater than zero")]
    InvalidPrice(Decimal),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Invalid capacity {0}: must be between 1 and 100")]
    InvalidCapacity(u32),

    /// The in-memory value was applied but could not be saved.
    #[error("Settings could not be saved: {0}")]
    Persistence(String),
}

/// One row of the effective fare table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePrice {
    pub route: Route,
    pub price: Decimal,
}

/// Route -> per-seat price. Every stored price is positive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    prices: BTreeMap<Route, Decimal>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled-in hub fares, without back-fill.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        for &(origin, destination, fare) in DEFAULT_FARES {
            if let Ok(route) = Route::new(origin, destination) {
                table.prices.insert(route, Decimal::from(fare));
            }
        }
        table
    }

    /// Startup build order: static fares, saved overrides, then reverse back-fill.
    pub fn build(overrides: &BTreeMap<String, Decimal>) -> Self {
        let mut table = Self::with_defaults();
        table.apply_overrides(overrides);
        table.backfill_reverse();
        table
    }

    /// Overrides with an unparseable key or non-positive price are skipped.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, Decimal>) {
        for (key, price) in overrides {
            match Route::from_settings_key(key) {
                Ok(route) if *price > Decimal::ZERO => {
                    self.prices.insert(route, *price);
                }
                Ok(_) => warn!("Ignoring non-positive saved price {} for {}", price, key),
                Err(e) => warn!("Ignoring saved price for '{}': {}", key, e),
            }
        }
    }

    /// Give every route lacking a reverse price its forward price.
    pub fn backfill_reverse(&mut self) {
        let missing: Vec<(Route, Decimal)> = self
            .prices
            .iter()
            .map(|(route, price)| (route.reverse(), *price))
            .filter(|(reverse, _)| !self.prices.contains_key(reverse))
            .collect();

        for (route, price) in missing {
            self.prices.insert(route, price);
        }
    }

    pub fn contains(&self, route: &Route) -> bool {
        self.prices.contains_key(route)
    }

    /// Exact route first, then the reverse direction.
    pub fn price_for(&self, route: &Route) -> Option<Decimal> {
        self.prices
            .get(route)
            .or_else(|| self.prices.get(&route.reverse()))
            .copied()
    }

    pub fn set(&mut self, route: Route, price: Decimal) {
        self.prices.insert(route, price);
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn entries(&self) -> Vec<RoutePrice> {
        self.prices
            .iter()
            .map(|(route, price)| RoutePrice { route: *route, price: *price })
            .collect()
    }
}

struct ConfigState {
    settings: FerrySettings,
    prices: PriceTable,
}

/// Owns the admin-tunable capacity and fares along with their persisted form.
pub struct ConfigStore {
    state: RwLock<ConfigState>,
    repo: Arc<dyn SettingsRepository>,
}

impl ConfigStore {
    /// Load saved settings, falling back to `default_capacity` and the static
    /// fares when nothing has been saved or the store cannot be read.
    pub async fn load(repo: Arc<dyn SettingsRepository>, default_capacity: u32) -> Self {
        let default_capacity = if (MIN_CAPACITY..=MAX_CAPACITY).contains(&default_capacity) {
            default_capacity
        } else {
            warn!(
                "Configured default capacity {} out of range, using {}",
                default_capacity, DEFAULT_CAPACITY
            );
            DEFAULT_CAPACITY
        };

        let mut settings = match repo.load_settings().await {
            Ok(Some(settings)) => settings,
            Ok(None) => FerrySettings::with_capacity(default_capacity),
            Err(e) => {
                warn!("Failed to load ferry settings, using defaults: {}", e);
                FerrySettings::with_capacity(default_capacity)
            }
        };

        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&settings.ferry_capacity) {
            warn!(
                "Saved capacity {} out of range, using {}",
                settings.ferry_capacity, default_capacity
            );
            settings.ferry_capacity = default_capacity;
        }

        let prices = PriceTable::build(&settings.route_prices);
        info!(
            "Ferry settings loaded: capacity {}, {} priced routes",
            settings.ferry_capacity,
            prices.len()
        );

        Self {
            state: RwLock::new(ConfigState { settings, prices }),
            repo,
        }
    }

    pub async fn capacity(&self) -> u32 {
        self.state.read().await.settings.ferry_capacity
    }

    pub async fn price_for(&self, route: &Route) -> Result<Decimal, PricingError> {
        self.state
            .read()
            .await
            .prices
            .price_for(route)
            .ok_or_else(|| PricingError::RouteNotFound(route.to_string()))
    }

    /// Price lookup from free-form port names as typed into a booking form.
    pub async fn quote(&self, origin: &str, destination: &str) -> Result<Decimal, PricingError> {
        let route = Route::parse(origin, destination)
            .map_err(|_| PricingError::RouteNotFound(format!("{} -> {}", origin, destination)))?;
        self.price_for(&route).await
    }

    /// Full effective table, ordered by route.
    pub async fn price_table(&self) -> Vec<RoutePrice> {
        self.state.read().await.prices.entries()
    }

    pub async fn settings(&self) -> FerrySettings {
        self.state.read().await.settings.clone()
    }

    /// Override one fare. Only routes already in the table can be priced and
    /// the reverse fare is left as it is. Fares carry at most two decimals.
    ///
    /// The write lock is held until the save finishes so that concurrent
    /// updates reach the repository in the order they were applied.
    pub async fn set_price(&self, route: Route, price: Decimal) -> Result<(), PricingError> {
        if price <= Decimal::ZERO || price.normalize().scale() > MAX_PRICE_SCALE {
            return Err(PricingError::InvalidPrice(price));
        }

        let mut state = self.state.write().await;
        if !state.prices.contains(&route) {
            return Err(PricingError::RouteNotFound(route.to_string()));
        }
        state.prices.set(route, price);
        state.settings.route_prices.insert(route.settings_key(), price);

        info!("Price for {} set to {}", route, price);
        self.persist(&state.settings).await
    }

    pub async fn set_capacity(&self, capacity: u32) -> Result<(), PricingError> {
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
            return Err(PricingError::InvalidCapacity(capacity));
        }

        let mut state = self.state.write().await;
        state.settings.ferry_capacity = capacity;

        info!("Ferry capacity set to {}", capacity);
        self.persist(&state.settings).await
    }

    // No rollback: the new value stays live even when saving fails.
    async fn persist(&self, settings: &FerrySettings) -> Result<(), PricingError> {
        self.repo.save_settings(settings).await.map_err(|e| {
            warn!("Ferry settings applied in memory but not saved: {}", e);
            PricingError::Persistence(e.to_string())
        })
    }
}
