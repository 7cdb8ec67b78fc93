use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_CAPACITY: u32 = 35;

/// Admin-controlled settings persisted as one JSON document:
/// `{ "ferry_capacity": 35, "route_prices": { "Male,Hulhumale": 120 } }`.
///
/// `route_prices` only carries admin overrides keyed by `Origin,Destination`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FerrySettings {
    #[serde(default = "default_capacity")]
    pub ferry_capacity: u32,
    #[serde(default)]
    pub route_prices: BTreeMap<String, Decimal>,
}

fn default_capacity() -> u32 {
    DEFAULT_CAPACITY
}

impl FerrySettings {
    pub fn with_capacity(ferry_capacity: u32) -> Self {
        Self {
            ferry_capacity,
            route_prices: BTreeMap::new(),
        }
    }
}

impl Default for FerrySettings {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_json_layout() {
        let json = r#"{ "ferry_capacity": 40, "route_prices": { "Male,Hulhumale": 150.5 } }"#;
        let settings: FerrySettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.ferry_capacity, 40);
        assert_eq!(settings.route_prices["Male,Hulhumale"], Decimal::new(1505, 1));
    }

    #[test]
    fn test_settings_missing_fields_use_defaults() {
        let settings: FerrySettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, FerrySettings::default());
    }
}
