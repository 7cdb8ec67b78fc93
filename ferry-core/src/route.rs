use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// The ports served by the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Port {
    Male,
    Hulhumale,
    VelanaAirport,
    Maafushi,
    Dhiffushi,
    Guraidhoo,
    Rasdhoo,
    Thinadhoo,
}

impl Port {
    pub const ALL: [Port; 8] = [
        Port::Male,
        Port::Hulhumale,
        Port::VelanaAirport,
        Port::Maafushi,
        Port::Dhiffushi,
        Port::Guraidhoo,
        Port::Rasdhoo,
        Port::Thinadhoo,
    ];

    /// Public name used on tickets, forms and in the settings file.
    pub fn name(&self) -> &'static str {
        match self {
            Port::Male => "Male",
            Port::Hulhumale => "Hulhumale",
            Port::VelanaAirport => "Velana International Airport",
            Port::Maafushi => "K.Maafushi",
            Port::Dhiffushi => "K.Dhiffushi",
            Port::Guraidhoo => "K.Guraidhoo",
            Port::Rasdhoo => "AA.Rasdhoo",
            Port::Thinadhoo => "V.Thinadhoo",
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Port {
    type Err = CoreError;

    /// Exact name first, then a trimmed case-insensitive match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(port) = Port::ALL.iter().find(|p| p.name() == s) {
            return Ok(*port);
        }

        let normalized = s.trim().to_lowercase();
        Port::ALL
            .iter()
            .find(|p| p.name().to_lowercase() == normalized)
            .copied()
            .ok_or_else(|| CoreError::UnknownPort(s.to_string()))
    }
}

impl TryFrom<String> for Port {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Port> for &'static str {
    fn from(port: Port) -> Self {
        port.name()
    }
}

/// An ordered (origin, destination) pair. The reverse direction is a
/// distinct route with its own price and its own sailings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Route {
    pub origin: Port,
    pub destination: Port,
}

impl Route {
    pub fn new(origin: Port, destination: Port) -> Result<Self, CoreError> {
        if origin == destination {
            return Err(CoreError::SameOriginAndDestination(origin.to_string()));
        }
        Ok(Self { origin, destination })
    }

    /// Build a route from free-form port names as submitted by a form.
    pub fn parse(origin: &str, destination: &str) -> Result<Self, CoreError> {
        Self::new(origin.parse()?, destination.parse()?)
    }

    pub fn reverse(&self) -> Self {
        Self {
            origin: self.destination,
            destination: self.origin,
        }
    }

    /// Key used in the persisted settings blob, e.g. `Male,Hulhumale`.
    pub fn settings_key(&self) -> String {
        format!("{},{}", self.origin, self.destination)
    }

    pub fn from_settings_key(key: &str) -> Result<Self, CoreError> {
        let (origin, destination) = key.split_once(',').ok_or_else(|| {
            CoreError::ValidationError(format!("route key '{}' has no comma", key))
        })?;
        Self::parse(origin, destination)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.origin, self.destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_parsing_is_tolerant() {
        assert_eq!("Male".parse::<Port>().unwrap(), Port::Male);
        assert_eq!("  k.maafushi ".parse::<Port>().unwrap(), Port::Maafushi);
        assert_eq!(
            "VELANA INTERNATIONAL AIRPORT".parse::<Port>().unwrap(),
            Port::VelanaAirport
        );
        assert!(matches!("Atlantis".parse::<Port>(), Err(CoreError::UnknownPort(_))));
    }

    #[test]
    fn test_port_serde_uses_public_names() {
        let json = serde_json::to_string(&Port::Rasdhoo).unwrap();
        assert_eq!(json, "\"AA.Rasdhoo\"");
        let port: Port = serde_json::from_str("\"v.thinadhoo\"").unwrap();
        assert_eq!(port, Port::Thinadhoo);
    }

    #[test]
    fn test_route_rejects_same_port() {
        assert!(matches!(
            Route::new(Port::Male, Port::Male),
            Err(CoreError::SameOriginAndDestination(_))
        ));
    }

    #[test]
    fn test_route_settings_key() {
        let route = Route::new(Port::VelanaAirport, Port::Hulhumale).unwrap();
        assert_eq!(route.settings_key(), "Velana International Airport,Hulhumale");
        assert_eq!(Route::from_settings_key(&route.settings_key()).unwrap(), route);
        assert_eq!(route.reverse().reverse(), route);
        assert!(Route::from_settings_key("Male").is_err());
    }
}
