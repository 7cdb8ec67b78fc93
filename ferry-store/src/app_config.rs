use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// Postgres connection. Without a URL the service keeps everything in memory.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Redis backs the per-IP rate limiter. Without a URL no limit is applied.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
    pub admin_username: String,
    pub admin_password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    /// JSON file holding capacity and price overrides.
    #[serde(default = "default_settings_path")]
    pub settings_path: String,
    /// Capacity used until an admin saves one.
    #[serde(default = "default_capacity")]
    pub default_capacity: u32,
}

fn default_settings_path() -> String { "config/ferry_settings.json".to_string() }

fn default_capacity() -> u32 { ferry_core::settings::DEFAULT_CAPACITY }

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            default_capacity: default_capacity(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `FERRY__SERVER__PORT=8080` sets `server.port`
            .add_source(config::Environment::with_prefix("FERRY").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
