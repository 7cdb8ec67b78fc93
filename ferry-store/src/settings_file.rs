use async_trait::async_trait;
use ferry_core::repository::{SettingsRepository, StoreResult};
use ferry_core::FerrySettings;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Settings persisted as a pretty-printed JSON document on local disk.
#[derive(Debug, Clone)]
pub struct JsonSettingsFile {
    path: PathBuf,
}

impl JsonSettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsRepository for JsonSettingsFile {
    async fn load_settings(&self) -> StoreResult<Option<FerrySettings>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No settings file at {}, using defaults", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<FerrySettings>(&raw) {
            Ok(settings) => Ok(Some(settings)),
            Err(e) => {
                // An unreadable file falls back to defaults rather than refusing to start
                warn!("Ignoring malformed settings file {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    async fn save_settings(&self, settings: &FerrySettings) -> StoreResult<()> {
        let body = serde_json::to_string_pretty(settings)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, body).await?;
        info!("Settings saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsFile::new(dir.path().join("absent.json"));
        assert!(store.load_settings().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsFile::new(dir.path().join("nested/settings.json"));

        let mut settings = FerrySettings::with_capacity(50);
        settings
            .route_prices
            .insert("Male,Hulhumale".to_string(), Decimal::from(150));
        store.save_settings(&settings).await.unwrap();

        let loaded = store.load_settings().await.unwrap().unwrap();
        assert_eq!(loaded, settings);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["ferry_capacity"], 50);
        assert!(value["route_prices"]["Male,Hulhumale"].is_number());
    }

    #[tokio::test]
    async fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonSettingsFile::new(path);
        assert!(store.load_settings().await.unwrap().is_none());
    }
}
