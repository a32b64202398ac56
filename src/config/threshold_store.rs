// src/config/threshold_store.rs
//! Alarm-limit persistence: load on start, save on demand

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::alarm::AlarmThresholds;
use crate::error::ConfigError;

/// Storage for the alarm threshold map
pub trait ThresholdStore: Send + Sync {
    fn load(&self) -> Result<AlarmThresholds, ConfigError>;
    fn save(&self, thresholds: &AlarmThresholds) -> Result<(), ConfigError>;

    /// Stored limits, or factory defaults when they cannot be read
    fn load_or_default(&self) -> AlarmThresholds {
        match self.load() {
            Ok(thresholds) => thresholds,
            Err(err) => {
                warn!(error = %err, "alarm thresholds unavailable, using factory defaults");
                AlarmThresholds::factory_defaults()
            }
        }
    }
}

/// Thresholds kept in a TOML file, one table per vital
#[derive(Debug, Clone)]
pub struct TomlThresholdStore {
    path: PathBuf,
}

impl TomlThresholdStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ThresholdStore for TomlThresholdStore {
    fn load(&self) -> Result<AlarmThresholds, ConfigError> {
        if !self.path.exists() {
            return Err(ConfigError::FileNotFound(self.path.clone()));
        }
        let content = std::fs::read_to_string(&self.path)?;
        let thresholds: AlarmThresholds = toml::from_str(&content)?;
        info!(path = %self.path.display(), "alarm thresholds loaded");
        Ok(thresholds)
    }

    fn save(&self, thresholds: &AlarmThresholds) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, toml::to_string_pretty(thresholds)?)?;
        info!(path = %self.path.display(), "alarm thresholds saved");
        Ok(())
    }
}
