// src/config/loader.rs
//! Layered configuration loader: defaults, TOML files, then environment overrides

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::{constants::paths, EngineConfig};
use crate::error::ConfigError;

/// Configuration loader
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
    current_config: Arc<RwLock<EngineConfig>>,
}

impl ConfigLoader {
    /// Loader over the standard search paths
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    /// Create loader with custom paths, later paths taking precedence
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_prefix: paths::ENV_PREFIX.to_string(),
            current_config: Arc::new(RwLock::new(EngineConfig::default())),
        }
    }

    /// Use a different environment variable prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load, merge and validate
    pub fn load(&mut self) -> Result<EngineConfig, ConfigError> {
        let config = self.load_and_merge_configs()?;
        *self.current_config.write() = config.clone();
        Ok(config)
    }

    /// Load, falling back to factory defaults on any failure
    pub fn load_or_default(&mut self) -> EngineConfig {
        match self.load() {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "configuration unavailable, using factory defaults");
                let config = EngineConfig::default();
                *self.current_config.write() = config.clone();
                config
            }
        }
    }

    /// Last successfully loaded configuration
    pub fn current(&self) -> EngineConfig {
        self.current_config.read().clone()
    }

    /// Validate a single file merged over the defaults
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let mut merged = Self::default_value()?;
        Self::merge_toml_values(&mut merged, Self::load_config_file(path.as_ref())?);
        Self::into_config(merged).map(|_| ())
    }

    /// Export current configuration to file
    pub fn export_config<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let toml_content = toml::to_string_pretty(&self.current())?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn load_and_merge_configs(&self) -> Result<EngineConfig, ConfigError> {
        let mut merged = Self::default_value()?;

        for config_path in &self.config_paths {
            match Self::load_config_file(config_path) {
                Ok(file_config) => {
                    debug!(path = %config_path.display(), "merging configuration file");
                    Self::merge_toml_values(&mut merged, file_config);
                }
                Err(ConfigError::FileNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        self.apply_environment_overrides(&mut merged);
        let config = Self::into_config(merged)?;
        info!(
            animation_hz = config.timing.animation_rate_hz,
            channel_length = config.buffers.channel_length,
            "configuration loaded"
        );
        Ok(config)
    }

    fn default_value() -> Result<toml::Value, ConfigError> {
        toml::Value::try_from(EngineConfig::default()).map_err(ConfigError::from)
    }

    fn into_config(value: toml::Value) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = value
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(format!("failed to deserialize config: {e}")))?;
        config.validate_consistency().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    fn load_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
        match (base, overlay) {
            (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
                for (key, value) in overlay_table {
                    if let Some(base_value) = base_table.get_mut(&key) {
                        Self::merge_toml_values(base_value, value);
                    } else {
                        base_table.insert(key, value);
                    }
                }
            }
            (base_value, overlay_value) => {
                *base_value = overlay_value;
            }
        }
    }

    /// `PREFIX_SECTION_FIELD` sets `section.field`; `__` descends a further level,
    /// so `MONITOR_SIMULATION_INITIAL_VITALS__HEART_RATE` sets
    /// `simulation.initial_vitals.heart_rate`.
    fn apply_environment_overrides(&self, config: &mut toml::Value) {
        for (key, value) in std::env::vars() {
            let Some(path) = env_key_to_path(&key, &self.env_prefix) else {
                continue;
            };
            debug!(variable = %key, path = %path, "environment override");
            Self::set_nested_value(config, &path, parse_env_value(&value));
        }
    }

    fn set_nested_value(config: &mut toml::Value, path: &str, value: toml::Value) {
        let parts: Vec<&str> = path.split('.').collect();
        let mut current = config;

        for (i, part) in parts.iter().enumerate() {
            let toml::Value::Table(table) = current else {
                return;
            };
            if i == parts.len() - 1 {
                table.insert(part.to_string(), value);
                return;
            }
            current = table
                .entry(part.to_string())
                .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(paths::SYSTEM_CONFIG_PATH)];

        if let Some(home_dir) = home_dir() {
            paths.push(home_dir.join(paths::USER_CONFIG_DIR).join("config.toml"));
        }

        paths.push(PathBuf::from(paths::DEFAULT_CONFIG_FILE));
        paths.push(PathBuf::from(paths::LOCAL_CONFIG_FILE));
        paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn env_key_to_path(key: &str, prefix: &str) -> Option<String> {
    let rest = key.strip_prefix(prefix)?.to_lowercase();
    let (section, field) = rest.split_once('_')?;
    if section.is_empty() || field.is_empty() {
        return None;
    }
    Some(format!("{section}.{}", field.replace("__", ".")))
}

fn parse_env_value(value: &str) -> toml::Value {
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("USERPROFILE").map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn test_config_loader_creation() {
        let loader = ConfigLoader::new();
        assert!(!loader.config_paths().is_empty());
    }

    #[test]
    #[serial]
    fn test_missing_files_yield_defaults() {
        let mut loader = ConfigLoader::with_paths(vec![PathBuf::from("/nonexistent/monitor.toml")])
            .with_env_prefix("MONITOR_TEST_UNUSED_");
        assert_eq!(loader.load().unwrap(), EngineConfig::default());
    }

    #[test]
    #[serial]
    fn test_later_files_take_precedence() {
        let base = write_config("[timing]\njitter_interval_ms = 3000\nalarm_interval_ms = 1500");
        let local = write_config("[timing]\nalarm_interval_ms = 750");

        let mut loader = ConfigLoader::with_paths(vec![base.path().into(), local.path().into()])
            .with_env_prefix("MONITOR_TEST_UNUSED_");
        let config = loader.load().unwrap();

        assert_eq!(config.timing.jitter_interval_ms, 3000);
        assert_eq!(config.timing.alarm_interval_ms, 750);
        assert_eq!(loader.current(), config);
    }

    #[test]
    fn test_config_file_validation() {
        let loader = ConfigLoader::with_paths(Vec::new());
        let valid = write_config("[buffers]\nchannel_length = 1024");
        assert!(loader.validate_config_file(valid.path()).is_ok());

        let invalid = write_config("[buffers]\nchannel_length = 2");
        assert!(matches!(
            loader.validate_config_file(invalid.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        unsafe {
            std::env::set_var("MONITOR_TIMING_JITTER_INTERVAL_MS", "4000");
            std::env::set_var("MONITOR_SIMULATION_INITIAL_VITALS__HEART_RATE", "132.5");
        }

        let mut loader = ConfigLoader::with_paths(Vec::new());
        let config = loader.load().unwrap();

        assert_eq!(config.timing.jitter_interval_ms, 4000);
        assert_eq!(config.simulation.initial_vitals.heart_rate, 132.5);

        unsafe {
            std::env::remove_var("MONITOR_TIMING_JITTER_INTERVAL_MS");
            std::env::remove_var("MONITOR_SIMULATION_INITIAL_VITALS__HEART_RATE");
        }
    }

    #[test]
    #[serial]
    fn test_load_or_default_on_corrupt_file() {
        let corrupt = write_config("[timing\nthis is not toml");
        let mut loader = ConfigLoader::with_paths(vec![corrupt.path().into()])
            .with_env_prefix("MONITOR_TEST_UNUSED_");
        assert!(loader.load().is_err());
        assert_eq!(loader.load_or_default(), EngineConfig::default());
    }

    #[test]
    fn test_env_key_mapping() {
        assert_eq!(
            env_key_to_path("MONITOR_ALARMS_DEBOUNCE_MS", "MONITOR_").as_deref(),
            Some("alarms.debounce_ms")
        );
        assert_eq!(
            env_key_to_path("MONITOR_ALARMS_TONE__FREQUENCY_HZ", "MONITOR_").as_deref(),
            Some("alarms.tone.frequency_hz")
        );
        assert_eq!(env_key_to_path("MONITOR_", "MONITOR_"), None);
        assert_eq!(env_key_to_path("PATH", "MONITOR_"), None);
    }

    #[test]
    fn test_config_export() {
        let loader = ConfigLoader::with_paths(Vec::new());
        let temp_file = NamedTempFile::new().unwrap();

        assert!(loader.export_config(temp_file.path()).is_ok());

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("[timing]"));
    }
}
