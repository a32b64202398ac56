// src/config/mod.rs
//! Engine configuration: timing, buffers, alarms, events and initial simulation state

pub mod constants;
pub mod loader;
pub mod threshold_store;

pub use constants::*;
pub use loader::ConfigLoader;
pub use threshold_store::{ThresholdStore, TomlThresholdStore};

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmPolicy, ToneSpec};
use crate::physiology::{ClinicalState, ConditionSet, RhythmType, TargetVitals, VitalKey};

/// Complete engine configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub buffers: BufferConfig,
    #[serde(default)]
    pub alarms: AlarmConfig,
    #[serde(default)]
    pub events: EventConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Periodic activity rates
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TimingConfig {
    #[serde(default = "defaults::animation_rate_hz")]
    pub animation_rate_hz: u32,

    #[serde(default = "defaults::scenario_interval_ms")]
    pub scenario_interval_ms: u64,

    #[serde(default = "defaults::jitter_interval_ms")]
    pub jitter_interval_ms: u64,

    #[serde(default = "defaults::alarm_interval_ms")]
    pub alarm_interval_ms: u64,

    /// Animation steps longer than this are clamped
    #[serde(default = "defaults::max_frame_dt_ms")]
    pub max_frame_dt_ms: f64,
}

/// Rolling channel history
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BufferConfig {
    #[serde(default = "defaults::channel_length")]
    pub channel_length: usize,
}

/// Alarm supervision settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AlarmConfig {
    #[serde(default = "defaults::debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "defaults::snooze_duration_minutes")]
    pub snooze_duration_minutes: u32,

    #[serde(default = "defaults::history_limit")]
    pub history_limit: usize,

    #[serde(default)]
    pub tone: ToneSpec,

    /// Where alarm limits are loaded from and saved to
    #[serde(default = "defaults::thresholds_file")]
    pub thresholds_file: PathBuf,
}

/// Event log settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EventConfig {
    #[serde(default = "defaults::channel_capacity")]
    pub channel_capacity: usize,

    /// Minimum change in a target vital before it is reported
    #[serde(default = "defaults::significance")]
    pub significance: BTreeMap<VitalKey, f64>,
}

/// Initial simulation state
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct SimulationConfig {
    /// Fixed seed for reproducible runs; entropy when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(default)]
    pub rhythm: RhythmType,

    #[serde(default)]
    pub initial_vitals: TargetVitals,

    #[serde(default)]
    pub initial_conditions: ConditionSet,
}

mod defaults {
    use super::*;
    use crate::config::constants::{alarm, buffers, events, paths, timing};

    pub fn animation_rate_hz() -> u32 { timing::ANIMATION_RATE_HZ }
    pub fn scenario_interval_ms() -> u64 { timing::SCENARIO_INTERVAL_MS }
    pub fn jitter_interval_ms() -> u64 { timing::JITTER_INTERVAL_MS }
    pub fn alarm_interval_ms() -> u64 { timing::ALARM_INTERVAL_MS }
    pub fn max_frame_dt_ms() -> f64 { timing::MAX_FRAME_DT_MS }

    pub fn channel_length() -> usize { buffers::DEFAULT_CHANNEL_LENGTH }

    pub fn debounce_ms() -> u64 { alarm::DEBOUNCE_MS }
    pub fn snooze_duration_minutes() -> u32 { alarm::DEFAULT_SNOOZE_MINUTES }
    pub fn history_limit() -> usize { alarm::HISTORY_LIMIT }
    pub fn thresholds_file() -> PathBuf { PathBuf::from(paths::THRESHOLDS_FILE) }

    pub fn channel_capacity() -> usize { events::DEFAULT_CHANNEL_CAPACITY }
    pub fn significance() -> BTreeMap<VitalKey, f64> {
        crate::events::SignificanceFilter::default_thresholds()
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            animation_rate_hz: defaults::animation_rate_hz(),
            scenario_interval_ms: defaults::scenario_interval_ms(),
            jitter_interval_ms: defaults::jitter_interval_ms(),
            alarm_interval_ms: defaults::alarm_interval_ms(),
            max_frame_dt_ms: defaults::max_frame_dt_ms(),
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            channel_length: defaults::channel_length(),
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            debounce_ms: defaults::debounce_ms(),
            snooze_duration_minutes: defaults::snooze_duration_minutes(),
            history_limit: defaults::history_limit(),
            tone: ToneSpec::default(),
            thresholds_file: defaults::thresholds_file(),
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: defaults::channel_capacity(),
            significance: defaults::significance(),
        }
    }
}

impl TimingConfig {
    /// Animation frame period in milliseconds
    pub fn frame_interval_ms(&self) -> u64 {
        (1_000 / u64::from(self.animation_rate_hz.max(1))).max(1)
    }
}

impl AlarmConfig {
    pub fn policy(&self) -> AlarmPolicy {
        AlarmPolicy {
            debounce_ms: self.debounce_ms,
            history_limit: self.history_limit,
        }
    }
}

impl SimulationConfig {
    pub fn initial_state(&self) -> ClinicalState {
        ClinicalState {
            vitals: self.initial_vitals,
            conditions: self.initial_conditions.sanitized(),
            rhythm: self.rhythm,
        }
    }
}

impl EngineConfig {
    /// Check cross-field consistency; every problem is reported
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(1..=1_000).contains(&self.timing.animation_rate_hz) {
            errors.push(format!(
                "timing.animation_rate_hz must be between 1 and 1000, got {}",
                self.timing.animation_rate_hz
            ));
        }
        for (name, value) in [
            ("scenario_interval_ms", self.timing.scenario_interval_ms),
            ("jitter_interval_ms", self.timing.jitter_interval_ms),
            ("alarm_interval_ms", self.timing.alarm_interval_ms),
        ] {
            if value == 0 {
                errors.push(format!("timing.{name} must be greater than zero"));
            }
        }
        if !(self.timing.max_frame_dt_ms.is_finite() && self.timing.max_frame_dt_ms > 0.0) {
            errors.push(format!(
                "timing.max_frame_dt_ms must be positive, got {}",
                self.timing.max_frame_dt_ms
            ));
        }

        if !(buffers::MIN_CHANNEL_LENGTH..=buffers::MAX_CHANNEL_LENGTH).contains(&self.buffers.channel_length) {
            errors.push(format!(
                "buffers.channel_length must be between {} and {}, got {}",
                buffers::MIN_CHANNEL_LENGTH,
                buffers::MAX_CHANNEL_LENGTH,
                self.buffers.channel_length
            ));
        }

        if self.alarms.history_limit == 0 {
            errors.push("alarms.history_limit must be greater than zero".to_string());
        }
        let tone = &self.alarms.tone;
        if tone.period_ms == 0 || tone.on_ms > tone.period_ms {
            errors.push(format!(
                "alarms.tone on_ms ({}) must not exceed a non-zero period_ms ({})",
                tone.on_ms, tone.period_ms
            ));
        }
        if !(tone.frequency_hz.is_finite() && tone.frequency_hz > 0.0) {
            errors.push(format!("alarms.tone.frequency_hz must be positive, got {}", tone.frequency_hz));
        }

        if self.events.channel_capacity == 0 {
            errors.push("events.channel_capacity must be greater than zero".to_string());
        }
        for (vital, threshold) in &self.events.significance {
            if !(threshold.is_finite() && *threshold > 0.0) {
                errors.push(format!("events.significance.{vital} must be positive, got {threshold}"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_consistent() {
        let config = EngineConfig::default();
        assert_eq!(config.timing.jitter_interval_ms, timing::JITTER_INTERVAL_MS);
        assert_eq!(config.buffers.channel_length, buffers::DEFAULT_CHANNEL_LENGTH);
        assert!(config.validate_consistency().is_ok());
        assert_eq!(config.timing.frame_interval_ms(), 16);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = EngineConfig::default();
        config.simulation.seed = Some(42);
        config.simulation.rhythm = RhythmType::AtrialFibrillation;

        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
[timing]
alarm_interval_ms = 500

[simulation]
rhythm = "vtach"

[simulation.initial_vitals]
heart_rate = 150
"#,
        )
        .unwrap();

        assert_eq!(config.timing.alarm_interval_ms, 500);
        assert_eq!(config.timing.scenario_interval_ms, timing::SCENARIO_INTERVAL_MS);
        assert_eq!(config.simulation.rhythm, RhythmType::VentricularTachycardia);
        assert_eq!(config.simulation.initial_vitals.heart_rate, 150.0);
        assert_eq!(config.simulation.initial_vitals.spo2, vitals::DEFAULT_SPO2);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        config.buffers.channel_length = 4;
        config.timing.alarm_interval_ms = 0;
        config.alarms.tone.on_ms = 5_000;

        let errors = config.validate_consistency().unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
