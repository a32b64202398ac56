//! Monitor-Core: physiological signal synthesis and alarm supervision for a patient monitor
//!
//! This library drives a simulated bedside monitor. It features:
//!
//! - Cardiac and respiratory phase clocks with rhythm-dependent beat timing
//! - Waveform synthesis for the electrical, plethysmographic and respiratory channels
//! - Keyframed clinical scenarios with linear interpolation and playback control
//! - Display jitter that derives on-screen readings from target vitals
//! - Threshold alarms with debounce, acknowledge, snooze and an audible tone
//! - Layered TOML configuration with environment overrides
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use monitor_core::config::EngineConfig;
//! use monitor_core::engine::MonitorEngine;
//! use monitor_core::scenario::ScenarioLibrary;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = MonitorEngine::new(EngineConfig::default())?;
//!     engine.start_library_scenario(&ScenarioLibrary::built_in(), "vt_arrest")?;
//!
//!     for frame in 0..600 {
//!         engine.animation_tick(1000.0 / 60.0);
//!         if frame % 60 == 0 {
//!             engine.scenario_tick();
//!             engine.jitter_tick();
//!             for alarm in engine.alarm_tick() {
//!                 println!("alarm: {} = {}", alarm.key, alarm.value);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod alarm;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod physiology;
#[cfg(feature = "runtime")]
pub mod runtime;
pub mod scenario;
pub mod simulation;
pub mod utils;

// Re-export commonly used types for convenience
pub use alarm::{AlarmKey, AlarmThreshold, AlarmThresholds, AlarmSupervisor};
pub use config::{ConfigLoader, EngineConfig};
pub use engine::{MonitorEngine, SharedEngine};
pub use error::{MonitorError, MonitorResult};
pub use events::{EventSink, MonitorEvent};
pub use physiology::{ClinicalState, ConditionSet, DisplayedVitals, RhythmType, TargetVitals, VitalKey};
#[cfg(feature = "runtime")]
pub use runtime::{Activity, EngineRuntime};
pub use scenario::{Keyframe, ScenarioLibrary, ScenarioTimeline};
pub use utils::time::TimeProvider;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    let mut features = vec![
        "Cardiac and respiratory phase clocks".to_string(),
        "Three-channel waveform synthesis".to_string(),
        "Keyframed clinical scenarios".to_string(),
        "Threshold alarm supervision".to_string(),
    ];
    if cfg!(feature = "runtime") {
        features.push("Tokio activity runtime".to_string());
    }
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Patient monitor signal synthesis and alarm supervision engine".to_string(),
        features,
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let info = version_info();
        assert_eq!(info.name, NAME);
        assert_eq!(info.version, VERSION);
        assert!(info.features.len() >= 4);
    }

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "monitor-core");
    }
}
