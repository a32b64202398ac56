// tests/config_integration.rs
//! Configuration files and environment overrides feeding engine construction

use std::io::Write;

use monitor_core::config::ConfigLoader;
use monitor_core::engine::MonitorEngine;
use monitor_core::error::{ConfigError, MonitorError};
use monitor_core::physiology::RhythmType;
use monitor_core::EngineConfig;
use serial_test::serial;
use tempfile::NamedTempFile;

const ISOLATED_PREFIX: &str = "MONITOR_ITEST_UNUSED_";

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{contents}").unwrap();
    file
}

#[test]
#[serial]
fn test_file_sets_initial_state_and_buffers() {
    let file = config_file(
        r#"
[buffers]
channel_length = 300

[simulation]
seed = 11
rhythm = "afib"

[simulation.initial_vitals]
heart_rate = 118
spo2 = 94

[simulation.initial_conditions]
st_deviation_mm = -1.5
noise_level = 3
"#,
    );

    let config = ConfigLoader::with_paths(vec![file.path().into()])
        .with_env_prefix(ISOLATED_PREFIX)
        .load()
        .unwrap();
    let engine = MonitorEngine::new(config).unwrap();

    assert_eq!(engine.rhythm(), RhythmType::AtrialFibrillation);
    assert_eq!(engine.targets().heart_rate, 118.0);
    assert_eq!(engine.targets().spo2, 94.0);
    assert_eq!(engine.conditions().st_deviation_mm, -1.5);
    assert_eq!(engine.conditions().noise_level, 3);
    assert_eq!(engine.channel_snapshot().electrical.len(), 300);
}

#[test]
#[serial]
fn test_seeded_engines_are_reproducible() {
    let file = config_file("[simulation]\nseed = 2024\nrhythm = \"afib\"");
    let load = || {
        ConfigLoader::with_paths(vec![file.path().into()])
            .with_env_prefix(ISOLATED_PREFIX)
            .load()
            .unwrap()
    };

    let mut first = MonitorEngine::new(load()).unwrap();
    let mut second = MonitorEngine::new(load()).unwrap();
    for _ in 0..240 {
        first.animation_tick(1000.0 / 60.0);
        second.animation_tick(1000.0 / 60.0);
    }
    assert_eq!(first.channel_snapshot(), second.channel_snapshot());
    assert_eq!(first.jitter_tick(), second.jitter_tick());
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let file = config_file("[alarms]\ndebounce_ms = 8000\nsnooze_duration_minutes = 5");
    unsafe {
        std::env::set_var("MONITOR_ALARMS_DEBOUNCE_MS", "3000");
    }

    let config = ConfigLoader::with_paths(vec![file.path().into()]).load().unwrap();

    unsafe {
        std::env::remove_var("MONITOR_ALARMS_DEBOUNCE_MS");
    }
    assert_eq!(config.alarms.debounce_ms, 3000);
    assert_eq!(config.alarms.snooze_duration_minutes, 5);

    let engine = MonitorEngine::new(config).unwrap();
    assert_eq!(engine.alarms().snooze_duration_minutes(), 5);
}

#[test]
#[serial]
fn test_inconsistent_timing_is_rejected() {
    let file = config_file("[timing]\nanimation_rate_hz = 0");
    let result = ConfigLoader::with_paths(vec![file.path().into()])
        .with_env_prefix(ISOLATED_PREFIX)
        .load();
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn test_engine_rejects_bad_buffer_length() {
    let mut config = EngineConfig::default();
    config.buffers.channel_length = 0;
    assert!(matches!(MonitorEngine::new(config), Err(MonitorError::Buffer(_))));
}
