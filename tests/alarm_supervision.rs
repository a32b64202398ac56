// tests/alarm_supervision.rs
//! Alarm supervision through the engine with a hand-driven clock

use std::sync::{Arc, Mutex};

use monitor_core::alarm::{AlarmKey, AlarmThreshold, AudioSink, BoundSide, ToneSpec};
use monitor_core::config::{EngineConfig, ThresholdStore, TomlThresholdStore};
use monitor_core::engine::MonitorEngine;
use monitor_core::error::AudioError;
use monitor_core::physiology::{RhythmType, VitalKey};
use monitor_core::simulation::random::SeededRandom;
use monitor_core::utils::time::MockTimeProvider;
use tempfile::tempdir;

const HR_LOW: AlarmKey = AlarmKey::new(VitalKey::HeartRate, BoundSide::Low);

#[derive(Clone, Default)]
struct ToneLog(Arc<Mutex<Vec<bool>>>);

impl AudioSink for ToneLog {
    fn start_tone(&mut self, _spec: &ToneSpec) -> Result<(), AudioError> {
        self.0.lock().unwrap().push(true);
        Ok(())
    }

    fn stop_tone(&mut self) -> Result<(), AudioError> {
        self.0.lock().unwrap().push(false);
        Ok(())
    }
}

fn bradycardic_engine(clock: Arc<MockTimeProvider>) -> MonitorEngine {
    let mut engine = MonitorEngine::new(EngineConfig::default())
        .unwrap()
        .with_random_source(Box::new(SeededRandom::new(9)))
        .with_clock(clock);
    engine.set_vital(VitalKey::HeartRate, 30.0);
    engine.jitter_tick();
    engine
}

fn fired_keys(engine: &mut MonitorEngine) -> Vec<AlarmKey> {
    engine.alarm_tick().into_iter().map(|alarm| alarm.key).collect()
}

#[test]
fn test_debounce_window() {
    let clock = Arc::new(MockTimeProvider::new(0));
    let mut engine = bradycardic_engine(clock.clone());

    assert_eq!(fired_keys(&mut engine), vec![HR_LOW]);
    clock.set_time(2_000);
    assert!(fired_keys(&mut engine).is_empty());
    clock.set_time(4_999);
    assert!(fired_keys(&mut engine).is_empty());
    clock.set_time(5_000);
    assert_eq!(fired_keys(&mut engine), vec![HR_LOW]);
}

#[test]
fn test_snooze_suppresses_until_expiry() {
    let clock = Arc::new(MockTimeProvider::new(0));
    let mut engine = bradycardic_engine(clock.clone());

    fired_keys(&mut engine);
    engine.snooze(HR_LOW, Some(1));
    assert!(!engine.alarms().is_active(HR_LOW));

    clock.set_time(30_000);
    assert!(fired_keys(&mut engine).is_empty());
    clock.set_time(61_000);
    assert_eq!(fired_keys(&mut engine), vec![HR_LOW]);
}

#[test]
fn test_acknowledge_then_refire_after_debounce() {
    let clock = Arc::new(MockTimeProvider::new(0));
    let mut engine = bradycardic_engine(clock.clone());

    fired_keys(&mut engine);
    assert!(engine.acknowledge(HR_LOW));
    assert!(!engine.acknowledge(HR_LOW));

    clock.set_time(1_000);
    assert!(fired_keys(&mut engine).is_empty());
    clock.set_time(6_000);
    assert_eq!(fired_keys(&mut engine), vec![HR_LOW]);
}

#[test]
fn test_unmeasurable_readings_never_alarm() {
    let clock = Arc::new(MockTimeProvider::new(0));
    let mut engine = MonitorEngine::new(EngineConfig::default())
        .unwrap()
        .with_clock(clock)
        .with_random_source(Box::new(SeededRandom::new(3)));
    engine.set_rhythm(RhythmType::Asystole);
    engine.jitter_tick();

    // Rate reads zero and etCO2 decays; pressures and saturation read nothing
    let fired = fired_keys(&mut engine);
    assert!(fired.contains(&HR_LOW));
    assert!(fired.contains(&AlarmKey::new(VitalKey::EtCo2, BoundSide::Low)));
    assert!(fired.iter().all(|key| !matches!(
        key.vital,
        VitalKey::Spo2 | VitalKey::SystolicBp | VitalKey::DiastolicBp
    )));
}

#[test]
fn test_tone_follows_active_set_and_mute() {
    let clock = Arc::new(MockTimeProvider::new(0));
    let log = ToneLog::default();
    let mut engine = bradycardic_engine(clock).with_audio_sink(Box::new(log.clone()));

    fired_keys(&mut engine);
    engine.set_muted(true);
    engine.set_muted(false);
    engine.acknowledge_all();

    assert_eq!(*log.0.lock().unwrap(), vec![true, false, true, false]);
}

#[test]
fn test_recovery_clears_alarm_and_tone() {
    let clock = Arc::new(MockTimeProvider::new(0));
    let log = ToneLog::default();
    let mut engine = bradycardic_engine(clock.clone()).with_audio_sink(Box::new(log.clone()));

    assert_eq!(fired_keys(&mut engine), vec![HR_LOW]);
    assert!(engine.alarms().tone().is_sounding());

    engine.set_vital(VitalKey::HeartRate, 80.0);
    for second in 1..=60 {
        clock.set_time(second * 1_000);
        engine.jitter_tick();
        assert!(fired_keys(&mut engine).is_empty());
    }

    assert!(!engine.alarms().is_active(HR_LOW));
    assert!(!engine.alarms().tone().is_sounding());
    assert_eq!(*log.0.lock().unwrap(), vec![true, false]);
}

#[test]
fn test_persisted_thresholds_change_supervision() {
    let dir = tempdir().unwrap();
    let store = TomlThresholdStore::new(dir.path().join("limits.toml"));

    let mut thresholds = store.load_or_default();
    thresholds.set(VitalKey::HeartRate, AlarmThreshold::new(Some(20.0), Some(140.0)));
    store.save(&thresholds).unwrap();

    let clock = Arc::new(MockTimeProvider::new(0));
    let mut engine = bradycardic_engine(clock).with_thresholds(store.load().unwrap());
    assert!(fired_keys(&mut engine).is_empty());

    engine.set_threshold(VitalKey::HeartRate, AlarmThreshold::new(Some(45.0), None));
    assert_eq!(fired_keys(&mut engine), vec![HR_LOW]);
}
