// src/runtime.rs
//! Tokio driver for the four periodic activities
//!
//! Each activity is its own task holding the engine lock for one step.
//! The animation task watches the rhythm epoch and restarts the jitter
//! timer when the rhythm changes; every new displayed snapshot restarts the
//! alarm timer. Starting or stopping a timeline restarts the scenario timer.
//! All tasks are aborted on [`EngineRuntime::shutdown`] or drop.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::TimingConfig;
use crate::engine::SharedEngine;
use crate::utils::time::TimeProvider;

/// The independently cancellable activities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Activity {
    Animation,
    Scenario,
    Jitter,
    Alarm,
}

impl Activity {
    pub const ALL: [Activity; 4] = [
        Activity::Animation,
        Activity::Scenario,
        Activity::Jitter,
        Activity::Alarm,
    ];
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Activity::Animation => "animation",
            Activity::Scenario => "scenario",
            Activity::Jitter => "jitter",
            Activity::Alarm => "alarm",
        };
        f.write_str(name)
    }
}

/// Millisecond clock that follows tokio time, including paused test time
#[derive(Debug, Clone, Copy)]
pub struct TokioTimeProvider {
    origin: Instant,
}

impl TokioTimeProvider {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for TokioTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for TokioTimeProvider {
    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

#[derive(Default)]
struct Signals {
    rhythm_changed: Notify,
    displayed_changed: Notify,
    scenario_changed: Notify,
}

/// Owns the activity tasks for one engine session
pub struct EngineRuntime {
    engine: SharedEngine,
    timing: TimingConfig,
    signals: Arc<Signals>,
    tasks: BTreeMap<Activity, JoinHandle<()>>,
}

impl EngineRuntime {
    /// Must be called inside a tokio runtime
    pub fn new(engine: SharedEngine) -> Self {
        let signals = Arc::new(Signals::default());
        let timing = {
            let mut guard = engine.lock();
            let listener = signals.clone();
            guard.set_scenario_listener(Box::new(move || listener.scenario_changed.notify_one()));
            guard.config().timing.clone()
        };
        Self {
            engine,
            timing,
            signals,
            tasks: BTreeMap::new(),
        }
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Start every activity that is not already running
    pub fn start(&mut self) {
        for activity in Activity::ALL {
            self.start_activity(activity);
        }
        info!("engine runtime started");
    }

    pub fn start_activity(&mut self, activity: Activity) {
        if self.is_running(activity) {
            return;
        }
        let engine = self.engine.clone();
        let signals = self.signals.clone();
        let handle = match activity {
            Activity::Animation => tokio::spawn(animation_loop(
                engine,
                signals,
                Duration::from_millis(self.timing.frame_interval_ms()),
            )),
            Activity::Scenario => tokio::spawn(scenario_loop(
                engine,
                signals,
                Duration::from_millis(self.timing.scenario_interval_ms.max(1)),
            )),
            Activity::Jitter => tokio::spawn(jitter_loop(
                engine,
                signals,
                Duration::from_millis(self.timing.jitter_interval_ms.max(1)),
            )),
            Activity::Alarm => tokio::spawn(alarm_loop(
                engine,
                signals,
                Duration::from_millis(self.timing.alarm_interval_ms.max(1)),
            )),
        };
        debug!(%activity, "activity started");
        self.tasks.insert(activity, handle);
    }

    pub fn stop_activity(&mut self, activity: Activity) {
        if let Some(handle) = self.tasks.remove(&activity) {
            handle.abort();
            debug!(%activity, "activity stopped");
        }
    }

    /// Stop then start, resetting the activity's timer
    pub fn restart_activity(&mut self, activity: Activity) {
        self.stop_activity(activity);
        self.start_activity(activity);
    }

    pub fn is_running(&self, activity: Activity) -> bool {
        self.tasks
            .get(&activity)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Abort every task
    pub fn shutdown(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        for (_, handle) in std::mem::take(&mut self.tasks) {
            handle.abort();
        }
        info!("engine runtime shut down");
    }
}

impl Drop for EngineRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn animation_loop(engine: SharedEngine, signals: Arc<Signals>, frame: Duration) {
    let mut ticker = interval(frame);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();
    let mut seen_rhythm = engine.lock().rhythm_epoch();

    loop {
        ticker.tick().await;
        let now = Instant::now();
        let dt_ms = now.duration_since(last).as_secs_f64() * 1000.0;
        last = now;

        let rhythm_epoch = {
            let mut engine = engine.lock();
            engine.animation_tick(dt_ms);
            engine.rhythm_epoch()
        };
        if rhythm_epoch != seen_rhythm {
            seen_rhythm = rhythm_epoch;
            signals.rhythm_changed.notify_one();
        }
    }
}

async fn scenario_loop(engine: SharedEngine, signals: Arc<Signals>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                engine.lock().scenario_tick();
            }
            _ = signals.scenario_changed.notified() => {
                // First step of a new timeline lands one full period after its start
                ticker.reset();
                debug!("scenario timer restarted after timeline switch");
            }
        }
    }
}

async fn jitter_loop(engine: SharedEngine, signals: Arc<Signals>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = signals.rhythm_changed.notified() => {
                ticker.reset();
                debug!("jitter timer restarted after rhythm change");
            }
        }
        engine.lock().jitter_tick();
        signals.displayed_changed.notify_one();
    }
}

async fn alarm_loop(engine: SharedEngine, signals: Arc<Signals>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = signals.displayed_changed.notified() => {
                ticker.reset();
            }
        }
        engine.lock().alarm_tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::MonitorEngine;
    use crate::physiology::{RhythmType, VitalKey};
    use crate::scenario::{Keyframe, ScenarioTimeline};
    use crate::simulation::random::SeededRandom;

    fn shared(config: EngineConfig) -> SharedEngine {
        MonitorEngine::new(config)
            .unwrap()
            .with_random_source(Box::new(SeededRandom::new(5)))
            .with_clock(Arc::new(TokioTimeProvider::new()))
            .into_shared()
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_activities_run() {
        let engine = shared(EngineConfig::default());
        engine.lock().start_scenario(ScenarioTimeline::new(
            "vt",
            "VT",
            "",
            vec![Keyframe::at(0.0)
                .rhythm(RhythmType::VentricularTachycardia)
                .vital(VitalKey::HeartRate, 160.0)],
        ));

        let mut runtime = EngineRuntime::new(engine.clone());
        runtime.start();
        tokio::time::sleep(Duration::from_millis(4_500)).await;

        let engine = engine.lock();
        assert_eq!(engine.rhythm(), RhythmType::VentricularTachycardia);
        assert_eq!(engine.targets().heart_rate, 160.0);
        assert!(engine.state().cardiac().beat_count() > 5);
        assert!(engine.displayed_epoch() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_activity_is_independent() {
        let engine = shared(EngineConfig::default());
        let mut runtime = EngineRuntime::new(engine.clone());
        runtime.start();
        runtime.stop_activity(Activity::Jitter);
        assert!(!runtime.is_running(Activity::Jitter));
        assert!(runtime.is_running(Activity::Animation));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(engine.lock().displayed_epoch(), 0);
        assert!(engine.lock().state().cardiac().beat_count() > 0);

        runtime.start_activity(Activity::Jitter);
        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert_eq!(engine.lock().displayed_epoch(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rhythm_change_restarts_jitter_immediately() {
        let mut config = EngineConfig::default();
        config.timing.jitter_interval_ms = 60_000;
        let engine = shared(config);
        let mut runtime = EngineRuntime::new(engine.clone());
        runtime.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.lock().displayed().spo2, Some(98.0));

        engine.lock().set_rhythm(RhythmType::Asystole);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let displayed = engine.lock().displayed();
        assert_eq!(displayed.heart_rate, Some(0.0));
        assert_eq!(displayed.spo2, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeline_switch_restarts_scenario_timer() {
        let engine = shared(EngineConfig::default());
        let mut runtime = EngineRuntime::new(engine.clone());
        runtime.start();
        tokio::time::sleep(Duration::from_millis(900)).await;

        engine.lock().start_scenario(ScenarioTimeline::new(
            "vt",
            "VT",
            "",
            vec![Keyframe::at(0.0).vital(VitalKey::HeartRate, 160.0)],
        ));

        // The old grid would have stepped at 1000 ms
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(engine.lock().scenario_run_state().elapsed_seconds, 0.0);
        assert_eq!(engine.lock().targets().heart_rate, 80.0);

        tokio::time::sleep(Duration::from_millis(550)).await;
        assert_eq!(engine.lock().scenario_run_state().elapsed_seconds, 1.0);
        assert_eq!(engine.lock().targets().heart_rate, 160.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_everything() {
        let engine = shared(EngineConfig::default());
        let mut runtime = EngineRuntime::new(engine.clone());
        runtime.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        runtime.shutdown();
        tokio::task::yield_now().await;

        let before = engine.lock().state().cardiac().state();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(engine.lock().state().cardiac().state(), before);
        for activity in Activity::ALL {
            assert!(!runtime.is_running(activity));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_tasks() {
        let engine = shared(EngineConfig::default());
        {
            let mut runtime = EngineRuntime::new(engine.clone());
            runtime.start();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::task::yield_now().await;
        // Only the test's own handle is left once the tasks are gone
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(Arc::strong_count(&engine), 1);
    }
}
