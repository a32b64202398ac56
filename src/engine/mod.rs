// src/engine/mod.rs
//! Monitor engine: owns the simulation state and funnels every mutation
//!
//! The four periodic activities (animation, scenario, jitter, alarm) and all
//! operator input go through [`MonitorEngine`] methods. Hosts that drive the
//! activities from several tasks share the engine as a [`SharedEngine`] and
//! hold the lock for exactly one activity step, so a scenario write is seen by
//! the very next animation tick.

pub mod state;

pub use state::SimulationState;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::acquisition::ChannelSnapshot;
use crate::alarm::{
    AlarmFired, AlarmKey, AlarmSupervisor, AlarmThreshold, AlarmThresholds, AudioSink, ToneController,
};
use crate::config::EngineConfig;
use crate::error::{MonitorResult, ScenarioError};
use crate::events::{EventSink, MonitorEvent, NullEventSink, SignificanceFilter};
use crate::physiology::{
    ClinicalState, ConditionPatch, ConditionSet, DisplayedVitals, RhythmType, TargetVitals, VitalKey,
    VitalsPatch,
};
use crate::scenario::{
    PlaybackState, ScenarioEngine, ScenarioLibrary, ScenarioProgress, ScenarioRunState, ScenarioTimeline,
    ScenarioUpdate,
};
use crate::simulation::random::source_from_seed;
use crate::simulation::{BeatContext, CardiacState, ChannelSample, RandomSource, RespiratoryState, WaveformSynthesizer};
use crate::utils::time::{MonotonicTimeProvider, TimeProvider};

/// Engine handle shared between periodic tasks
pub type SharedEngine = Arc<Mutex<MonitorEngine>>;

/// Called after a timeline starts or stops, with the lock held
pub type ScenarioListener = Box<dyn Fn() + Send>;

pub struct MonitorEngine {
    config: EngineConfig,
    state: SimulationState,
    synthesizer: WaveformSynthesizer,
    scenario: ScenarioEngine,
    alarms: AlarmSupervisor,
    rng: Box<dyn RandomSource>,
    clock: Arc<dyn TimeProvider>,
    events: Box<dyn EventSink>,
    significance: SignificanceFilter,
    rhythm_epoch: u64,
    displayed_epoch: u64,
    scenario_epoch: u64,
    scenario_listener: Option<ScenarioListener>,
    dropped_events: u64,
}

impl MonitorEngine {
    /// Build from configuration with factory alarm limits, no audio and no event sink
    pub fn new(config: EngineConfig) -> MonitorResult<Self> {
        let initial = config.simulation.initial_state();
        let state = SimulationState::new(initial, config.buffers.channel_length)?;

        let mut alarms = AlarmSupervisor::new(
            AlarmThresholds::factory_defaults(),
            config.alarms.policy(),
            ToneController::new(Box::new(crate::alarm::NullAudioSink), config.alarms.tone),
        );
        alarms.set_snooze_duration_minutes(config.alarms.snooze_duration_minutes);

        info!(
            rhythm = %initial.rhythm,
            heart_rate = initial.vitals.heart_rate,
            seeded = config.simulation.seed.is_some(),
            "monitor engine created"
        );

        Ok(Self {
            significance: SignificanceFilter::new(config.events.significance.clone(), &initial.vitals),
            rng: source_from_seed(config.simulation.seed),
            config,
            state,
            synthesizer: WaveformSynthesizer::new(),
            scenario: ScenarioEngine::new(),
            alarms,
            clock: Arc::new(MonotonicTimeProvider::new()),
            events: Box::new(NullEventSink),
            rhythm_epoch: 0,
            displayed_epoch: 0,
            scenario_epoch: 0,
            scenario_listener: None,
            dropped_events: 0,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_random_source(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_event_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    pub fn with_audio_sink(mut self, sink: Box<dyn AudioSink>) -> Self {
        self.alarms.tone_mut().replace_sink(sink);
        self
    }

    pub fn with_thresholds(mut self, thresholds: AlarmThresholds) -> Self {
        self.alarms.replace_thresholds(thresholds);
        self
    }

    /// Replaces any previous listener
    pub fn set_scenario_listener(&mut self, listener: ScenarioListener) {
        self.scenario_listener = Some(listener);
    }

    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    // ---- periodic activities ----

    /// Advance both clocks by `dt_ms`, sample all channels and append to the buffers
    pub fn animation_tick(&mut self, dt_ms: f64) -> ChannelSample {
        let dt = if dt_ms.is_finite() {
            dt_ms.clamp(0.0, self.config.timing.max_frame_dt_ms)
        } else {
            0.0
        };
        let clinical = self.state.clinical;

        self.state.cardiac.tick(
            dt,
            clinical.rhythm,
            clinical.vitals.heart_rate,
            clinical.conditions.ectopic_enabled,
            self.rng.as_mut(),
        );
        self.state.respiratory.tick(dt, clinical.vitals.resp_rate);

        let cardiac = self.state.cardiac.state();
        let beat = BeatContext {
            rhythm: clinical.rhythm,
            conditions: clinical.conditions,
            heart_rate: clinical.vitals.heart_rate,
            ectopic: cardiac.is_next_beat_ectopic,
        };
        let sample = self.synthesizer.sample(
            cardiac.phase,
            self.state.respiratory.state().phase,
            &beat,
            self.rng.as_mut(),
        );
        self.state.channels.push(sample);
        sample
    }

    /// One scenario scheduler tick; true when something was written
    pub fn scenario_tick(&mut self) -> bool {
        match self.scenario.tick() {
            Some(update) => {
                self.apply_scenario_update(update);
                true
            }
            None => false,
        }
    }

    /// Recompute the displayed vitals
    pub fn jitter_tick(&mut self) -> DisplayedVitals {
        let clinical = self.state.clinical;
        let displayed = self
            .state
            .jitter
            .tick(&clinical.vitals, clinical.rhythm, self.rng.as_mut());
        self.displayed_epoch += 1;
        displayed
    }

    /// Evaluate the displayed vitals against the alarm limits
    pub fn alarm_tick(&mut self) -> Vec<AlarmFired> {
        let now = self.clock.now_millis();
        let displayed = self.state.jitter.displayed();
        let fired = self.alarms.evaluate(&displayed, now);
        for alarm in &fired {
            self.emit(MonitorEvent::AlarmFired {
                key: alarm.key,
                value: alarm.value,
                at_ms: now,
            });
        }
        fired
    }

    // ---- operator: physiology ----

    pub fn set_rhythm(&mut self, rhythm: RhythmType) {
        let previous = self.state.clinical.rhythm;
        self.state.clinical.rhythm = rhythm;
        self.after_rhythm_write(previous);
    }

    /// Set a rhythm from a free-form label; unknown labels become normal sinus
    pub fn set_rhythm_label(&mut self, label: &str) {
        self.set_rhythm(RhythmType::from_label(label));
    }

    pub fn set_vital(&mut self, vital: VitalKey, value: f64) {
        self.state.clinical.vitals.set(vital, value);
        self.after_vitals_write();
    }

    pub fn apply_vitals(&mut self, patch: &VitalsPatch) {
        self.state.clinical.vitals.apply(patch);
        self.after_vitals_write();
    }

    pub fn apply_conditions(&mut self, patch: &ConditionPatch) {
        self.state.clinical.conditions.apply(patch);
        debug!(conditions = ?self.state.clinical.conditions, "conditions updated");
    }

    pub fn set_conditions(&mut self, conditions: ConditionSet) {
        self.state.clinical.conditions = conditions.sanitized();
        debug!(conditions = ?self.state.clinical.conditions, "conditions replaced");
    }

    // ---- operator: alarms ----

    pub fn set_threshold(&mut self, vital: VitalKey, threshold: AlarmThreshold) {
        self.alarms.set_threshold(vital, threshold);
    }

    pub fn acknowledge(&mut self, key: AlarmKey) -> bool {
        self.alarms.acknowledge(key)
    }

    pub fn acknowledge_all(&mut self) {
        self.alarms.acknowledge_all();
    }

    /// Snooze one alarm; `None` uses the configured snooze duration
    pub fn snooze(&mut self, key: AlarmKey, duration_minutes: Option<u32>) {
        let now = self.clock.now_millis();
        self.alarms.snooze(key, duration_minutes, now);
    }

    pub fn snooze_all(&mut self, duration_minutes: Option<u32>) {
        let now = self.clock.now_millis();
        self.alarms.snooze_all(duration_minutes, now);
    }

    pub fn set_snooze_duration_minutes(&mut self, minutes: u32) {
        self.alarms.set_snooze_duration_minutes(minutes);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.alarms.set_muted(muted);
    }

    // ---- operator: scenario ----

    /// Begin a timeline from the current clinical state
    pub fn start_scenario(&mut self, timeline: ScenarioTimeline) {
        self.scenario.start(timeline, self.state.clinical);
        self.after_scenario_switch();
    }

    pub fn start_library_scenario(&mut self, library: &ScenarioLibrary, id: &str) -> Result<(), ScenarioError> {
        let timeline = library.get(id)?.clone();
        self.start_scenario(timeline);
        Ok(())
    }

    /// Linear trend from "now" to the given targets over `duration_seconds`
    pub fn start_custom_trend(
        &mut self,
        vitals: VitalsPatch,
        conditions: ConditionPatch,
        rhythm: Option<RhythmType>,
        duration_seconds: f64,
    ) {
        let timeline = ScenarioTimeline::custom_trend(
            "custom_trend",
            &self.state.clinical,
            vitals,
            conditions,
            rhythm,
            duration_seconds,
        );
        self.start_scenario(timeline);
    }

    pub fn toggle_scenario_pause(&mut self) -> PlaybackState {
        self.scenario.toggle_pause()
    }

    pub fn stop_scenario(&mut self) {
        self.scenario.stop();
        self.after_scenario_switch();
    }

    pub fn seek_scenario(&mut self, seconds: f64) -> Result<(), ScenarioError> {
        if let Some(update) = self.scenario.seek(seconds)? {
            self.apply_scenario_update(update);
        }
        Ok(())
    }

    pub fn jump_to_keyframe(&mut self, index: usize) -> Result<(), ScenarioError> {
        let update = self.scenario.jump_to_keyframe(index)?;
        self.apply_scenario_update(update);
        Ok(())
    }

    pub fn step_forward(&mut self) -> Result<(), ScenarioError> {
        let update = self.scenario.step_forward()?;
        self.apply_scenario_update(update);
        Ok(())
    }

    pub fn step_backward(&mut self) -> Result<(), ScenarioError> {
        let update = self.scenario.step_backward()?;
        self.apply_scenario_update(update);
        Ok(())
    }

    // ---- read side ----

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn clinical(&self) -> ClinicalState {
        self.state.clinical
    }

    pub fn targets(&self) -> TargetVitals {
        self.state.clinical.vitals
    }

    pub fn rhythm(&self) -> RhythmType {
        self.state.clinical.rhythm
    }

    pub fn conditions(&self) -> ConditionSet {
        self.state.clinical.conditions
    }

    pub fn cardiac_state(&self) -> CardiacState {
        self.state.cardiac.state()
    }

    pub fn respiratory_state(&self) -> RespiratoryState {
        self.state.respiratory.state()
    }

    pub fn displayed(&self) -> DisplayedVitals {
        self.state.jitter.displayed()
    }

    /// Render sink view: fixed-length arrays, most recent sample last
    pub fn channel_snapshot(&self) -> ChannelSnapshot {
        self.state.channels.snapshot()
    }

    pub fn alarms(&self) -> &AlarmSupervisor {
        &self.alarms
    }

    pub fn scenario_state(&self) -> PlaybackState {
        self.scenario.state()
    }

    pub fn scenario_run_state(&self) -> ScenarioRunState {
        self.scenario.run_state()
    }

    pub fn scenario_progress(&self) -> Option<ScenarioProgress> {
        self.scenario.progress()
    }

    /// Bumped whenever the rhythm classification changes
    pub fn rhythm_epoch(&self) -> u64 {
        self.rhythm_epoch
    }

    /// Bumped whenever a timeline is started or stopped
    pub fn scenario_epoch(&self) -> u64 {
        self.scenario_epoch
    }

    /// Bumped whenever a new displayed snapshot is produced
    pub fn displayed_epoch(&self) -> u64 {
        self.displayed_epoch
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    // ---- internals ----

    fn apply_scenario_update(&mut self, update: ScenarioUpdate) {
        let previous_rhythm = self.state.clinical.rhythm;
        update.write.apply_to(&mut self.state.clinical);

        if let Some(step) = update.step {
            info!(
                timeline = %step.timeline_id,
                index = step.index,
                label = step.label.as_deref().unwrap_or(""),
                "scenario step applied"
            );
            let at_ms = self.clock.now_millis();
            self.emit(MonitorEvent::ScenarioStepApplied {
                timeline_id: step.timeline_id,
                index: step.index,
                label: step.label,
                at_ms,
            });
        }

        self.after_rhythm_write(previous_rhythm);
        self.after_vitals_write();
    }

    fn after_scenario_switch(&mut self) {
        self.scenario_epoch += 1;
        if let Some(listener) = &self.scenario_listener {
            listener();
        }
    }

    fn after_rhythm_write(&mut self, previous: RhythmType) {
        let current = self.state.clinical.rhythm;
        if current == previous {
            return;
        }
        self.rhythm_epoch += 1;
        info!(from = %previous, to = %current, "rhythm changed");
        let at_ms = self.clock.now_millis();
        self.emit(MonitorEvent::RhythmChanged {
            previous,
            current,
            at_ms,
        });
    }

    fn after_vitals_write(&mut self) {
        let changes = self.significance.significant_changes(&self.state.clinical.vitals);
        if changes.is_empty() {
            return;
        }
        let at_ms = self.clock.now_millis();
        for (vital, previous, current) in changes {
            self.emit(MonitorEvent::VitalChanged {
                vital,
                previous,
                current,
                at_ms,
            });
        }
    }

    /// Best-effort publish; failures are counted and logged, never propagated
    fn emit(&mut self, event: MonitorEvent) {
        if let Err(err) = self.events.publish(event) {
            self.dropped_events += 1;
            if self.dropped_events == 1 {
                warn!(error = %err, "event sink rejected an event; further drops are logged at debug level");
            } else {
                debug!(error = %err, dropped = self.dropped_events, "event dropped");
            }
        }
    }
}

impl std::fmt::Debug for MonitorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorEngine")
            .field("clinical", &self.state.clinical)
            .field("cardiac", &self.state.cardiac.state())
            .field("scenario", &self.scenario.run_state())
            .field("alarms", &self.alarms)
            .finish()
    }
}
