//! Scenario playback state machine
//! Location: src/scenario/engine.rs

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::timeline::{ResolvedTimeline, ScenarioTimeline, ScenarioWrite};
use crate::config::constants::scenario;
use crate::error::ScenarioError;
use crate::physiology::ClinicalState;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Running,
    Paused,
}

/// Externally visible run state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRunState {
    pub active_timeline_id: Option<String>,
    pub elapsed_seconds: f64,
    pub is_playing: bool,
}

/// A keyframe boundary reached during playback
#[derive(Debug, Clone, PartialEq)]
pub struct StepApplied {
    pub timeline_id: String,
    pub index: usize,
    pub time_seconds: f64,
    pub label: Option<String>,
}

/// What one scenario evaluation wants written into the simulation
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioUpdate {
    pub write: ScenarioWrite,
    pub step: Option<StepApplied>,
}

/// Progress snapshot for an instructor view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioProgress {
    pub timeline_id: String,
    pub name: String,
    pub state: PlaybackState,
    pub elapsed_seconds: f64,
    pub duration_seconds: f64,
    /// Elapsed over duration, within [0, 1]
    pub fraction: f64,
    pub current_index: Option<usize>,
    pub keyframe_count: usize,
    pub next_label: Option<String>,
}

/// Walks a timeline one tick at a time
#[derive(Debug, Clone, Default)]
pub struct ScenarioEngine {
    state: PlaybackState,
    timeline: Option<ScenarioTimeline>,
    baseline: ClinicalState,
    elapsed_seconds: f64,
    last_index: Option<usize>,
}

impl ScenarioEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn timeline(&self) -> Option<&ScenarioTimeline> {
        self.timeline.as_ref()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn run_state(&self) -> ScenarioRunState {
        ScenarioRunState {
            active_timeline_id: self.timeline.as_ref().map(|t| t.id.clone()),
            elapsed_seconds: self.elapsed_seconds,
            is_playing: self.state == PlaybackState::Running,
        }
    }

    /// Load a timeline and begin playback from zero.
    ///
    /// `baseline` is the clinical state at the moment of selection; fields
    /// the first keyframe leaves out start from these values.
    pub fn start(&mut self, timeline: ScenarioTimeline, baseline: ClinicalState) {
        info!(
            id = %timeline.id,
            keyframes = timeline.keyframes.len(),
            duration_s = timeline.duration_seconds(),
            "scenario started"
        );
        self.timeline = Some(timeline);
        self.baseline = baseline;
        self.elapsed_seconds = 0.0;
        self.last_index = None;
        self.state = PlaybackState::Running;
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Running {
            self.state = PlaybackState::Paused;
            info!(elapsed_s = self.elapsed_seconds, "scenario paused");
        }
    }

    pub fn resume(&mut self) {
        if self.state == PlaybackState::Paused {
            self.state = PlaybackState::Running;
            info!(elapsed_s = self.elapsed_seconds, "scenario resumed");
        }
    }

    /// Running and Paused swap; Idle stays Idle
    pub fn toggle_pause(&mut self) -> PlaybackState {
        match self.state {
            PlaybackState::Running => self.pause(),
            PlaybackState::Paused => self.resume(),
            PlaybackState::Idle => {}
        }
        self.state
    }

    /// Return to Idle and unload the timeline
    pub fn stop(&mut self) {
        if let Some(timeline) = self.timeline.take() {
            info!(id = %timeline.id, elapsed_s = self.elapsed_seconds, "scenario stopped");
        }
        self.state = PlaybackState::Idle;
        self.elapsed_seconds = 0.0;
        self.last_index = None;
    }

    /// Advance one scheduler tick. `None` while not running or when the
    /// timeline has no keyframes.
    pub fn tick(&mut self) -> Option<ScenarioUpdate> {
        if self.state != PlaybackState::Running {
            return None;
        }
        self.elapsed_seconds += scenario::TICK_SECONDS;
        self.evaluate()
    }

    /// Move the clock to an arbitrary time and evaluate there
    pub fn seek(&mut self, seconds: f64) -> Result<Option<ScenarioUpdate>, ScenarioError> {
        if self.timeline.is_none() {
            return Err(ScenarioError::NoActiveScenario);
        }
        self.elapsed_seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        debug!(elapsed_s = self.elapsed_seconds, "scenario seek");
        Ok(self.evaluate())
    }

    /// Set the clock to a keyframe's time and apply its values exactly
    pub fn jump_to_keyframe(&mut self, index: usize) -> Result<ScenarioUpdate, ScenarioError> {
        let (resolved, timeline_id) = self.resolved()?;
        let frame = resolved
            .frames()
            .get(index)
            .ok_or(ScenarioError::KeyframeOutOfRange {
                index,
                len: resolved.frames().len(),
            })?;
        let write = resolved.frame_write(index).unwrap_or_default();

        self.elapsed_seconds = frame.time_seconds.max(0.0);
        self.last_index = Some(index);
        info!(id = %timeline_id, index, time_s = frame.time_seconds, "jumped to keyframe");

        Ok(ScenarioUpdate {
            write,
            step: Some(StepApplied {
                timeline_id,
                index,
                time_seconds: frame.time_seconds,
                label: frame.label.clone(),
            }),
        })
    }

    /// Jump to the keyframe after the last one reached
    pub fn step_forward(&mut self) -> Result<ScenarioUpdate, ScenarioError> {
        if self.timeline.is_none() {
            return Err(ScenarioError::NoActiveScenario);
        }
        let next = self.last_index.map_or(0, |index| index + 1);
        self.jump_to_keyframe(next)
    }

    /// Jump to the keyframe before the last one reached
    pub fn step_backward(&mut self) -> Result<ScenarioUpdate, ScenarioError> {
        if self.timeline.is_none() {
            return Err(ScenarioError::NoActiveScenario);
        }
        let previous = self.last_index.map_or(0, |index| index.saturating_sub(1));
        self.jump_to_keyframe(previous)
    }

    pub fn progress(&self) -> Option<ScenarioProgress> {
        let timeline = self.timeline.as_ref()?;
        let resolved = timeline.resolve(&self.baseline);
        let frames = resolved.frames();
        let duration = timeline.duration_seconds();
        let current_index = resolved.current_index(self.elapsed_seconds);
        let next_index = current_index.map_or(0, |index| index + 1);
        let fraction = if duration > 0.0 {
            (self.elapsed_seconds / duration).clamp(0.0, 1.0)
        } else {
            1.0
        };

        Some(ScenarioProgress {
            timeline_id: timeline.id.clone(),
            name: timeline.name.clone(),
            state: self.state,
            elapsed_seconds: self.elapsed_seconds,
            duration_seconds: duration,
            fraction,
            current_index,
            keyframe_count: frames.len(),
            next_label: frames.get(next_index).and_then(|f| f.label.clone()),
        })
    }

    fn resolved(&self) -> Result<(ResolvedTimeline, String), ScenarioError> {
        let timeline = self.timeline.as_ref().ok_or(ScenarioError::NoActiveScenario)?;
        Ok((timeline.resolve(&self.baseline), timeline.id.clone()))
    }

    fn evaluate(&mut self) -> Option<ScenarioUpdate> {
        let timeline = self.timeline.as_ref()?;
        let resolved = timeline.resolve(&self.baseline);
        let evaluation = resolved.evaluate(self.elapsed_seconds)?;

        let step = match evaluation.current_index {
            Some(index) if evaluation.current_index != self.last_index => {
                let frame = &resolved.frames()[index];
                debug!(id = %timeline.id, index, label = ?frame.label, "scenario step reached");
                Some(StepApplied {
                    timeline_id: timeline.id.clone(),
                    index,
                    time_seconds: frame.time_seconds,
                    label: frame.label.clone(),
                })
            }
            _ => None,
        };
        self.last_index = evaluation.current_index;

        Some(ScenarioUpdate {
            write: evaluation.write,
            step,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physiology::{RhythmType, VitalKey};
    use crate::scenario::Keyframe;

    fn ramp() -> ScenarioTimeline {
        ScenarioTimeline::new(
            "ramp",
            "Ramp",
            "",
            vec![
                Keyframe::at(0.0).vital(VitalKey::HeartRate, 80.0).label("start"),
                Keyframe::at(100.0).vital(VitalKey::HeartRate, 120.0).label("end"),
            ],
        )
    }

    #[test]
    fn test_state_transitions() {
        let mut engine = ScenarioEngine::new();
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert_eq!(engine.toggle_pause(), PlaybackState::Idle);

        engine.start(ramp(), ClinicalState::default());
        assert_eq!(engine.state(), PlaybackState::Running);
        assert_eq!(engine.toggle_pause(), PlaybackState::Paused);
        assert_eq!(engine.toggle_pause(), PlaybackState::Running);

        engine.tick();
        engine.tick();
        assert_eq!(engine.elapsed_seconds(), 2.0);

        engine.stop();
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert_eq!(
            engine.run_state(),
            ScenarioRunState {
                active_timeline_id: None,
                elapsed_seconds: 0.0,
                is_playing: false,
            }
        );
    }

    #[test]
    fn test_paused_engine_does_not_advance() {
        let mut engine = ScenarioEngine::new();
        engine.start(ramp(), ClinicalState::default());
        engine.tick();
        engine.pause();
        assert!(engine.tick().is_none());
        assert_eq!(engine.elapsed_seconds(), 1.0);
        assert!(!engine.run_state().is_playing);
    }

    #[test]
    fn test_ticks_interpolate_and_report_steps() {
        let mut engine = ScenarioEngine::new();
        engine.start(ramp(), ClinicalState::default());

        let first = engine.tick().unwrap();
        assert_eq!(first.step.as_ref().map(|s| s.index), Some(0));

        let mut last = first;
        for _ in 1..50 {
            last = engine.tick().unwrap();
            assert!(last.step.is_none());
        }
        assert_eq!(last.write.vitals.heart_rate, Some(100.0));

        for _ in 50..100 {
            last = engine.tick().unwrap();
        }
        let step = last.step.expect("terminal keyframe reached");
        assert_eq!(step.index, 1);
        assert_eq!(step.label.as_deref(), Some("end"));
        assert_eq!(last.write.vitals.heart_rate, Some(120.0));
    }

    #[test]
    fn test_seek_and_jump() {
        let mut engine = ScenarioEngine::new();
        assert!(matches!(engine.seek(5.0), Err(ScenarioError::NoActiveScenario)));

        engine.start(ramp(), ClinicalState::default());
        let update = engine.seek(150.0).unwrap().unwrap();
        assert_eq!(update.write.vitals.heart_rate, Some(120.0));

        let update = engine.jump_to_keyframe(0).unwrap();
        assert_eq!(engine.elapsed_seconds(), 0.0);
        assert_eq!(update.write.vitals.heart_rate, Some(80.0));

        assert!(matches!(
            engine.jump_to_keyframe(2),
            Err(ScenarioError::KeyframeOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_step_forward_and_backward() {
        let mut engine = ScenarioEngine::new();
        engine.start(ramp(), ClinicalState::default());
        engine.seek(40.0).unwrap();

        let forward = engine.step_forward().unwrap();
        assert_eq!(forward.step.unwrap().index, 1);
        assert_eq!(engine.elapsed_seconds(), 100.0);
        assert!(engine.step_forward().is_err());

        let back = engine.step_backward().unwrap();
        assert_eq!(back.step.unwrap().index, 0);
        assert_eq!(engine.elapsed_seconds(), 0.0);
    }

    #[test]
    fn test_empty_timeline_only_advances_time() {
        let mut engine = ScenarioEngine::new();
        engine.start(
            ScenarioTimeline::new("empty", "Empty", "", Vec::new()),
            ClinicalState::default(),
        );
        assert!(engine.tick().is_none());
        assert!(engine.tick().is_none());
        assert_eq!(engine.elapsed_seconds(), 2.0);
        assert!(engine.step_forward().is_err());
    }

    #[test]
    fn test_progress_snapshot() {
        let mut engine = ScenarioEngine::new();
        assert!(engine.progress().is_none());

        engine.start(ramp(), ClinicalState::default());
        engine.seek(25.0).unwrap();
        let progress = engine.progress().unwrap();
        assert_eq!(progress.current_index, Some(0));
        assert_eq!(progress.keyframe_count, 2);
        assert_eq!(progress.next_label.as_deref(), Some("end"));
        assert!((progress.fraction - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_rhythm_switch_from_template() {
        let mut engine = ScenarioEngine::new();
        engine.start(
            ScenarioTimeline::new(
                "vt",
                "VT",
                "",
                vec![Keyframe::at(0.0)
                    .rhythm(RhythmType::VentricularTachycardia)
                    .vital(VitalKey::HeartRate, 160.0)],
            ),
            ClinicalState::default(),
        );

        let update = engine.tick().unwrap();
        assert_eq!(update.write.rhythm, Some(RhythmType::VentricularTachycardia));
        assert_eq!(update.write.vitals.heart_rate, Some(160.0));
    }
}
