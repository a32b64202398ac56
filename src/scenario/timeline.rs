//! Scenario timelines and keyframe interpolation
//! Location: src/scenario/timeline.rs
//!
//! A timeline is resolved against the clinical state captured when it
//! started: each keyframe inherits every field it does not mention from the
//! keyframes before it, and the first keyframe inherits from the baseline.
//! Only fields that some keyframe mentions are ever written back.

use serde::{Deserialize, Serialize};

use super::keyframe::Keyframe;
use crate::config::constants::{conditions, scenario};
use crate::physiology::vitals::round_to;
use crate::physiology::{ClinicalState, ConditionPatch, RhythmType, VitalsPatch};

/// Named, ordered sequence of keyframes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTimeline {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

/// Values the scenario writes on one evaluation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScenarioWrite {
    pub vitals: VitalsPatch,
    pub conditions: ConditionPatch,
    pub rhythm: Option<RhythmType>,
}

impl ScenarioWrite {
    pub fn is_empty(&self) -> bool {
        self.vitals.is_empty() && self.conditions.is_empty() && self.rhythm.is_none()
    }

    /// Apply onto a live clinical state
    pub fn apply_to(&self, state: &mut ClinicalState) {
        state.vitals.apply(&self.vitals);
        state.conditions.apply(&self.conditions);
        if let Some(rhythm) = self.rhythm {
            state.rhythm = rhythm;
        }
    }
}

/// Result of evaluating a timeline at an elapsed time
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub write: ScenarioWrite,
    /// Index of the last keyframe at or before the elapsed time
    pub current_index: Option<usize>,
    pub progress: f64,
    pub terminal: bool,
}

impl ScenarioTimeline {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        keyframes: Vec<Keyframe>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            keyframes,
        }
    }

    /// Two-keyframe trend from the current state to a target after `duration_seconds`
    pub fn custom_trend(
        id: impl Into<String>,
        now: &ClinicalState,
        target_vitals: VitalsPatch,
        target_conditions: ConditionPatch,
        target_rhythm: Option<RhythmType>,
        duration_seconds: f64,
    ) -> Self {
        let duration = if duration_seconds.is_finite() {
            duration_seconds.max(scenario::TICK_SECONDS)
        } else {
            scenario::TICK_SECONDS
        };
        let mut target = Keyframe::at(duration).label("target");
        target.vitals = target_vitals;
        target.conditions = target_conditions;
        target.rhythm = target_rhythm;

        Self::new(
            id,
            "Custom trend",
            format!("Linear trend over {duration} s"),
            vec![Keyframe::capture(0.0, now).label("now"), target],
        )
    }

    /// Keyframes in ascending time order, non-finite times dropped
    pub fn sorted_keyframes(&self) -> Vec<&Keyframe> {
        let mut sorted: Vec<&Keyframe> = self
            .keyframes
            .iter()
            .filter(|k| k.time_seconds.is_finite())
            .collect();
        sorted.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));
        sorted
    }

    /// Time of the last keyframe
    pub fn duration_seconds(&self) -> f64 {
        self.sorted_keyframes()
            .last()
            .map(|k| k.time_seconds.max(0.0))
            .unwrap_or(0.0)
    }

    /// Resolve keyframes against a baseline
    pub fn resolve(&self, baseline: &ClinicalState) -> ResolvedTimeline {
        let sorted = self.sorted_keyframes();
        let mut frames = Vec::with_capacity(sorted.len());
        let mut touched = ScenarioWrite::default();
        let mut state = *baseline;

        for keyframe in sorted {
            keyframe.apply_to(&mut state);
            touched.vitals = touched.vitals.merged_with(&keyframe.vitals);
            touched.conditions = touched.conditions.merged_with(&keyframe.conditions);
            touched.rhythm = keyframe.rhythm.or(touched.rhythm);
            frames.push(ResolvedFrame {
                time_seconds: keyframe.time_seconds,
                state,
                label: keyframe.label.clone(),
            });
        }

        ResolvedTimeline { frames, touched }
    }
}

/// Keyframe with every field filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFrame {
    pub time_seconds: f64,
    pub state: ClinicalState,
    pub label: Option<String>,
}

/// Fully resolved timeline plus the set of fields it is allowed to write
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTimeline {
    frames: Vec<ResolvedFrame>,
    touched: ScenarioWrite,
}

impl ResolvedTimeline {
    pub fn frames(&self) -> &[ResolvedFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index of the last keyframe at or before `elapsed`
    pub fn current_index(&self, elapsed: f64) -> Option<usize> {
        self.frames
            .iter()
            .rposition(|frame| frame.time_seconds <= elapsed)
    }

    /// Evaluate at an elapsed time. `None` for an empty timeline.
    pub fn evaluate(&self, elapsed: f64) -> Option<Evaluation> {
        let last = self.frames.last()?;
        let current_index = self.current_index(elapsed);

        if elapsed >= last.time_seconds {
            return Some(Evaluation {
                write: self.masked(&last.state),
                current_index,
                progress: 1.0,
                terminal: true,
            });
        }

        let to_index = self
            .frames
            .iter()
            .position(|frame| frame.time_seconds > elapsed)
            .unwrap_or(self.frames.len() - 1);

        // Before the first keyframe there is nothing to interpolate from
        if to_index == 0 {
            return Some(Evaluation {
                write: ScenarioWrite::default(),
                current_index,
                progress: 0.0,
                terminal: false,
            });
        }

        let from = &self.frames[to_index - 1];
        let to = &self.frames[to_index];
        let span = to.time_seconds - from.time_seconds;
        let progress = ((elapsed - from.time_seconds) / span).clamp(0.0, 1.0);

        Some(Evaluation {
            write: self.interpolated(&from.state, &to.state, progress),
            current_index,
            progress,
            terminal: false,
        })
    }

    /// Exact values of one keyframe, restricted to touched fields
    pub fn frame_write(&self, index: usize) -> Option<ScenarioWrite> {
        self.frames.get(index).map(|frame| self.masked(&frame.state))
    }

    fn masked(&self, state: &ClinicalState) -> ScenarioWrite {
        let mut vitals = VitalsPatch::default();
        for key in self.touched.vitals.keys() {
            vitals.set(key, Some(state.vitals.get(key)));
        }
        let full = state.conditions.to_patch();
        let mask = &self.touched.conditions;

        ScenarioWrite {
            vitals,
            conditions: ConditionPatch {
                ectopic_enabled: mask.ectopic_enabled.and(full.ectopic_enabled),
                st_deviation_mm: mask.st_deviation_mm.and(full.st_deviation_mm),
                t_wave_inverted: mask.t_wave_inverted.and(full.t_wave_inverted),
                qrs_widened: mask.qrs_widened.and(full.qrs_widened),
                noise_level: mask.noise_level.and(full.noise_level),
            },
            rhythm: self.touched.rhythm.map(|_| state.rhythm),
        }
    }

    fn interpolated(&self, from: &ClinicalState, to: &ClinicalState, progress: f64) -> ScenarioWrite {
        // Discrete fields hold the from-frame value for the whole span
        let mut write = self.masked(from);

        for key in self.touched.vitals.keys() {
            let value = lerp(from.vitals.get(key), to.vitals.get(key), progress);
            write.vitals.set(key, Some(key.round(value)));
        }

        if write.conditions.st_deviation_mm.is_some() {
            let value = lerp(
                from.conditions.st_deviation_mm,
                to.conditions.st_deviation_mm,
                progress,
            );
            write.conditions.st_deviation_mm = Some(round_to(value, scenario::CONDITION_DECIMALS));
        }

        if write.conditions.noise_level.is_some() {
            let value = lerp(
                f64::from(from.conditions.noise_level),
                f64::from(to.conditions.noise_level),
                progress,
            );
            let max = f64::from(conditions::MAX_NOISE_LEVEL);
            write.conditions.noise_level = Some(value.round().clamp(0.0, max) as u8);
        }

        write
    }
}

fn lerp(start: f64, end: f64, progress: f64) -> f64 {
    start + (end - start) * progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physiology::VitalKey;

    fn hr_ramp() -> ScenarioTimeline {
        ScenarioTimeline::new(
            "ramp",
            "HR ramp",
            "",
            vec![
                Keyframe::at(100.0).vital(VitalKey::HeartRate, 120.0),
                Keyframe::at(0.0).vital(VitalKey::HeartRate, 80.0),
            ],
        )
    }

    #[test]
    fn test_midpoint_and_terminal_snap() {
        let resolved = hr_ramp().resolve(&ClinicalState::default());

        let mid = resolved.evaluate(50.0).unwrap();
        assert_eq!(mid.write.vitals.heart_rate, Some(100.0));
        assert!((mid.progress - 0.5).abs() < 1e-12);
        assert!(!mid.terminal);

        let past = resolved.evaluate(150.0).unwrap();
        assert_eq!(past.write.vitals.heart_rate, Some(120.0));
        assert!(past.terminal);
        assert_eq!(past.current_index, Some(1));
    }

    #[test]
    fn test_unsorted_keyframes_are_sorted_on_access() {
        let timeline = hr_ramp();
        let sorted = timeline.sorted_keyframes();
        assert_eq!(sorted[0].time_seconds, 0.0);
        assert_eq!(sorted[1].time_seconds, 100.0);
        assert_eq!(timeline.duration_seconds(), 100.0);
    }

    #[test]
    fn test_interpolated_values_are_rounded() {
        let resolved = hr_ramp().resolve(&ClinicalState::default());
        let early = resolved.evaluate(1.0).unwrap();
        // 80 + 40 * 0.01 = 80.4
        assert_eq!(early.write.vitals.heart_rate, Some(80.0));
    }

    #[test]
    fn test_interpolated_noise_stays_in_range() {
        let mut baseline = ClinicalState::default();
        baseline.conditions.noise_level = 40;
        let timeline = ScenarioTimeline::new(
            "noise",
            "Noise settles",
            "",
            vec![
                Keyframe::at(0.0),
                Keyframe::at(10.0).conditions(ConditionPatch {
                    noise_level: Some(2),
                    ..ConditionPatch::default()
                }),
            ],
        );
        let write = timeline.resolve(&baseline).evaluate(5.0).unwrap().write;
        assert_eq!(write.conditions.noise_level, Some(conditions::MAX_NOISE_LEVEL));
    }

    #[test]
    fn test_only_touched_fields_are_written() {
        let resolved = hr_ramp().resolve(&ClinicalState::default());
        let write = resolved.evaluate(10.0).unwrap().write;
        assert_eq!(write.vitals.keys().collect::<Vec<_>>(), vec![VitalKey::HeartRate]);
        assert!(write.conditions.is_empty());
        assert_eq!(write.rhythm, None);
    }

    #[test]
    fn test_discrete_fields_switch_at_boundaries() {
        let timeline = ScenarioTimeline::new(
            "af",
            "AF onset",
            "",
            vec![
                Keyframe::at(0.0).rhythm(RhythmType::NormalSinus).conditions(ConditionPatch {
                    qrs_widened: Some(false),
                    st_deviation_mm: Some(0.0),
                    ..Default::default()
                }),
                Keyframe::at(10.0)
                    .rhythm(RhythmType::AtrialFibrillation)
                    .conditions(ConditionPatch {
                        qrs_widened: Some(true),
                        st_deviation_mm: Some(2.0),
                        ..Default::default()
                    }),
            ],
        );
        let resolved = timeline.resolve(&ClinicalState::default());

        let during = resolved.evaluate(9.0).unwrap().write;
        assert_eq!(during.rhythm, Some(RhythmType::NormalSinus));
        assert_eq!(during.conditions.qrs_widened, Some(false));
        assert_eq!(during.conditions.st_deviation_mm, Some(1.8));

        let at = resolved.evaluate(10.0).unwrap().write;
        assert_eq!(at.rhythm, Some(RhythmType::AtrialFibrillation));
        assert_eq!(at.conditions.qrs_widened, Some(true));
        assert_eq!(at.conditions.st_deviation_mm, Some(2.0));
    }

    #[test]
    fn test_missing_fields_carry_forward() {
        let timeline = ScenarioTimeline::new(
            "carry",
            "Carry forward",
            "",
            vec![
                Keyframe::at(0.0).vital(VitalKey::Spo2, 96.0),
                Keyframe::at(10.0).vital(VitalKey::HeartRate, 110.0),
                Keyframe::at(20.0).vital(VitalKey::Spo2, 86.0),
            ],
        );
        let resolved = timeline.resolve(&ClinicalState::default());

        // SpO2 holds at 96 across the first span since keyframe 1 inherits it
        let write = resolved.evaluate(5.0).unwrap().write;
        assert_eq!(write.vitals.spo2, Some(96.0));
        assert_eq!(write.vitals.heart_rate, Some(95.0));

        let write = resolved.evaluate(15.0).unwrap().write;
        assert_eq!(write.vitals.spo2, Some(91.0));
        assert_eq!(write.vitals.heart_rate, Some(110.0));
    }

    #[test]
    fn test_before_first_keyframe_writes_nothing() {
        let timeline = ScenarioTimeline::new(
            "late",
            "Late start",
            "",
            vec![Keyframe::at(30.0).vital(VitalKey::HeartRate, 140.0)],
        );
        let resolved = timeline.resolve(&ClinicalState::default());
        let evaluation = resolved.evaluate(5.0).unwrap();
        assert!(evaluation.write.is_empty());
        assert_eq!(evaluation.current_index, None);
    }

    #[test]
    fn test_empty_timeline_has_no_evaluation() {
        let timeline = ScenarioTimeline::new("empty", "Empty", "", Vec::new());
        assert!(timeline.resolve(&ClinicalState::default()).evaluate(3.0).is_none());
        assert_eq!(timeline.duration_seconds(), 0.0);
    }

    #[test]
    fn test_custom_trend_starts_from_now() {
        let mut now = ClinicalState::default();
        now.vitals.heart_rate = 72.0;
        let timeline = ScenarioTimeline::custom_trend(
            "custom",
            &now,
            VitalsPatch::default().with(VitalKey::HeartRate, 132.0),
            ConditionPatch::default(),
            None,
            60.0,
        );

        assert_eq!(timeline.keyframes.len(), 2);
        let resolved = timeline.resolve(&now);
        assert_eq!(resolved.evaluate(30.0).unwrap().write.vitals.heart_rate, Some(102.0));
        assert_eq!(resolved.evaluate(60.0).unwrap().write.vitals.heart_rate, Some(132.0));
    }
}
