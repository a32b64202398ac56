//! Keyframes: timestamped partial overlays of the clinical state
//! Location: src/scenario/keyframe.rs

use serde::{Deserialize, Serialize};

use crate::physiology::{ClinicalState, ConditionPatch, RhythmType, VitalKey, VitalsPatch};

/// A point on a scenario timeline; absent fields inherit the previous value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    #[serde(alias = "time")]
    pub time_seconds: f64,
    #[serde(default)]
    pub vitals: VitalsPatch,
    #[serde(default)]
    pub conditions: ConditionPatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rhythm: Option<RhythmType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Keyframe {
    /// Empty keyframe at a time
    pub fn at(time_seconds: f64) -> Self {
        Self {
            time_seconds,
            vitals: VitalsPatch::default(),
            conditions: ConditionPatch::default(),
            rhythm: None,
            label: None,
        }
    }

    /// Keyframe that pins every field to a captured state
    pub fn capture(time_seconds: f64, state: &ClinicalState) -> Self {
        Self {
            time_seconds,
            vitals: state.vitals.to_patch(),
            conditions: state.conditions.to_patch(),
            rhythm: Some(state.rhythm),
            label: None,
        }
    }

    pub fn vital(mut self, key: VitalKey, value: f64) -> Self {
        self.vitals.set(key, Some(value));
        self
    }

    pub fn conditions(mut self, patch: ConditionPatch) -> Self {
        self.conditions = self.conditions.merged_with(&patch);
        self
    }

    pub fn rhythm(mut self, rhythm: RhythmType) -> Self {
        self.rhythm = Some(rhythm);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Overlay this keyframe onto a state
    pub fn apply_to(&self, state: &mut ClinicalState) {
        state.vitals.apply(&self.vitals);
        state.conditions.apply(&self.conditions);
        if let Some(rhythm) = self.rhythm {
            state.rhythm = rhythm;
        }
    }
}
