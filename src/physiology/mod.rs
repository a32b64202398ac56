// src/physiology/mod.rs
//! Rhythm, condition and vital-sign data model

pub mod rhythm;
pub mod vitals;

pub use rhythm::{ConditionPatch, ConditionSet, RhythmType};
pub use vitals::{DisplayedVitals, TargetVitals, VitalKey, VitalsPatch};

use serde::{Deserialize, Serialize};

/// Everything an operator or scenario can set, captured together
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClinicalState {
    pub vitals: TargetVitals,
    pub conditions: ConditionSet,
    pub rhythm: RhythmType,
}
