// src/physiology/rhythm.rs
//! Cardiac rhythm classification and pathology modifiers

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::config::constants::conditions;

/// Cardiac rhythm classification driving the phase clock and the ECG branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RhythmType {
    /// Regular sinus rhythm
    #[default]
    NormalSinus,
    /// Irregularly irregular rhythm without P waves
    AtrialFibrillation,
    /// Fast regular ventricular rhythm
    VentricularTachycardia,
    /// Chaotic ventricular activity with no discrete beats
    VentricularFibrillation,
    /// Flat line
    Asystole,
}

impl RhythmType {
    /// All rhythms in display order
    pub const ALL: [RhythmType; 5] = [
        RhythmType::NormalSinus,
        RhythmType::AtrialFibrillation,
        RhythmType::VentricularTachycardia,
        RhythmType::VentricularFibrillation,
        RhythmType::Asystole,
    ];

    /// Stable wire label
    pub fn label(&self) -> &'static str {
        match self {
            RhythmType::NormalSinus => "normal_sinus",
            RhythmType::AtrialFibrillation => "atrial_fibrillation",
            RhythmType::VentricularTachycardia => "ventricular_tachycardia",
            RhythmType::VentricularFibrillation => "ventricular_fibrillation",
            RhythmType::Asystole => "asystole",
        }
    }

    /// Parse a label; anything unrecognised falls back to normal sinus
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "normal_sinus" | "nsr" | "sinus" => RhythmType::NormalSinus,
            "atrial_fibrillation" | "afib" | "af" => RhythmType::AtrialFibrillation,
            "ventricular_tachycardia" | "vtach" | "vt" => RhythmType::VentricularTachycardia,
            "ventricular_fibrillation" | "vfib" | "vf" => RhythmType::VentricularFibrillation,
            "asystole" => RhythmType::Asystole,
            other => {
                tracing::warn!(rhythm = other, "unknown rhythm label, using normal sinus");
                RhythmType::NormalSinus
            }
        }
    }

    /// Rhythms that produce no cardiac output
    pub fn is_non_perfusing(&self) -> bool {
        matches!(self, RhythmType::VentricularFibrillation | RhythmType::Asystole)
    }

    /// Rhythms drawn without the atrial bump
    pub fn suppresses_p_wave(&self) -> bool {
        matches!(self, RhythmType::AtrialFibrillation | RhythmType::VentricularTachycardia)
    }
}

impl From<String> for RhythmType {
    fn from(value: String) -> Self {
        RhythmType::from_label(&value)
    }
}

impl From<RhythmType> for String {
    fn from(value: RhythmType) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for RhythmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pathology modifiers layered on top of the rhythm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionSet {
    /// Stochastic early beats
    pub ectopic_enabled: bool,
    /// ST-segment elevation (+) or depression (-) in millimetres, within [-3, 3]
    pub st_deviation_mm: f64,
    /// Flip the sign of the T wave
    pub t_wave_inverted: bool,
    /// Broad QRS complexes
    pub qrs_widened: bool,
    /// Baseline noise level, within [0, 10]
    pub noise_level: u8,
}

impl Default for ConditionSet {
    fn default() -> Self {
        Self {
            ectopic_enabled: false,
            st_deviation_mm: 0.0,
            t_wave_inverted: false,
            qrs_widened: false,
            noise_level: 0,
        }
    }
}

impl ConditionSet {
    /// Clamp into range and replace non-finite values with zero
    pub fn sanitized(mut self) -> Self {
        self.st_deviation_mm = sanitize_st(self.st_deviation_mm);
        self.noise_level = self.noise_level.min(conditions::MAX_NOISE_LEVEL);
        self
    }

    /// Overlay a partial update; absent fields keep their value
    pub fn apply(&mut self, patch: &ConditionPatch) {
        if let Some(v) = patch.ectopic_enabled {
            self.ectopic_enabled = v;
        }
        if let Some(v) = patch.st_deviation_mm {
            self.st_deviation_mm = sanitize_st(v);
        }
        if let Some(v) = patch.t_wave_inverted {
            self.t_wave_inverted = v;
        }
        if let Some(v) = patch.qrs_widened {
            self.qrs_widened = v;
        }
        if let Some(v) = patch.noise_level {
            self.noise_level = v.min(conditions::MAX_NOISE_LEVEL);
        }
    }

    /// Express every field as an explicit patch
    pub fn to_patch(&self) -> ConditionPatch {
        ConditionPatch {
            ectopic_enabled: Some(self.ectopic_enabled),
            st_deviation_mm: Some(self.st_deviation_mm),
            t_wave_inverted: Some(self.t_wave_inverted),
            qrs_widened: Some(self.qrs_widened),
            noise_level: Some(self.noise_level),
        }
    }
}

fn sanitize_st(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-conditions::MAX_ST_DEVIATION_MM, conditions::MAX_ST_DEVIATION_MM)
    } else {
        0.0
    }
}

/// Partial condition update used by keyframes and operator input
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ectopic_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub st_deviation_mm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t_wave_inverted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qrs_widened: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "noise_level_from_number"
    )]
    pub noise_level: Option<u8>,
}

/// Authored keyframes may carry a fractional level; round to the nearest step
fn noise_level_from_number<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer)?
        .map(|value| {
            if value.is_finite() {
                Ok(value
                    .round()
                    .clamp(0.0, f64::from(conditions::MAX_NOISE_LEVEL)) as u8)
            } else {
                Err(D::Error::custom("noise level must be a finite number"))
            }
        })
        .transpose()
}

impl ConditionPatch {
    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        *self == ConditionPatch::default()
    }

    /// Later patch wins field by field
    pub fn merged_with(&self, later: &ConditionPatch) -> ConditionPatch {
        ConditionPatch {
            ectopic_enabled: later.ectopic_enabled.or(self.ectopic_enabled),
            st_deviation_mm: later.st_deviation_mm.or(self.st_deviation_mm),
            t_wave_inverted: later.t_wave_inverted.or(self.t_wave_inverted),
            qrs_widened: later.qrs_widened.or(self.qrs_widened),
            noise_level: later.noise_level.or(self.noise_level),
        }
    }
}
