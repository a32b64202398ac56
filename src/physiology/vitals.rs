// src/physiology/vitals.rs
//! Target and displayed vital signs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::constants::{scenario, vitals};

/// Identity of a single vital sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalKey {
    HeartRate,
    Spo2,
    RespRate,
    SystolicBp,
    DiastolicBp,
    Temperature,
    EtCo2,
}

impl VitalKey {
    /// All vitals in display order
    pub const ALL: [VitalKey; 7] = [
        VitalKey::HeartRate,
        VitalKey::Spo2,
        VitalKey::RespRate,
        VitalKey::SystolicBp,
        VitalKey::DiastolicBp,
        VitalKey::Temperature,
        VitalKey::EtCo2,
    ];

    /// Stable short label
    pub fn label(&self) -> &'static str {
        match self {
            VitalKey::HeartRate => "heart_rate",
            VitalKey::Spo2 => "spo2",
            VitalKey::RespRate => "resp_rate",
            VitalKey::SystolicBp => "systolic_bp",
            VitalKey::DiastolicBp => "diastolic_bp",
            VitalKey::Temperature => "temperature",
            VitalKey::EtCo2 => "etco2",
        }
    }

    /// Round a value to the precision this vital is displayed with
    pub fn round(&self, value: f64) -> f64 {
        match self {
            VitalKey::Temperature => round_to(value, scenario::TEMPERATURE_DECIMALS),
            _ => value.round(),
        }
    }
}

impl fmt::Display for VitalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Round to a number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Ground-truth vitals the physics treats as settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetVitals {
    pub heart_rate: f64,
    pub spo2: f64,
    pub resp_rate: f64,
    pub systolic_bp: f64,
    pub diastolic_bp: f64,
    pub temperature: f64,
    pub etco2: f64,
}

impl Default for TargetVitals {
    fn default() -> Self {
        Self {
            heart_rate: vitals::DEFAULT_HEART_RATE,
            spo2: vitals::DEFAULT_SPO2,
            resp_rate: vitals::DEFAULT_RESP_RATE,
            systolic_bp: vitals::DEFAULT_SYSTOLIC_BP,
            diastolic_bp: vitals::DEFAULT_DIASTOLIC_BP,
            temperature: vitals::DEFAULT_TEMPERATURE_C,
            etco2: vitals::DEFAULT_ETCO2,
        }
    }
}

impl TargetVitals {
    pub fn get(&self, key: VitalKey) -> f64 {
        match key {
            VitalKey::HeartRate => self.heart_rate,
            VitalKey::Spo2 => self.spo2,
            VitalKey::RespRate => self.resp_rate,
            VitalKey::SystolicBp => self.systolic_bp,
            VitalKey::DiastolicBp => self.diastolic_bp,
            VitalKey::Temperature => self.temperature,
            VitalKey::EtCo2 => self.etco2,
        }
    }

    /// Write one vital; non-finite values are ignored
    pub fn set(&mut self, key: VitalKey, value: f64) {
        if !value.is_finite() {
            tracing::warn!(vital = %key, "ignoring non-finite vital value");
            return;
        }
        let slot = match key {
            VitalKey::HeartRate => &mut self.heart_rate,
            VitalKey::Spo2 => &mut self.spo2,
            VitalKey::RespRate => &mut self.resp_rate,
            VitalKey::SystolicBp => &mut self.systolic_bp,
            VitalKey::DiastolicBp => &mut self.diastolic_bp,
            VitalKey::Temperature => &mut self.temperature,
            VitalKey::EtCo2 => &mut self.etco2,
        };
        *slot = value;
    }

    pub fn apply(&mut self, patch: &VitalsPatch) {
        for key in VitalKey::ALL {
            if let Some(value) = patch.get(key) {
                self.set(key, value);
            }
        }
    }

    pub fn to_patch(&self) -> VitalsPatch {
        let mut patch = VitalsPatch::default();
        for key in VitalKey::ALL {
            patch.set(key, Some(self.get(key)));
        }
        patch
    }
}

/// Partial vitals update; only present fields are authoritative
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spo2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systolic_bp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diastolic_bp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etco2: Option<f64>,
}

impl VitalsPatch {
    pub fn get(&self, key: VitalKey) -> Option<f64> {
        match key {
            VitalKey::HeartRate => self.heart_rate,
            VitalKey::Spo2 => self.spo2,
            VitalKey::RespRate => self.resp_rate,
            VitalKey::SystolicBp => self.systolic_bp,
            VitalKey::DiastolicBp => self.diastolic_bp,
            VitalKey::Temperature => self.temperature,
            VitalKey::EtCo2 => self.etco2,
        }
    }

    pub fn set(&mut self, key: VitalKey, value: Option<f64>) {
        let slot = match key {
            VitalKey::HeartRate => &mut self.heart_rate,
            VitalKey::Spo2 => &mut self.spo2,
            VitalKey::RespRate => &mut self.resp_rate,
            VitalKey::SystolicBp => &mut self.systolic_bp,
            VitalKey::DiastolicBp => &mut self.diastolic_bp,
            VitalKey::Temperature => &mut self.temperature,
            VitalKey::EtCo2 => &mut self.etco2,
        };
        *slot = value;
    }

    /// Builder-style setter
    pub fn with(mut self, key: VitalKey, value: f64) -> Self {
        self.set(key, Some(value));
        self
    }

    pub fn is_empty(&self) -> bool {
        VitalKey::ALL.iter().all(|key| self.get(*key).is_none())
    }

    /// Keys carrying a value
    pub fn keys(&self) -> impl Iterator<Item = VitalKey> + '_ {
        VitalKey::ALL.into_iter().filter(|key| self.get(*key).is_some())
    }

    /// Later patch wins field by field
    pub fn merged_with(&self, later: &VitalsPatch) -> VitalsPatch {
        let mut merged = *self;
        for key in later.keys() {
            merged.set(key, later.get(key));
        }
        merged
    }
}

/// Noisy snapshot shown on screen; `None` means the value cannot be measured
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayedVitals {
    pub heart_rate: Option<f64>,
    pub spo2: Option<f64>,
    pub resp_rate: Option<f64>,
    pub systolic_bp: Option<f64>,
    pub diastolic_bp: Option<f64>,
    pub temperature: Option<f64>,
    pub etco2: Option<f64>,
}

impl DisplayedVitals {
    /// The "--" reading of a monitor that has lost the signal
    pub const UNMEASURABLE: Option<f64> = None;

    pub fn get(&self, key: VitalKey) -> Option<f64> {
        match key {
            VitalKey::HeartRate => self.heart_rate,
            VitalKey::Spo2 => self.spo2,
            VitalKey::RespRate => self.resp_rate,
            VitalKey::SystolicBp => self.systolic_bp,
            VitalKey::DiastolicBp => self.diastolic_bp,
            VitalKey::Temperature => self.temperature,
            VitalKey::EtCo2 => self.etco2,
        }
    }

    /// Display the targets verbatim
    pub fn from_targets(targets: &TargetVitals) -> Self {
        Self {
            heart_rate: Some(targets.heart_rate),
            spo2: Some(targets.spo2),
            resp_rate: Some(targets.resp_rate),
            systolic_bp: Some(targets.systolic_bp),
            diastolic_bp: Some(targets.diastolic_bp),
            temperature: Some(targets.temperature),
            etco2: Some(targets.etco2),
        }
    }
}
