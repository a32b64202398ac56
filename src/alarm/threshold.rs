//! Alarm limits and alarm identities
//! Location: src/alarm/threshold.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::physiology::VitalKey;

/// Which limit a reading crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundSide {
    Low,
    High,
}

impl fmt::Display for BoundSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundSide::Low => f.write_str("low"),
            BoundSide::High => f.write_str("high"),
        }
    }
}

/// A vital alarms independently on its low and high side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlarmKey {
    pub vital: VitalKey,
    pub side: BoundSide,
}

impl AlarmKey {
    pub const fn new(vital: VitalKey, side: BoundSide) -> Self {
        Self { vital, side }
    }
}

impl fmt::Display for AlarmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.vital, self.side)
    }
}

/// Limits for one vital; an absent bound never alarms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlarmThreshold {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl AlarmThreshold {
    pub const fn new(low: Option<f64>, high: Option<f64>) -> Self {
        Self {
            low,
            high,
            enabled: true,
        }
    }

    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Side breached by `value`, if any. Limits themselves are in range.
    pub fn breach(&self, value: f64) -> Option<BoundSide> {
        if !self.enabled || !value.is_finite() {
            return None;
        }
        match (self.low, self.high) {
            (Some(low), _) if value < low => Some(BoundSide::Low),
            (_, Some(high)) if value > high => Some(BoundSide::High),
            _ => None,
        }
    }
}

/// One threshold per vital
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmThresholds(BTreeMap<VitalKey, AlarmThreshold>);

impl AlarmThresholds {
    /// Adult factory limits
    pub fn factory_defaults() -> Self {
        let limits = [
            (VitalKey::HeartRate, AlarmThreshold::new(Some(50.0), Some(120.0))),
            (VitalKey::Spo2, AlarmThreshold::new(Some(90.0), None)),
            (VitalKey::RespRate, AlarmThreshold::new(Some(8.0), Some(30.0))),
            (VitalKey::SystolicBp, AlarmThreshold::new(Some(90.0), Some(160.0))),
            (VitalKey::DiastolicBp, AlarmThreshold::new(Some(50.0), Some(100.0))),
            (VitalKey::Temperature, AlarmThreshold::new(Some(35.0), Some(38.5))),
            (VitalKey::EtCo2, AlarmThreshold::new(Some(30.0), Some(50.0))),
        ];
        Self(limits.into_iter().collect())
    }

    /// No limits at all
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, vital: VitalKey) -> Option<&AlarmThreshold> {
        self.0.get(&vital)
    }

    pub fn set(&mut self, vital: VitalKey, threshold: AlarmThreshold) {
        self.0.insert(vital, threshold);
    }

    pub fn remove(&mut self, vital: VitalKey) -> Option<AlarmThreshold> {
        self.0.remove(&vital)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VitalKey, &AlarmThreshold)> {
        self.0.iter().map(|(vital, threshold)| (*vital, threshold))
    }
}

impl Default for AlarmThresholds {
    fn default() -> Self {
        Self::factory_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breach_sides() {
        let hr = AlarmThreshold::new(Some(50.0), Some(120.0));
        assert_eq!(hr.breach(45.0), Some(BoundSide::Low));
        assert_eq!(hr.breach(121.0), Some(BoundSide::High));
        assert_eq!(hr.breach(50.0), None);
        assert_eq!(hr.breach(120.0), None);
        assert_eq!(hr.breach(f64::NAN), None);
        assert_eq!(hr.disabled().breach(10.0), None);
    }

    #[test]
    fn test_missing_bound_never_alarms() {
        let spo2 = AlarmThreshold::new(Some(90.0), None);
        assert_eq!(spo2.breach(1_000.0), None);
        let open = AlarmThreshold::new(None, None);
        assert_eq!(open.breach(-5.0), None);
    }

    #[test]
    fn test_factory_defaults_cover_every_vital() {
        let thresholds = AlarmThresholds::factory_defaults();
        for vital in VitalKey::ALL {
            assert!(thresholds.get(vital).is_some(), "{vital} has no default");
        }
        assert_eq!(
            thresholds.get(VitalKey::HeartRate),
            Some(&AlarmThreshold::new(Some(50.0), Some(120.0)))
        );
    }

    #[test]
    fn test_key_display() {
        let key = AlarmKey::new(VitalKey::HeartRate, BoundSide::Low);
        assert_eq!(key.to_string(), "heart_rate:low");
    }
}
