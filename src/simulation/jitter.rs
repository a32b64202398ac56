//! Display jitter: derives the noisy on-screen vitals from the targets
//! Location: src/simulation/jitter.rs

use super::random::RandomSource;
use crate::config::constants::jitter as bounds;
use crate::physiology::vitals::round_to;
use crate::physiology::{DisplayedVitals, RhythmType, TargetVitals};

/// Produces displayed snapshots; never writes back into the targets
#[derive(Debug, Clone)]
pub struct JitterEngine {
    last: DisplayedVitals,
}

impl JitterEngine {
    pub fn new(targets: &TargetVitals) -> Self {
        Self {
            last: DisplayedVitals::from_targets(targets),
        }
    }

    /// Most recent snapshot
    pub fn displayed(&self) -> DisplayedVitals {
        self.last
    }

    /// Compute a new snapshot
    pub fn tick(
        &mut self,
        targets: &TargetVitals,
        rhythm: RhythmType,
        rng: &mut dyn RandomSource,
    ) -> DisplayedVitals {
        let snapshot = if rhythm.is_non_perfusing() {
            self.arrest_snapshot(targets, rng)
        } else {
            Self::perfusing_snapshot(targets, rng)
        };
        self.last = snapshot;
        snapshot
    }

    fn arrest_snapshot(&self, targets: &TargetVitals, rng: &mut dyn RandomSource) -> DisplayedVitals {
        let etco2 = self.last.etco2.map(|value| {
            let decayed = value * bounds::ETCO2_ARREST_DECAY;
            if decayed < bounds::ETCO2_ARREST_FLOOR {
                0.0
            } else {
                decayed.round()
            }
        });

        DisplayedVitals {
            heart_rate: Some(0.0),
            spo2: DisplayedVitals::UNMEASURABLE,
            resp_rate: Some(jittered(targets.resp_rate, bounds::RESP_RATE, rng).round()),
            systolic_bp: DisplayedVitals::UNMEASURABLE,
            diastolic_bp: DisplayedVitals::UNMEASURABLE,
            temperature: self.last.temperature.or(Some(targets.temperature)),
            etco2: etco2.or(Some(0.0)),
        }
    }

    fn perfusing_snapshot(targets: &TargetVitals, rng: &mut dyn RandomSource) -> DisplayedVitals {
        let spo2_dip = if rng.chance(bounds::SPO2_DIP_PROBABILITY) { -1.0 } else { 0.0 };
        let (spo2_min, spo2_max) = bounds::SPO2_RANGE;
        let (temp_min, temp_max) = bounds::TEMPERATURE_RANGE_C;

        DisplayedVitals {
            heart_rate: Some(jittered(targets.heart_rate, bounds::HEART_RATE, rng).round()),
            spo2: Some(non_negative(targets.spo2 + spo2_dip).clamp(spo2_min, spo2_max).round()),
            resp_rate: Some(jittered(targets.resp_rate, bounds::RESP_RATE, rng).round()),
            systolic_bp: Some(jittered(targets.systolic_bp, bounds::PRESSURE, rng).round()),
            diastolic_bp: Some(jittered(targets.diastolic_bp, bounds::PRESSURE, rng).round()),
            temperature: Some(round_to(
                sane(targets.temperature + rng.symmetric(bounds::TEMPERATURE_C)).clamp(temp_min, temp_max),
                1,
            )),
            etco2: Some(jittered(targets.etco2, bounds::ETCO2, rng).round()),
        }
    }
}

fn sane(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn non_negative(value: f64) -> f64 {
    sane(value).max(0.0)
}

fn jittered(target: f64, half_width: f64, rng: &mut dyn RandomSource) -> f64 {
    non_negative(target + rng.symmetric(half_width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::random::{FixedRandom, SeededRandom};

    #[test]
    fn test_asystole_forces_zero_rate_and_unmeasurable_readings() {
        let mut rng = SeededRandom::new(8);
        let targets = TargetVitals {
            heart_rate: 150.0,
            spo2: 99.0,
            systolic_bp: 180.0,
            diastolic_bp: 100.0,
            ..Default::default()
        };
        let mut engine = JitterEngine::new(&targets);

        for _ in 0..50 {
            let shown = engine.tick(&targets, RhythmType::Asystole, &mut rng);
            assert_eq!(shown.heart_rate, Some(0.0));
            assert_eq!(shown.spo2, DisplayedVitals::UNMEASURABLE);
            assert_eq!(shown.systolic_bp, DisplayedVitals::UNMEASURABLE);
            assert_eq!(shown.diastolic_bp, DisplayedVitals::UNMEASURABLE);
        }
    }

    #[test]
    fn test_arrest_decays_etco2_and_holds_temperature() {
        let mut rng = SeededRandom::new(9);
        let targets = TargetVitals::default();
        let mut engine = JitterEngine::new(&targets);
        let before = engine.tick(&targets, RhythmType::NormalSinus, &mut rng);

        let mut previous = before.etco2.unwrap();
        for _ in 0..20 {
            let shown = engine.tick(&targets, RhythmType::VentricularFibrillation, &mut rng);
            let etco2 = shown.etco2.unwrap();
            assert!(etco2 <= previous);
            assert_eq!(shown.temperature, before.temperature);
            previous = etco2;
        }
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn test_perfusing_jitter_stays_within_bounds() {
        let mut rng = SeededRandom::new(10);
        let targets = TargetVitals::default();
        let mut engine = JitterEngine::new(&targets);

        for _ in 0..1_000 {
            let shown = engine.tick(&targets, RhythmType::NormalSinus, &mut rng);
            assert!((shown.heart_rate.unwrap() - targets.heart_rate).abs() <= 2.0);
            let spo2 = shown.spo2.unwrap();
            assert!(spo2 == targets.spo2 || spo2 == targets.spo2 - 1.0);
            assert!((shown.resp_rate.unwrap() - targets.resp_rate).abs() <= 1.0);
            assert!((shown.systolic_bp.unwrap() - targets.systolic_bp).abs() <= 2.0);
            assert!((shown.temperature.unwrap() - targets.temperature).abs() <= 0.1 + 1e-9);
            assert!((shown.etco2.unwrap() - targets.etco2).abs() <= 1.0);
        }
    }

    #[test]
    fn test_clamps_keep_readings_physiological() {
        let mut rng = FixedRandom(0.0);
        let targets = TargetVitals {
            heart_rate: 0.0,
            spo2: 0.0,
            temperature: 50.0,
            etco2: f64::NAN,
            ..Default::default()
        };
        let mut engine = JitterEngine::new(&targets);
        let shown = engine.tick(&targets, RhythmType::NormalSinus, &mut rng);

        assert_eq!(shown.heart_rate, Some(0.0));
        assert_eq!(shown.spo2, Some(0.0));
        assert_eq!(shown.temperature, Some(42.0));
        assert_eq!(shown.etco2, Some(0.0));
    }

    #[test]
    fn test_targets_are_never_modified() {
        let mut rng = SeededRandom::new(12);
        let targets = TargetVitals::default();
        let copy = targets;
        let mut engine = JitterEngine::new(&targets);
        engine.tick(&targets, RhythmType::AtrialFibrillation, &mut rng);
        assert_eq!(targets, copy);
    }
}
