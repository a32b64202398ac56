//! Respiratory phase clock
//! Location: src/simulation/respiratory_clock.rs

use serde::{Deserialize, Serialize};

use crate::config::constants::respiratory;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RespiratoryState {
    /// Normalized position in [0, 1)
    pub phase: f64,
}

/// Breath length for a respiratory rate, falling back for unusable rates
pub fn breath_duration_ms(resp_rate: f64) -> f64 {
    if resp_rate.is_finite() && resp_rate > 0.0 {
        60_000.0 / resp_rate
    } else {
        respiratory::FALLBACK_BREATH_DURATION_MS
    }
}

#[derive(Debug, Clone, Default)]
pub struct RespiratoryClock {
    state: RespiratoryState,
}

impl RespiratoryClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RespiratoryState {
        self.state
    }

    /// Advance by `dt_ms`; returns true when a new breath begins
    pub fn tick(&mut self, dt_ms: f64, resp_rate: f64) -> bool {
        let dt = if dt_ms.is_finite() && dt_ms > 0.0 { dt_ms } else { 0.0 };
        self.state.phase += dt / breath_duration_ms(resp_rate);
        if self.state.phase >= 1.0 {
            self.state.phase = 0.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breath_wraps_at_rate() {
        let mut clock = RespiratoryClock::new();
        // 12 breaths/min -> 5 s per breath
        assert!(!clock.tick(2_500.0, 12.0));
        assert!((clock.state().phase - 0.5).abs() < 1e-12);
        assert!(clock.tick(2_500.0, 12.0));
        assert_eq!(clock.state().phase, 0.0);
    }

    #[test]
    fn test_apnea_uses_fallback_period() {
        let mut clock = RespiratoryClock::new();
        clock.tick(1_000.0, 0.0);
        assert!((clock.state().phase - 0.1).abs() < 1e-12);
        clock.tick(1_000.0, -4.0);
        assert!((clock.state().phase - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_huge_step_wraps_once() {
        let mut clock = RespiratoryClock::new();
        assert!(clock.tick(1.0e9, 20.0));
        assert_eq!(clock.state().phase, 0.0);
    }
}
