//! Cardiac phase clock: advances the normalized beat position each frame
//! Location: src/simulation/cardiac_clock.rs

use serde::{Deserialize, Serialize};

use super::random::RandomSource;
use crate::config::constants::cardiac;
use crate::physiology::RhythmType;

/// Position within the current beat plus the committed beat length
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardiacState {
    /// Normalized position in [0, 1)
    pub phase: f64,
    /// Length of the beat currently being drawn
    pub next_beat_duration_ms: f64,
    /// The beat currently being drawn is an early ectopic beat
    pub is_next_beat_ectopic: bool,
}

/// What happened during one clock tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatEvent {
    /// Phase moved forward inside the current beat
    Advanced,
    /// Phase crossed 1.0 and a new beat was committed
    BeatStarted { ectopic: bool },
    /// Asystole holds the phase at zero
    Pinned,
}

/// Beat length for a heart rate, with a safe fallback for unusable rates
pub fn nominal_beat_duration_ms(heart_rate: f64) -> f64 {
    if heart_rate.is_finite() && heart_rate > 0.0 {
        60_000.0 / heart_rate
    } else {
        cardiac::FALLBACK_BEAT_DURATION_MS
    }
}

fn usable_rate(heart_rate: f64) -> f64 {
    if heart_rate.is_finite() && heart_rate > 0.0 {
        heart_rate
    } else {
        0.0
    }
}

fn usable_dt(dt_ms: f64) -> f64 {
    if dt_ms.is_finite() && dt_ms > 0.0 {
        dt_ms
    } else {
        0.0
    }
}

/// The cardiac state machine
#[derive(Debug, Clone)]
pub struct CardiacClock {
    state: CardiacState,
    committed_rate: f64,
    committed_rhythm: RhythmType,
    beats: u64,
}

impl CardiacClock {
    /// Start at phase zero with a nominal beat for the given rate
    pub fn new(rhythm: RhythmType, heart_rate: f64) -> Self {
        Self {
            state: CardiacState {
                phase: 0.0,
                next_beat_duration_ms: nominal_beat_duration_ms(heart_rate),
                is_next_beat_ectopic: false,
            },
            committed_rate: usable_rate(heart_rate),
            committed_rhythm: rhythm,
            beats: 0,
        }
    }

    pub fn state(&self) -> CardiacState {
        self.state
    }

    /// Beats started since creation
    pub fn beat_count(&self) -> u64 {
        self.beats
    }

    /// Advance by `dt_ms` of real time
    pub fn tick(
        &mut self,
        dt_ms: f64,
        rhythm: RhythmType,
        heart_rate: f64,
        ectopic_enabled: bool,
        rng: &mut dyn RandomSource,
    ) -> BeatEvent {
        let dt = usable_dt(dt_ms);
        let rate = usable_rate(heart_rate);

        if rate != self.committed_rate || rhythm != self.committed_rhythm {
            self.retarget(rhythm, rate, rng);
        }

        match rhythm {
            RhythmType::Asystole => {
                self.state.phase = 0.0;
                BeatEvent::Pinned
            }
            RhythmType::VentricularFibrillation => {
                let next = (self.state.phase + dt / cardiac::VF_PHASE_PERIOD_MS).rem_euclid(1.0);
                self.state.phase = if next < 1.0 { next } else { 0.0 };
                BeatEvent::Advanced
            }
            _ => {
                self.state.phase += dt / self.state.next_beat_duration_ms;
                if self.state.phase >= 1.0 {
                    self.state.phase = 0.0;
                    let ectopic = self.commit_beat(rhythm, rate, ectopic_enabled, rng);
                    BeatEvent::BeatStarted { ectopic }
                } else {
                    BeatEvent::Advanced
                }
            }
        }
    }

    /// Re-commit the in-flight beat after a rate or rhythm change, keeping phase
    fn retarget(&mut self, rhythm: RhythmType, rate: f64, rng: &mut dyn RandomSource) {
        let mut duration = Self::rhythm_beat_duration(rhythm, rate, rng);
        if self.state.is_next_beat_ectopic {
            duration *= cardiac::ECTOPIC_PREMATURITY_FACTOR;
        }
        tracing::debug!(
            from_rate = self.committed_rate,
            to_rate = rate,
            %rhythm,
            duration_ms = duration,
            "retargeting cardiac clock"
        );
        self.state.next_beat_duration_ms = duration;
        self.committed_rate = rate;
        self.committed_rhythm = rhythm;
    }

    fn commit_beat(
        &mut self,
        rhythm: RhythmType,
        rate: f64,
        ectopic_enabled: bool,
        rng: &mut dyn RandomSource,
    ) -> bool {
        let mut duration = Self::rhythm_beat_duration(rhythm, rate, rng);
        let ectopic = ectopic_enabled && rng.chance(cardiac::ECTOPIC_PROBABILITY);
        if ectopic {
            duration *= cardiac::ECTOPIC_PREMATURITY_FACTOR;
        }

        self.state.next_beat_duration_ms = duration;
        self.state.is_next_beat_ectopic = ectopic;
        self.committed_rate = rate;
        self.committed_rhythm = rhythm;
        self.beats += 1;
        ectopic
    }

    fn rhythm_beat_duration(rhythm: RhythmType, rate: f64, rng: &mut dyn RandomSource) -> f64 {
        let nominal = nominal_beat_duration_ms(rate);
        match rhythm {
            RhythmType::AtrialFibrillation => {
                (nominal + rng.symmetric(cardiac::AF_JITTER_MS)).max(cardiac::MIN_BEAT_DURATION_MS)
            }
            _ => nominal,
        }
    }
}
