//! Waveform synthesis for the electrical, pleth and respiratory channels
//! Location: src/simulation/waveform.rs
//!
//! The electrical trace is a sum of Gaussian deflections laid along the unit
//! beat interval. Pulse widths are scaled by `max(1, hr / 60)` in phase so
//! that their width in time stays constant as the beat shortens.

use std::f64::consts::{FRAC_PI_2, TAU};

use super::random::RandomSource;
use crate::config::constants::waveform as shape;
use crate::physiology::{ConditionSet, RhythmType};

/// Everything the electrical channel needs to know about the current beat
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatContext {
    pub rhythm: RhythmType,
    pub conditions: ConditionSet,
    pub heart_rate: f64,
    /// The beat being drawn was committed as ectopic
    pub ectopic: bool,
}

/// One synthesized sample per channel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelSample {
    pub electrical: f64,
    pub pleth: f64,
    pub respiratory: f64,
}

/// Phase-domain width multiplier for a heart rate
pub fn width_scale(heart_rate: f64) -> f64 {
    if heart_rate.is_finite() && heart_rate > 0.0 {
        (heart_rate / shape::REFERENCE_HEART_RATE).max(1.0)
    } else {
        1.0
    }
}

/// Phase-domain width of a pulse whose base width is given at 60 bpm
pub fn pulse_width(base_width: f64, heart_rate: f64) -> f64 {
    base_width * width_scale(heart_rate)
}

/// `amplitude * exp(-(phase - center)^2 / (2 width^2))`
pub fn gaussian(phase: f64, center: f64, width: f64, amplitude: f64) -> f64 {
    let offset = phase - center;
    amplitude * (-(offset * offset) / (2.0 * width * width)).exp()
}

/// Gaussian multiplied by a logistic approximation of the normal CDF
pub fn skewed_pulse(phase: f64, center: f64, width: f64, amplitude: f64, skew: f64) -> f64 {
    let z = (phase - center) / width;
    let density = (-0.5 * z * z).exp();
    let cumulative = 1.0 / (1.0 + (-1.702 * skew * z).exp());
    amplitude * 2.0 * density * cumulative
}

/// Stateless sampler; the only randomness comes from the caller's source
#[derive(Debug, Clone, Copy, Default)]
pub struct WaveformSynthesizer;

impl WaveformSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Sample all three channels
    pub fn sample(
        &self,
        cardiac_phase: f64,
        respiratory_phase: f64,
        beat: &BeatContext,
        rng: &mut dyn RandomSource,
    ) -> ChannelSample {
        ChannelSample {
            electrical: self.electrical(cardiac_phase, beat, rng),
            pleth: self.plethysmographic(cardiac_phase, respiratory_phase, beat.heart_rate, beat.rhythm),
            respiratory: self.respiratory(respiratory_phase),
        }
    }

    /// ECG-like channel
    pub fn electrical(&self, phase: f64, beat: &BeatContext, rng: &mut dyn RandomSource) -> f64 {
        let conditions = beat.conditions.sanitized();

        let body = match beat.rhythm {
            RhythmType::VentricularFibrillation => Self::fibrillation(phase, rng),
            RhythmType::Asystole => rng.symmetric(shape::ASYSTOLE_WANDER),
            _ => Self::structured_beat(phase, beat, &conditions),
        };

        if conditions.noise_level > 0 {
            body + rng.symmetric(f64::from(conditions.noise_level) * shape::NOISE_PER_LEVEL)
        } else {
            body
        }
    }

    fn structured_beat(phase: f64, beat: &BeatContext, conditions: &ConditionSet) -> f64 {
        let scale = width_scale(beat.heart_rate);
        let qrs_factor = if conditions.qrs_widened { shape::QRS_WIDENED_FACTOR } else { 1.0 };
        let mut signal = 0.0;

        if !beat.rhythm.suppresses_p_wave() {
            signal += gaussian(phase, shape::P_CENTER, shape::P_WIDTH * scale, shape::P_AMPLITUDE);
        }

        if beat.rhythm == RhythmType::AtrialFibrillation {
            for (frequency, amplitude) in shape::AF_WAVE_FREQUENCIES.iter().zip(shape::AF_WAVE_AMPLITUDES) {
                signal += amplitude * (phase * frequency).sin();
            }
        }

        if beat.ectopic {
            for i in 0..2 {
                signal += gaussian(
                    phase,
                    shape::ECTOPIC_CENTERS[i],
                    shape::ECTOPIC_WIDTHS[i] * scale * qrs_factor,
                    shape::ECTOPIC_AMPLITUDES[i],
                );
            }
            return signal;
        }

        let qrs_scale = scale * qrs_factor;
        signal += gaussian(phase, shape::Q_CENTER, shape::Q_WIDTH * qrs_scale, shape::Q_AMPLITUDE);
        signal += gaussian(phase, shape::R_CENTER, shape::R_WIDTH * qrs_scale, shape::R_AMPLITUDE);
        signal += gaussian(phase, shape::S_CENTER, shape::S_WIDTH * qrs_scale, shape::S_AMPLITUDE);

        let st_signal = conditions.st_deviation_mm * shape::ST_SIGNAL_PER_MM;
        if conditions.st_deviation_mm.abs() > shape::ST_PLATEAU_MIN_MM {
            for center in shape::ST_PLATEAU_CENTERS {
                signal += gaussian(phase, center, shape::ST_PLATEAU_WIDTH * scale, st_signal);
            }
        }

        let mut t_amplitude = shape::T_AMPLITUDE + st_signal * shape::ST_T_WAVE_BIAS;
        if conditions.t_wave_inverted {
            t_amplitude = -t_amplitude;
        }
        signal + skewed_pulse(phase, shape::T_CENTER, shape::T_WIDTH * scale, t_amplitude, shape::T_SKEW)
    }

    fn fibrillation(phase: f64, rng: &mut dyn RandomSource) -> f64 {
        let mut signal = 0.0;
        for (frequency, amplitude) in shape::VF_FREQUENCIES.iter().zip(shape::VF_AMPLITUDES) {
            signal += amplitude * (phase * frequency).sin();
        }
        signal + rng.symmetric(shape::VF_JITTER)
    }

    /// Pulse-oximetry channel, trailing the electrical beat
    pub fn plethysmographic(
        &self,
        cardiac_phase: f64,
        respiratory_phase: f64,
        heart_rate: f64,
        rhythm: RhythmType,
    ) -> f64 {
        if !(heart_rate.is_finite() && heart_rate > 0.0) || rhythm.is_non_perfusing() {
            return 0.0;
        }

        let delayed = (cardiac_phase - shape::PLETH_PHASE_DELAY).rem_euclid(1.0);
        let pulse = if delayed < shape::PLETH_UPSTROKE_FRACTION {
            (delayed / shape::PLETH_UPSTROKE_FRACTION * FRAC_PI_2).sin()
        } else {
            let t = (delayed - shape::PLETH_UPSTROKE_FRACTION) / (1.0 - shape::PLETH_UPSTROKE_FRACTION);
            let floor = (-shape::PLETH_DECAY_RATE).exp();
            let decay = ((-shape::PLETH_DECAY_RATE * t).exp() - floor) / (1.0 - floor);
            decay - gaussian(t, shape::PLETH_NOTCH_CENTER, shape::PLETH_NOTCH_WIDTH, shape::PLETH_NOTCH_DEPTH)
        };

        let mut amplitude = 1.0;
        if heart_rate > shape::PLETH_TACHY_THRESHOLD_BPM {
            amplitude *= shape::PLETH_TACHY_ATTENUATION;
        }
        amplitude *= 1.0 + shape::PLETH_RESP_MODULATION * (TAU * respiratory_phase).sin();

        pulse * amplitude
    }

    /// Respiration channel
    pub fn respiratory(&self, respiratory_phase: f64) -> f64 {
        shape::RESP_AMPLITUDE * (TAU * respiratory_phase).sin()
    }
}
