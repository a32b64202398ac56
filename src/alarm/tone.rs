//! Alarm tone: square-wave beep pattern and the audio sink it drives
//! Location: src/alarm/tone.rs

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use tracing::{debug, warn};

use crate::config::constants::alarm;
use crate::error::AudioError;

/// Beep pattern: a square wave gated on for `on_ms` of every `period_ms`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneSpec {
    pub frequency_hz: f64,
    pub on_ms: u64,
    pub period_ms: u64,
}

impl Default for ToneSpec {
    fn default() -> Self {
        Self {
            frequency_hz: alarm::TONE_FREQUENCY_HZ,
            on_ms: alarm::TONE_ON_MS,
            period_ms: alarm::TONE_PERIOD_MS,
        }
    }
}

impl ToneSpec {
    /// Whether the gate is open `t_ms` after the tone started
    pub fn is_on_at(&self, t_ms: f64) -> bool {
        if self.period_ms == 0 || t_ms < 0.0 {
            return false;
        }
        t_ms.rem_euclid(self.period_ms as f64) < self.on_ms as f64
    }

    /// Instantaneous level in {-1, 0, 1}
    pub fn level_at(&self, t_ms: f64) -> f64 {
        if !self.is_on_at(t_ms) {
            return 0.0;
        }
        let carrier = (TAU * self.frequency_hz * t_ms / 1000.0).sin();
        if carrier >= 0.0 {
            1.0
        } else {
            -1.0
        }
    }

    /// Render PCM samples starting at `start_ms`
    pub fn render(&self, sample_rate_hz: u32, start_ms: f64, sample_count: usize, volume: f32) -> Vec<f32> {
        if sample_rate_hz == 0 {
            return vec![0.0; sample_count];
        }
        let step_ms = 1000.0 / f64::from(sample_rate_hz);
        let volume = volume.clamp(0.0, 1.0);
        (0..sample_count)
            .map(|i| self.level_at(start_ms + i as f64 * step_ms) as f32 * volume)
            .collect()
    }
}

/// Audio output collaborator
pub trait AudioSink: Send {
    fn start_tone(&mut self, spec: &ToneSpec) -> Result<(), AudioError>;
    fn stop_tone(&mut self) -> Result<(), AudioError>;
}

/// Sink for hosts without audio output
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn start_tone(&mut self, _spec: &ToneSpec) -> Result<(), AudioError> {
        Ok(())
    }

    fn stop_tone(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Starts and stops the sink on transitions only; sink failures degrade to silence
pub struct ToneController {
    sink: Box<dyn AudioSink>,
    spec: ToneSpec,
    sounding: bool,
    warned: bool,
}

impl ToneController {
    pub fn new(sink: Box<dyn AudioSink>, spec: ToneSpec) -> Self {
        Self {
            sink,
            spec,
            sounding: false,
            warned: false,
        }
    }

    pub fn silent() -> Self {
        Self::new(Box::new(NullAudioSink), ToneSpec::default())
    }

    pub fn spec(&self) -> &ToneSpec {
        &self.spec
    }

    pub fn is_sounding(&self) -> bool {
        self.sounding
    }

    pub fn replace_sink(&mut self, sink: Box<dyn AudioSink>) {
        let was_sounding = self.sounding;
        self.set_sounding(false);
        self.sink = sink;
        self.warned = false;
        self.set_sounding(was_sounding);
    }

    /// Drive the tone to the requested state
    pub fn set_sounding(&mut self, sounding: bool) {
        if sounding == self.sounding {
            return;
        }
        self.sounding = sounding;
        let result = if sounding {
            debug!(frequency_hz = self.spec.frequency_hz, "alarm tone on");
            self.sink.start_tone(&self.spec)
        } else {
            debug!("alarm tone off");
            self.sink.stop_tone()
        };
        if let Err(err) = result {
            if !self.warned {
                warn!(error = %err, "audio output unavailable, alarm tone is silent");
                self.warned = true;
            }
        }
    }
}

impl std::fmt::Debug for ToneController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToneController")
            .field("spec", &self.spec)
            .field("sounding", &self.sounding)
            .finish()
    }
}
