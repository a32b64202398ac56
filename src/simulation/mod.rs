//! Physiological simulation: phase clocks, waveform synthesis and display jitter
//! Location: src/simulation/mod.rs

pub mod random;
pub mod cardiac_clock;
pub mod respiratory_clock;
pub mod waveform;
pub mod jitter;

pub use cardiac_clock::{BeatEvent, CardiacClock, CardiacState};
pub use jitter::JitterEngine;
pub use random::{RandomSource, SeededRandom};
pub use respiratory_clock::{RespiratoryClock, RespiratoryState};
pub use waveform::{BeatContext, ChannelSample, WaveformSynthesizer};
