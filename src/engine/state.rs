// src/engine/state.rs
//! Owned simulation state shared by the four periodic activities

use crate::acquisition::{ChannelBufferError, ChannelBuffers};
use crate::physiology::ClinicalState;
use crate::simulation::{CardiacClock, JitterEngine, RespiratoryClock};

/// Everything the activities read and write. Only the engine mutates it.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub(crate) clinical: ClinicalState,
    pub(crate) cardiac: CardiacClock,
    pub(crate) respiratory: RespiratoryClock,
    pub(crate) channels: ChannelBuffers,
    pub(crate) jitter: JitterEngine,
}

impl SimulationState {
    pub fn new(initial: ClinicalState, channel_length: usize) -> Result<Self, ChannelBufferError> {
        Ok(Self {
            cardiac: CardiacClock::new(initial.rhythm, initial.vitals.heart_rate),
            respiratory: RespiratoryClock::new(),
            channels: ChannelBuffers::new(channel_length)?,
            jitter: JitterEngine::new(&initial.vitals),
            clinical: initial,
        })
    }

    pub fn clinical(&self) -> &ClinicalState {
        &self.clinical
    }

    pub fn cardiac(&self) -> &CardiacClock {
        &self.cardiac
    }

    pub fn respiratory(&self) -> &RespiratoryClock {
        &self.respiratory
    }

    pub fn channels(&self) -> &ChannelBuffers {
        &self.channels
    }

    pub fn jitter(&self) -> &JitterEngine {
        &self.jitter
    }
}
