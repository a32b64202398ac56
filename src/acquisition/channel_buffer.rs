// src/acquisition/channel_buffer.rs
//! Fixed-length rolling sample history for the render sink

use thiserror::Error;

use crate::config::constants::buffers;
use crate::simulation::ChannelSample;

/// Channel buffer error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelBufferError {
    #[error("invalid channel length {0} (must be between {min} and {max})", min = buffers::MIN_CHANNEL_LENGTH, max = buffers::MAX_CHANNEL_LENGTH)]
    InvalidLength(usize),
}

/// Rolling buffer that always holds exactly `len` samples, oldest first
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    samples: Vec<f64>,
    head: usize,
}

impl RollingBuffer {
    /// Create a zero-filled buffer
    pub fn new(len: usize) -> Result<Self, ChannelBufferError> {
        if !(buffers::MIN_CHANNEL_LENGTH..=buffers::MAX_CHANNEL_LENGTH).contains(&len) {
            return Err(ChannelBufferError::InvalidLength(len));
        }
        Ok(Self {
            samples: vec![0.0; len],
            head: 0,
        })
    }

    /// Append a sample, dropping the oldest
    pub fn push(&mut self, value: f64) {
        self.samples[self.head] = if value.is_finite() { value } else { 0.0 };
        self.head = (self.head + 1) % self.samples.len();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recent sample
    pub fn latest(&self) -> f64 {
        let len = self.samples.len();
        self.samples[(self.head + len - 1) % len]
    }

    /// Samples in chronological order, most recent last
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let (newer, older) = self.samples.split_at(self.head);
        older.iter().chain(newer.iter()).copied()
    }

    /// Copy out in chronological order
    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }

    /// Reset to a flat line
    pub fn clear(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
        self.head = 0;
    }
}

/// Read-only copy of all three channels handed to the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSnapshot {
    pub electrical: Vec<f64>,
    pub pleth: Vec<f64>,
    pub respiratory: Vec<f64>,
}

/// The three rolling channels
#[derive(Debug, Clone)]
pub struct ChannelBuffers {
    electrical: RollingBuffer,
    pleth: RollingBuffer,
    respiratory: RollingBuffer,
}

impl ChannelBuffers {
    pub fn new(len: usize) -> Result<Self, ChannelBufferError> {
        Ok(Self {
            electrical: RollingBuffer::new(len)?,
            pleth: RollingBuffer::new(len)?,
            respiratory: RollingBuffer::new(len)?,
        })
    }

    pub fn push(&mut self, sample: ChannelSample) {
        self.electrical.push(sample.electrical);
        self.pleth.push(sample.pleth);
        self.respiratory.push(sample.respiratory);
    }

    pub fn electrical(&self) -> &RollingBuffer {
        &self.electrical
    }

    pub fn pleth(&self) -> &RollingBuffer {
        &self.pleth
    }

    pub fn respiratory(&self) -> &RollingBuffer {
        &self.respiratory
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            electrical: self.electrical.to_vec(),
            pleth: self.pleth.to_vec(),
            respiratory: self.respiratory.to_vec(),
        }
    }

    pub fn clear(&mut self) {
        self.electrical.clear();
        self.pleth.clear();
        self.respiratory.clear();
    }
}
