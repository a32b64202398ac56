// src/acquisition/mod.rs
//! Sample history consumed by the renderer

pub mod channel_buffer;

pub use channel_buffer::{ChannelBufferError, ChannelBuffers, ChannelSnapshot, RollingBuffer};
