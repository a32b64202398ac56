// src/error.rs
//! Error taxonomy for the monitor engine
//!
//! Nothing on the simulation path returns an error: numeric edge cases fall
//! back to safe defaults and collaborator failures are logged and dropped.
//! The types here cover the fallible edges only: configuration, scenario
//! sources, the event sink and the audio sink.

use std::path::PathBuf;
use thiserror::Error;

use crate::acquisition::ChannelBufferError;

/// Configuration loading, validation and persistence errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("configuration parse error: {0}")]
    Parse(String),

    #[error("configuration validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Scenario lookup, parsing and playback errors
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("unknown scenario timeline '{0}'")]
    UnknownTimeline(String),

    #[error("no scenario is loaded")]
    NoActiveScenario,

    #[error("keyframe index {index} out of range (timeline has {len})")]
    KeyframeOutOfRange { index: usize, len: usize },

    #[error("scenario definition is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("scenario file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Event log sink failures; never fatal to the simulation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventSinkError {
    #[error("event channel is full, event dropped")]
    Full,

    #[error("event channel is disconnected")]
    Disconnected,

    #[error("event persistence failed: {0}")]
    Persistence(String),
}

/// Audio output failures; the tone controller degrades to silence
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AudioError {
    #[error("no audio output device available")]
    Unavailable,

    #[error("audio backend error: {0}")]
    Backend(String),
}

/// Crate-wide error
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error(transparent)]
    EventSink(#[from] EventSinkError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Buffer(#[from] ChannelBufferError),
}

impl MonitorError {
    /// Whether the engine can keep running with defaults after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, MonitorError::Buffer(_))
    }
}

/// Result alias used across the crate
pub type MonitorResult<T> = Result<T, MonitorError>;
