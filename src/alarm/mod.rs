// src/alarm/mod.rs
//! Alarm thresholds, supervision and tone generation

pub mod supervisor;
pub mod threshold;
pub mod tone;

pub use supervisor::{AlarmFired, AlarmHistoryEntry, AlarmPolicy, AlarmRuntimeState, AlarmSupervisor};
pub use threshold::{AlarmKey, AlarmThreshold, AlarmThresholds, BoundSide};
pub use tone::{AudioSink, NullAudioSink, ToneController, ToneSpec};
