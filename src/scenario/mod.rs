// src/scenario/mod.rs
//! Keyframe timelines, the scenario source and the playback engine

pub mod engine;
pub mod keyframe;
pub mod library;
pub mod timeline;

pub use engine::{PlaybackState, ScenarioEngine, ScenarioProgress, ScenarioRunState, ScenarioUpdate, StepApplied};
pub use keyframe::Keyframe;
pub use library::ScenarioLibrary;
pub use timeline::{Evaluation, ResolvedTimeline, ScenarioTimeline, ScenarioWrite};
