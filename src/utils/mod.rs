//! Common utilities shared across the monitor engine
//!
//! Currently the injectable clock used by alarm supervision and event
//! timestamps, so tests can drive time by hand.

pub mod time;

pub use time::{
    current_timestamp_millis, MockTimeProvider, MonotonicTimeProvider, SystemTimeProvider, TimeProvider,
};
