// src/events.rs
//! Event log sink: discrete notifications handed to an external logger
//!
//! Publishing never blocks the simulation. The channel sink drops events
//! when full and the async forwarder persists them best-effort.

use std::collections::BTreeMap;

use async_trait::async_trait;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use serde::Serialize;

use crate::alarm::AlarmKey;
use crate::config::constants::events;
use crate::error::EventSinkError;
use crate::physiology::{RhythmType, TargetVitals, VitalKey};

/// Notification emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    VitalChanged {
        vital: VitalKey,
        previous: f64,
        current: f64,
        at_ms: u64,
    },
    AlarmFired {
        key: AlarmKey,
        value: f64,
        at_ms: u64,
    },
    ScenarioStepApplied {
        timeline_id: String,
        index: usize,
        label: Option<String>,
        at_ms: u64,
    },
    RhythmChanged {
        previous: RhythmType,
        current: RhythmType,
        at_ms: u64,
    },
}

impl MonitorEvent {
    pub fn at_ms(&self) -> u64 {
        match self {
            MonitorEvent::VitalChanged { at_ms, .. }
            | MonitorEvent::AlarmFired { at_ms, .. }
            | MonitorEvent::ScenarioStepApplied { at_ms, .. }
            | MonitorEvent::RhythmChanged { at_ms, .. } => *at_ms,
        }
    }
}

/// Non-blocking event consumer
pub trait EventSink: Send {
    fn publish(&self, event: MonitorEvent) -> Result<(), EventSinkError>;
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn publish(&self, _event: MonitorEvent) -> Result<(), EventSinkError> {
        Ok(())
    }
}

/// Bounded crossbeam channel; a full channel drops the event
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: Sender<MonitorEvent>,
}

impl ChannelEventSink {
    pub fn bounded(capacity: usize) -> (Self, Receiver<MonitorEvent>) {
        let (tx, rx) = channel::bounded(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn publish(&self, event: MonitorEvent) -> Result<(), EventSinkError> {
        self.tx.try_send(event).map_err(|err| match err {
            TrySendError::Full(_) => EventSinkError::Full,
            TrySendError::Disconnected(_) => EventSinkError::Disconnected,
        })
    }
}

/// Reports target-vital changes once they move far enough from the last reported value
#[derive(Debug, Clone)]
pub struct SignificanceFilter {
    thresholds: BTreeMap<VitalKey, f64>,
    last_reported: TargetVitals,
}

impl SignificanceFilter {
    pub fn new(thresholds: BTreeMap<VitalKey, f64>, initial: &TargetVitals) -> Self {
        Self {
            thresholds,
            last_reported: *initial,
        }
    }

    /// Default per-vital thresholds
    pub fn default_thresholds() -> BTreeMap<VitalKey, f64> {
        BTreeMap::from([
            (VitalKey::HeartRate, events::HEART_RATE_SIGNIFICANCE),
            (VitalKey::Spo2, events::SPO2_SIGNIFICANCE),
            (VitalKey::RespRate, events::RESP_RATE_SIGNIFICANCE),
            (VitalKey::SystolicBp, events::PRESSURE_SIGNIFICANCE),
            (VitalKey::DiastolicBp, events::PRESSURE_SIGNIFICANCE),
            (VitalKey::Temperature, events::TEMPERATURE_SIGNIFICANCE),
            (VitalKey::EtCo2, events::ETCO2_SIGNIFICANCE),
        ])
    }

    /// Vitals that moved at least their threshold, as (vital, previous, current)
    pub fn significant_changes(&mut self, current: &TargetVitals) -> Vec<(VitalKey, f64, f64)> {
        let mut changes = Vec::new();
        for (&vital, &threshold) in &self.thresholds {
            let previous = self.last_reported.get(vital);
            let now = current.get(vital);
            if (now - previous).abs() >= threshold {
                changes.push((vital, previous, now));
                self.last_reported.set(vital, now);
            }
        }
        changes
    }
}

/// Asynchronous persistence collaborator
#[async_trait]
pub trait EventPersistence: Send + Sync {
    async fn persist(&self, event: &MonitorEvent) -> Result<(), EventSinkError>;
}

/// Drain `rx` into `persistence` until every sender is gone; returns the number persisted.
#[cfg(feature = "runtime")]
pub fn spawn_forwarder(
    rx: Receiver<MonitorEvent>,
    persistence: std::sync::Arc<dyn EventPersistence>,
    poll_interval: std::time::Duration,
) -> tokio::task::JoinHandle<usize> {
    use crossbeam::channel::TryRecvError;

    tokio::spawn(async move {
        let mut persisted = 0usize;
        loop {
            match rx.try_recv() {
                Ok(event) => match persistence.persist(&event).await {
                    Ok(()) => persisted += 1,
                    Err(err) => tracing::warn!(error = %err, "event persistence failed, event dropped"),
                },
                Err(TryRecvError::Empty) => tokio::time::sleep(poll_interval).await,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        tracing::debug!(persisted, "event forwarder finished");
        persisted
    })
}
