//! Alarm supervision: debounce, snooze, acknowledge and mute
//! Location: src/alarm/supervisor.rs
//!
//! Evaluation is driven externally with a millisecond timestamp so the
//! supervisor itself never reads a clock.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::Serialize;
use tracing::{debug, info};

use super::threshold::{AlarmKey, AlarmThreshold, AlarmThresholds};
use super::tone::ToneController;
use crate::config::constants::alarm;
use crate::physiology::{DisplayedVitals, VitalKey};

const MS_PER_MINUTE: u64 = 60_000;

/// Debounce and history limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmPolicy {
    pub debounce_ms: u64,
    pub history_limit: usize,
}

impl Default for AlarmPolicy {
    fn default() -> Self {
        Self {
            debounce_ms: alarm::DEBOUNCE_MS,
            history_limit: alarm::HISTORY_LIMIT,
        }
    }
}

/// Mutable supervision state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRuntimeState {
    pub active: BTreeSet<AlarmKey>,
    pub last_fired_at: HashMap<AlarmKey, u64>,
    pub snoozed_until: HashMap<AlarmKey, u64>,
    pub muted: bool,
    pub snooze_duration_minutes: u32,
}

impl Default for AlarmRuntimeState {
    fn default() -> Self {
        Self {
            active: BTreeSet::new(),
            last_fired_at: HashMap::new(),
            snoozed_until: HashMap::new(),
            muted: false,
            snooze_duration_minutes: alarm::DEFAULT_SNOOZE_MINUTES,
        }
    }
}

/// A logged alarm firing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmHistoryEntry {
    pub id: u64,
    pub key: AlarmKey,
    pub value: f64,
    pub fired_at_ms: u64,
    pub acknowledged: bool,
}

/// A new firing produced by one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlarmFired {
    pub key: AlarmKey,
    pub value: f64,
    pub threshold: AlarmThreshold,
    pub at_ms: u64,
}

pub struct AlarmSupervisor {
    thresholds: AlarmThresholds,
    state: AlarmRuntimeState,
    history: VecDeque<AlarmHistoryEntry>,
    next_entry_id: u64,
    policy: AlarmPolicy,
    tone: ToneController,
}

impl AlarmSupervisor {
    pub fn new(thresholds: AlarmThresholds, policy: AlarmPolicy, tone: ToneController) -> Self {
        Self {
            thresholds,
            state: AlarmRuntimeState::default(),
            history: VecDeque::new(),
            next_entry_id: 1,
            policy,
            tone,
        }
    }

    /// Factory limits, default policy, no audio
    pub fn with_defaults() -> Self {
        Self::new(
            AlarmThresholds::factory_defaults(),
            AlarmPolicy::default(),
            ToneController::silent(),
        )
    }

    pub fn thresholds(&self) -> &AlarmThresholds {
        &self.thresholds
    }

    pub fn set_threshold(&mut self, vital: VitalKey, threshold: AlarmThreshold) {
        debug!(%vital, ?threshold, "alarm threshold updated");
        self.thresholds.set(vital, threshold);
    }

    pub fn replace_thresholds(&mut self, thresholds: AlarmThresholds) {
        self.thresholds = thresholds;
    }

    pub fn state(&self) -> &AlarmRuntimeState {
        &self.state
    }

    pub fn active_alarms(&self) -> impl Iterator<Item = AlarmKey> + '_ {
        self.state.active.iter().copied()
    }

    pub fn is_active(&self, key: AlarmKey) -> bool {
        self.state.active.contains(&key)
    }

    /// Whether `key` has an unexpired snooze at `now_ms`
    pub fn is_snoozed(&self, key: AlarmKey, now_ms: u64) -> bool {
        self.state
            .snoozed_until
            .get(&key)
            .is_some_and(|&until| until > now_ms)
    }

    /// Oldest entry first
    pub fn history(&self) -> impl Iterator<Item = &AlarmHistoryEntry> {
        self.history.iter()
    }

    pub fn tone(&self) -> &ToneController {
        &self.tone
    }

    pub fn tone_mut(&mut self) -> &mut ToneController {
        &mut self.tone
    }

    /// Compare the displayed snapshot against every enabled threshold
    pub fn evaluate(&mut self, displayed: &DisplayedVitals, now_ms: u64) -> Vec<AlarmFired> {
        self.state.snoozed_until.retain(|_, until| *until > now_ms);

        let mut fired = Vec::new();
        let breaches: Vec<(AlarmKey, f64, AlarmThreshold)> = self
            .thresholds
            .iter()
            .filter_map(|(vital, threshold)| {
                // Unmeasurable readings never alarm
                let value = displayed.get(vital)?;
                let side = threshold.breach(value)?;
                Some((AlarmKey::new(vital, side), value, *threshold))
            })
            .collect();
        let breaching: BTreeSet<AlarmKey> = breaches.iter().map(|(key, _, _)| *key).collect();

        for (key, value, threshold) in breaches {
            if self.is_snoozed(key, now_ms) {
                continue;
            }

            let within_debounce = self
                .state
                .last_fired_at
                .get(&key)
                .is_some_and(|&last| now_ms.saturating_sub(last) < self.policy.debounce_ms);
            self.state.active.insert(key);
            if within_debounce {
                continue;
            }

            self.state.last_fired_at.insert(key, now_ms);
            self.record(key, value, now_ms);
            info!(alarm = %key, value, "alarm fired");
            fired.push(AlarmFired {
                key,
                value,
                threshold,
                at_ms: now_ms,
            });
        }

        // Conditions that returned to range, became unmeasurable or lost their limit
        self.state.active.retain(|key| {
            let still_breaching = breaching.contains(key);
            if !still_breaching {
                debug!(alarm = %key, "alarm condition cleared");
            }
            still_breaching
        });

        self.sync_tone();
        fired
    }

    /// Clear one alarm; it can fire again if the breach recurs
    pub fn acknowledge(&mut self, key: AlarmKey) -> bool {
        let removed = self.state.active.remove(&key);
        for entry in self.history.iter_mut().filter(|e| e.key == key) {
            entry.acknowledged = true;
        }
        if removed {
            info!(alarm = %key, "alarm acknowledged");
        }
        self.sync_tone();
        removed
    }

    pub fn acknowledge_all(&mut self) {
        if !self.state.active.is_empty() {
            info!(count = self.state.active.len(), "all alarms acknowledged");
        }
        self.state.active.clear();
        for entry in self.history.iter_mut() {
            entry.acknowledged = true;
        }
        self.sync_tone();
    }

    /// Silence `key` until `now_ms` plus the duration; `None` uses the configured duration
    pub fn snooze(&mut self, key: AlarmKey, duration_minutes: Option<u32>, now_ms: u64) {
        let minutes = duration_minutes.unwrap_or(self.state.snooze_duration_minutes);
        let until = now_ms.saturating_add(u64::from(minutes) * MS_PER_MINUTE);
        self.state.active.remove(&key);
        self.state.snoozed_until.insert(key, until);
        info!(alarm = %key, minutes, "alarm snoozed");
        self.sync_tone();
    }

    /// Snooze every currently active alarm
    pub fn snooze_all(&mut self, duration_minutes: Option<u32>, now_ms: u64) {
        let active: Vec<AlarmKey> = self.state.active.iter().copied().collect();
        for key in active {
            self.snooze(key, duration_minutes, now_ms);
        }
    }

    pub fn snooze_duration_minutes(&self) -> u32 {
        self.state.snooze_duration_minutes
    }

    pub fn set_snooze_duration_minutes(&mut self, minutes: u32) {
        self.state.snooze_duration_minutes = minutes;
    }

    pub fn is_muted(&self) -> bool {
        self.state.muted
    }

    /// Mute only affects the tone, never evaluation or the active set
    pub fn set_muted(&mut self, muted: bool) {
        if self.state.muted != muted {
            info!(muted, "alarm audio mute changed");
        }
        self.state.muted = muted;
        self.sync_tone();
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.set_muted(!self.state.muted);
        self.state.muted
    }

    fn record(&mut self, key: AlarmKey, value: f64, now_ms: u64) {
        self.history.push_back(AlarmHistoryEntry {
            id: self.next_entry_id,
            key,
            value,
            fired_at_ms: now_ms,
            acknowledged: false,
        });
        self.next_entry_id += 1;
        while self.history.len() > self.policy.history_limit {
            self.history.pop_front();
        }
    }

    fn sync_tone(&mut self) {
        let should_sound = !self.state.active.is_empty() && !self.state.muted;
        self.tone.set_sounding(should_sound);
    }
}

impl std::fmt::Debug for AlarmSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmSupervisor")
            .field("active", &self.state.active)
            .field("muted", &self.state.muted)
            .field("history_len", &self.history.len())
            .finish()
    }
}
