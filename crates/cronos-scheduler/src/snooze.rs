use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cronos_core::AlarmId;

/// A pending deferred wake-up for one alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnoozeEntry {
    pub alarm_id: AlarmId,
    /// Epoch milliseconds at or after which the alarm fires again.
    pub wake_at_ms: i64,
}

/// Pending snoozes, at most one per alarm.
///
/// Entries are kept in insertion order. When several are due at once,
/// [`SnoozeLedger::consume_due`] takes the earliest inserted one; snoozing an
/// alarm again replaces its entry and moves it to the back.
#[derive(Debug, Clone, Default)]
pub struct SnoozeLedger {
    entries: Vec<SnoozeEntry>,
}

impl SnoozeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `alarm_id` to fire again `duration_secs` after `now_ms`.
    /// Any previous pending entry for the same alarm is dropped.
    ///
    /// Returns the wake-at instant in epoch milliseconds.
    pub fn snooze(&mut self, alarm_id: &AlarmId, duration_secs: u32, now_ms: i64) -> i64 {
        let wake_at_ms = now_ms.saturating_add(i64::from(duration_secs) * 1_000);
        let replaced = self.remove(alarm_id);
        self.entries.push(SnoozeEntry {
            alarm_id: alarm_id.clone(),
            wake_at_ms,
        });
        info!(alarm_id = %alarm_id, wake_at_ms, replaced, "snooze scheduled");
        wake_at_ms
    }

    /// Remove and return the first entry whose wake time has arrived.
    /// At most one entry is consumed per call.
    pub fn consume_due(&mut self, now_ms: i64) -> Option<AlarmId> {
        let idx = self.entries.iter().position(|e| e.wake_at_ms <= now_ms)?;
        let entry = self.entries.remove(idx);
        info!(alarm_id = %entry.alarm_id, wake_at_ms = entry.wake_at_ms, "snooze consumed");
        Some(entry.alarm_id)
    }

    /// Drop any pending entry for `alarm_id`. Returns whether one existed.
    pub fn clear(&mut self, alarm_id: &AlarmId) -> bool {
        let removed = self.remove(alarm_id);
        if removed {
            info!(alarm_id = %alarm_id, "snooze cleared");
        }
        removed
    }

    pub fn get(&self, alarm_id: &AlarmId) -> Option<&SnoozeEntry> {
        self.entries.iter().find(|e| &e.alarm_id == alarm_id)
    }

    pub fn entries(&self) -> &[SnoozeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove(&mut self, alarm_id: &AlarmId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.alarm_id != alarm_id);
        let removed = self.entries.len() < before;
        if removed {
            debug!(alarm_id = %alarm_id, "previous snooze entry removed");
        }
        removed
    }
}
