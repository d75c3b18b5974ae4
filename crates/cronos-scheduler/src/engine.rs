use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDateTime, Timelike};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use cronos_core::config::{EngineConfig, FireMode};
use cronos_core::AlarmId;

use crate::{
    clock::{Clock, Now},
    error::{Result, SchedulerError},
    schedule::next_occurrence_within,
    snooze::{SnoozeEntry, SnoozeLedger},
    types::{Alarm, FireSource, FiredAlarm},
};

/// Everything the tick loop and the action handlers share. Guarded by one
/// mutex so a snooze can never race a tick.
#[derive(Debug, Default)]
struct EngineState {
    alarms: Vec<Alarm>,
    snoozes: SnoozeLedger,
    /// Latest minute (seconds zeroed) in which each alarm was handled by rule
    /// evaluation. An alarm only fires again in a strictly later minute, so
    /// ticking at 1 Hz or the wall clock stepping back cannot repeat a ring.
    last_handled: HashMap<AlarmId, NaiveDateTime>,
}

/// Shared handle for alarm management (edit/toggle/snooze) while the engine
/// loop runs. Cheap to clone.
#[derive(Clone)]
pub struct AlarmHandle {
    state: Arc<Mutex<EngineState>>,
    horizon_days: u32,
}

impl AlarmHandle {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        // State is plain data; a panic elsewhere cannot leave it half-written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new alarm or replace the one with the same ID.
    /// Returns `true` when an existing alarm was replaced.
    pub fn upsert_alarm(&self, alarm: Alarm) -> bool {
        let mut state = self.lock();
        if !alarm.enabled {
            state.snoozes.clear(&alarm.id);
        }
        match state.alarms.iter_mut().find(|a| a.id == alarm.id) {
            Some(existing) => {
                info!(alarm_id = %alarm.id, rule = %alarm.rule, "alarm updated");
                *existing = alarm;
                true
            }
            None => {
                info!(alarm_id = %alarm.id, rule = %alarm.rule, "alarm added");
                state.alarms.push(alarm);
                false
            }
        }
    }

    /// Remove an alarm and any snooze it had pending.
    pub fn remove_alarm(&self, id: &AlarmId) -> Result<Alarm> {
        let mut state = self.lock();
        let idx = state
            .alarms
            .iter()
            .position(|a| &a.id == id)
            .ok_or_else(|| SchedulerError::AlarmNotFound { id: id.clone() })?;
        state.snoozes.clear(id);
        state.last_handled.remove(id);
        info!(alarm_id = %id, "alarm removed");
        Ok(state.alarms.remove(idx))
    }

    /// Enable or disable an alarm. Disabling discards its pending snooze.
    pub fn set_enabled(&self, id: &AlarmId, enabled: bool) -> Result<()> {
        let mut state = self.lock();
        let alarm = state
            .alarms
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| SchedulerError::AlarmNotFound { id: id.clone() })?;
        alarm.enabled = enabled;
        if !enabled {
            state.snoozes.clear(id);
        }
        info!(alarm_id = %id, enabled, "alarm toggled");
        Ok(())
    }

    /// Defer a ringing alarm by its snooze duration.
    ///
    /// Returns the wake-at instant in epoch milliseconds. Fails with
    /// `SnoozeDisabled` for disabled alarms and alarms whose snooze duration
    /// is zero.
    pub fn snooze(&self, id: &AlarmId, now: Now) -> Result<i64> {
        let mut state = self.lock();
        let alarm = state
            .alarms
            .iter()
            .find(|a| &a.id == id)
            .ok_or_else(|| SchedulerError::AlarmNotFound { id: id.clone() })?;
        if !alarm.enabled || alarm.snooze_duration_secs == 0 {
            return Err(SchedulerError::SnoozeDisabled { id: id.clone() });
        }
        let duration = alarm.snooze_duration_secs;
        Ok(state.snoozes.snooze(id, duration, now.epoch_ms))
    }

    pub fn alarms(&self) -> Vec<Alarm> {
        self.lock().alarms.clone()
    }

    pub fn get(&self, id: &AlarmId) -> Option<Alarm> {
        self.lock().alarms.iter().find(|a| &a.id == id).cloned()
    }

    pub fn pending_snoozes(&self) -> Vec<SnoozeEntry> {
        self.lock().snoozes.entries().to_vec()
    }

    /// Next occurrence of one alarm strictly after `from`; `Ok(None)` when
    /// nothing falls inside the projection horizon or the alarm is disabled.
    pub fn next_occurrence(
        &self,
        id: &AlarmId,
        from: NaiveDateTime,
    ) -> Result<Option<NaiveDateTime>> {
        let alarm = self
            .get(id)
            .ok_or_else(|| SchedulerError::AlarmNotFound { id: id.clone() })?;
        Ok(next_occurrence_within(&alarm, from, self.horizon_days))
    }
}

/// Orchestrator: decides once per tick which alarms fire.
pub struct AlarmEngine {
    handle: AlarmHandle,
    fire_mode: FireMode,
    tick_interval: std::time::Duration,
    /// If set, fired alarms are sent here for the shell to ring.
    fired_tx: Option<mpsc::Sender<FiredAlarm>>,
}

impl AlarmEngine {
    /// Create an engine over an initial alarm list.
    ///
    /// Pass `Some(tx)` to receive every [`FiredAlarm`] via mpsc. The sender
    /// is non-blocking (`try_send`) so the tick loop is never stalled.
    pub fn new(
        alarms: Vec<Alarm>,
        config: &EngineConfig,
        fired_tx: Option<mpsc::Sender<FiredAlarm>>,
    ) -> Self {
        let state = EngineState {
            alarms,
            ..EngineState::default()
        };
        Self {
            handle: AlarmHandle {
                state: Arc::new(Mutex::new(state)),
                horizon_days: config.horizon_days,
            },
            fire_mode: config.fire_mode,
            tick_interval: std::time::Duration::from_millis(config.tick_interval_ms.max(1)),
            fired_tx,
        }
    }

    pub fn handle(&self) -> AlarmHandle {
        self.handle.clone()
    }

    /// Evaluate one tick at `now` and return the alarms that fire.
    ///
    /// A due snooze takes priority: its alarm fires alone and rule evaluation
    /// is skipped for this tick. Otherwise every enabled alarm whose time is
    /// `now`'s minute and whose rule matches today is a candidate; with
    /// [`FireMode::First`] only the first in list order rings, but all
    /// candidates count as handled for the minute.
    pub fn tick(&self, now: Now) -> Vec<FiredAlarm> {
        let fired = {
            let mut state = self.handle.lock();
            match Self::take_due_snooze(&mut state, now) {
                Some(fired) => vec![fired],
                None => self.evaluate_rules(&mut state, now.local),
            }
        };

        for alarm in &fired {
            info!(
                alarm_id = %alarm.alarm_id,
                label = %alarm.label,
                source = %alarm.source,
                at = %alarm.fired_at,
                "alarm fired"
            );
            if let Some(ref tx) = self.fired_tx {
                // try_send never blocks the tick loop; log a warning if the channel is full.
                if tx.try_send(alarm.clone()).is_err() {
                    warn!(
                        alarm_id = %alarm.alarm_id,
                        "delivery channel full or closed, alarm dropped"
                    );
                }
            }
        }
        fired
    }

    /// Main event loop. Ticks on the configured interval until `shutdown`
    /// broadcasts `true`.
    pub async fn run(self, clock: Arc<dyn Clock>, mut shutdown: watch::Receiver<bool>) {
        info!(
            alarms = self.handle.lock().alarms.len(),
            interval_ms = self.tick_interval.as_millis() as u64,
            "alarm engine started"
        );

        let mut interval = tokio::time::interval(self.tick_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(clock.now());
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("alarm engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    // --- private helpers ---------------------------------------------------

    /// Removing or disabling an alarm clears its snooze under the same lock,
    /// so every due entry belongs to an enabled alarm.
    fn take_due_snooze(state: &mut EngineState, now: Now) -> Option<FiredAlarm> {
        let id = state.snoozes.consume_due(now.epoch_ms)?;
        let alarm = state.alarms.iter().find(|a| a.id == id && a.enabled)?;
        Some(FiredAlarm::new(alarm, FireSource::Snooze, now.local))
    }

    fn evaluate_rules(&self, state: &mut EngineState, now: NaiveDateTime) -> Vec<FiredAlarm> {
        let minute = truncate_to_minute(now);

        let candidates: Vec<&Alarm> = state
            .alarms
            .iter()
            .filter(|a| a.is_due_at(now))
            .filter(|a| !matches!(state.last_handled.get(&a.id), Some(last) if *last >= minute))
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }
        debug!(count = candidates.len(), %minute, "alarms matched");

        let limit = match self.fire_mode {
            FireMode::First => 1,
            FireMode::All => candidates.len(),
        };
        let fired: Vec<FiredAlarm> = candidates
            .iter()
            .take(limit)
            .map(|a| FiredAlarm::new(a, FireSource::Schedule, now))
            .collect();
        let handled: Vec<AlarmId> = candidates.iter().map(|a| a.id.clone()).collect();

        for id in handled {
            state.last_handled.insert(id, minute);
        }
        fired
    }
}

fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}
