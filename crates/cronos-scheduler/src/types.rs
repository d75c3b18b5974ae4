use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use cronos_core::AlarmId;

use crate::error::ConstructionError;
use crate::recurrence::RecurrenceRule;

pub const DEFAULT_SNOOZE_SECS: u32 = 300;
pub const DEFAULT_RING_SECS: u32 = 300;

/// Wall-clock time of day with minute precision, no timezone.
///
/// Serialised as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ConstructionError> {
        if hour > 23 || minute > 59 {
            return Err(ConstructionError::InvalidTime { hour, minute });
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn to_naive_time(self) -> NaiveTime {
        // Range was checked in `new`, so this always yields a time.
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or_default()
    }

    /// Combine with a calendar date into a full local datetime (seconds = 0).
    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.to_naive_time())
    }

    /// Does `now`, truncated to the minute, fall on this time of day?
    pub fn is_minute_of(&self, now: NaiveDateTime) -> bool {
        now.hour() == self.hour && now.minute() == self.minute
    }
}

impl FromStr for TimeOfDay {
    type Err = ConstructionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ConstructionError::InvalidTimeFormat(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(bad)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(bad());
        }
        let hour = h.parse().map_err(|_| bad())?;
        let minute = m.parse().map_err(|_| bad())?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ConstructionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate, ConstructionError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ConstructionError::InvalidDate(s.to_string()))
}

/// A user-defined alarm as seen by the engine (read-only snapshot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    /// Generated when absent from the source definition.
    #[serde(default)]
    pub id: AlarmId,
    #[serde(default)]
    pub label: String,
    pub time: TimeOfDay,
    /// Disabled alarms are never evaluated or projected.
    #[serde(default = "bool_true")]
    pub enabled: bool,
    pub rule: RecurrenceRule,
    /// Zero disables snoozing for this alarm.
    #[serde(default = "default_snooze_secs")]
    pub snooze_duration_secs: u32,
    /// How long a fired alarm rings before the shell auto-dismisses it.
    #[serde(default = "default_ring_secs")]
    pub ring_duration_secs: u32,
}

impl Alarm {
    pub fn new(time: TimeOfDay, rule: RecurrenceRule) -> Self {
        Self {
            id: AlarmId::new(),
            label: String::new(),
            time,
            enabled: true,
            rule,
            snooze_duration_secs: DEFAULT_SNOOZE_SECS,
            ring_duration_secs: DEFAULT_RING_SECS,
        }
    }

    pub fn with_id(mut self, id: impl Into<AlarmId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_snooze_secs(mut self, secs: u32) -> Self {
        self.snooze_duration_secs = secs;
        self
    }

    pub fn with_ring_secs(mut self, secs: u32) -> Self {
        self.ring_duration_secs = secs;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Full date-and-time check: enabled, right minute, eligible date.
    pub fn is_due_at(&self, now: NaiveDateTime) -> bool {
        self.enabled && self.time.is_minute_of(now) && self.rule.matches(now.date())
    }
}

fn bool_true() -> bool {
    true
}
fn default_snooze_secs() -> u32 {
    DEFAULT_SNOOZE_SECS
}
fn default_ring_secs() -> u32 {
    DEFAULT_RING_SECS
}

/// Why an alarm fired on a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireSource {
    /// Its recurrence rule matched the current minute.
    Schedule,
    /// A pending snooze came due.
    Snooze,
}

impl fmt::Display for FireSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FireSource::Schedule => "schedule",
            FireSource::Snooze => "snooze",
        };
        write!(f, "{s}")
    }
}

/// Emitted by the engine for every alarm that fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiredAlarm {
    pub alarm_id: AlarmId,
    pub label: String,
    pub source: FireSource,
    pub fired_at: NaiveDateTime,
    /// `fired_at + ring_duration_secs`; the shell stops ringing here.
    pub ring_until: NaiveDateTime,
    /// Whether the user may snooze this ring.
    pub snoozable: bool,
}

impl FiredAlarm {
    pub fn new(alarm: &Alarm, source: FireSource, fired_at: NaiveDateTime) -> Self {
        Self {
            alarm_id: alarm.id.clone(),
            label: alarm.label.clone(),
            source,
            fired_at,
            ring_until: fired_at + chrono::Duration::seconds(i64::from(alarm.ring_duration_secs)),
            snoozable: alarm.snooze_duration_secs > 0,
        }
    }
}
