use std::fmt;

use chrono::{Days, NaiveDateTime};
use tracing::debug;

use crate::types::Alarm;

/// Default search bound in days; long enough for any yearly rule to hit.
pub const PROJECTION_HORIZON_DAYS: u32 = 366;

/// Placeholder shown when no upcoming occurrence exists.
pub const NOT_FOUND_TEXT: &str = "---";
pub const DISABLED_TEXT: &str = "Disabled";

/// Compute the next local datetime strictly after `from` at which `alarm`
/// fires, scanning at most [`PROJECTION_HORIZON_DAYS`] days ahead.
///
/// Returns `None` (NotFound) for disabled alarms and when nothing in the
/// horizon matches, e.g. a `Once` rule whose date has passed.
pub fn next_occurrence(alarm: &Alarm, from: NaiveDateTime) -> Option<NaiveDateTime> {
    next_occurrence_within(alarm, from, PROJECTION_HORIZON_DAYS)
}

/// Same as [`next_occurrence`] with an explicit horizon.
///
/// Candidate dates run from `from.date()` to `from.date() + horizon_days`
/// inclusive, so the scan takes at most `horizon_days + 1` steps.
pub fn next_occurrence_within(
    alarm: &Alarm,
    from: NaiveDateTime,
    horizon_days: u32,
) -> Option<NaiveDateTime> {
    if !alarm.enabled {
        return None;
    }

    let start = from.date();
    for offset in 0..=horizon_days {
        let date = start.checked_add_days(Days::new(u64::from(offset)))?;
        let candidate = alarm.time.on(date);
        // Today's slot may already be behind us.
        if candidate <= from {
            continue;
        }
        if alarm.rule.matches(date) {
            return Some(candidate);
        }
    }

    debug!(alarm_id = %alarm.id, horizon_days, "no occurrence within horizon");
    None
}

/// Time left until an occurrence, broken into whole days, hours and minutes.
/// Seconds are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

impl Countdown {
    pub fn between(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        let total = to.signed_duration_since(from).num_minutes().max(0);
        Self {
            days: total / (24 * 60),
            hours: (total % (24 * 60)) / 60,
            minutes: total % 60,
        }
    }

    /// Non-zero units in descending order; minutes are kept when nothing
    /// larger is present, so the result is never empty.
    fn units(&self) -> Vec<(i64, &'static str, &'static str)> {
        let mut units = Vec::with_capacity(3);
        if self.days > 0 {
            units.push((self.days, "d", "day"));
        }
        if self.hours > 0 {
            units.push((self.hours, "h", "hour"));
        }
        if self.minutes > 0 || (self.days == 0 && self.hours == 0) {
            units.push((self.minutes, "m", "minute"));
        }
        units
    }

    /// Compact form: `"1d 3h 12m"`, `"5h"`, `"0m"`.
    pub fn compact(&self) -> String {
        self.units()
            .iter()
            .map(|(n, short, _)| format!("{n}{short}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Long form: `"1 day, 3 hours, and 12 minutes"`, `"2 hours and 1 minute"`.
impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .units()
            .iter()
            .map(|(n, _, name)| {
                let plural = if *n == 1 { "" } else { "s" };
                format!("{n} {name}{plural}")
            })
            .collect();

        match parts.as_slice() {
            [only] => write!(f, "{only}"),
            [first, last] => write!(f, "{first} and {last}"),
            [init @ .., last] => write!(f, "{}, and {last}", init.join(", ")),
            [] => Ok(()),
        }
    }
}

/// One-line preview for list displays: "Disabled", "---", or the compact
/// countdown to the next occurrence.
pub fn preview(alarm: &Alarm, from: NaiveDateTime) -> String {
    if !alarm.enabled {
        return DISABLED_TEXT.to_string();
    }
    match next_occurrence(alarm, from) {
        Some(next) => Countdown::between(from, next).compact(),
        None => NOT_FOUND_TEXT.to_string(),
    }
}
