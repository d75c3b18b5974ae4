//! Recurrence rules and the date-membership evaluator.
//!
//! A [`RecurrenceRule`] only answers "is this calendar date eligible?". The
//! caller is responsible for the time-of-day check (see [`crate::engine`]).
//! All arithmetic happens on [`NaiveDate`] values, i.e. local calendar dates
//! with no time component, so DST transitions can never shift a day count.

use std::fmt;
use std::num::NonZeroU32;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ConstructionError;

const WEEKDAY_ABBREV: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Weekday number with Sunday first: 0 = Sunday … 6 = Saturday.
pub fn weekday_number(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

/// A non-empty set of weekdays, stored as a 7-bit mask (bit 0 = Sunday).
///
/// Serialised as a sorted array of weekday numbers, e.g. `[1, 3, 5]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    const FULL: u8 = 0b0111_1111;

    /// Build a set from Sunday-first weekday numbers. Duplicates are ignored.
    pub fn new(days: impl IntoIterator<Item = u8>) -> Result<Self, ConstructionError> {
        let mut mask = 0u8;
        for day in days {
            if day > 6 {
                return Err(ConstructionError::WeekdayOutOfRange { day });
            }
            mask |= 1 << day;
        }
        if mask == 0 {
            return Err(ConstructionError::EmptyWeekdaySet);
        }
        Ok(Self(mask))
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0 & (1 << weekday_number(weekday)) != 0
    }

    /// Member weekday numbers in ascending order.
    pub fn days(&self) -> impl Iterator<Item = u8> + '_ {
        (0..7u8).filter(move |d| self.0 & (1 << d) != 0)
    }

    pub fn is_full(&self) -> bool {
        self.0 == Self::FULL
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = ConstructionError;

    fn try_from(days: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(days)
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.days().collect()
    }
}

impl fmt::Debug for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.days()).finish()
    }
}

/// When an alarm is active, as a closed set of recurrence kinds.
///
/// Every payload type enforces its own invariants (non-empty weekday set,
/// non-zero interval), so any value of this type evaluates consistently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecurrenceRule {
    /// Every date.
    Daily,

    /// Monday to Friday.
    Weekdays,

    /// Saturday and Sunday.
    Weekends,

    /// Odd calendar day numbers (1, 3, … 31), regardless of month length.
    OddDayOfMonth,

    /// Even calendar day numbers (2, 4, … 30).
    EvenDayOfMonth,

    /// Any weekday in the set.
    SpecificWeekdays { days: WeekdaySet },

    /// Exactly one calendar date.
    Once { reference_date: NaiveDate },

    /// The reference date's weekday, every week. There is no lower bound:
    /// weeks before `reference_date` match too.
    WeeklyOnSameWeekday { reference_date: NaiveDate },

    /// The reference date's day of month. Months too short to contain that
    /// day are skipped, not clamped to their last day.
    MonthlyOnSameDayOfMonth { reference_date: NaiveDate },

    /// The reference date's month and day, every year.
    YearlyOnSameDate { reference_date: NaiveDate },

    /// Every `interval_days` days starting at `reference_date` (inclusive).
    /// Never matches before the reference date.
    ShiftCycle {
        reference_date: NaiveDate,
        interval_days: NonZeroU32,
    },
}

impl RecurrenceRule {
    pub fn specific_weekdays(
        days: impl IntoIterator<Item = u8>,
    ) -> Result<Self, ConstructionError> {
        Ok(Self::SpecificWeekdays {
            days: WeekdaySet::new(days)?,
        })
    }

    pub fn shift_cycle(
        reference_date: NaiveDate,
        interval_days: u32,
    ) -> Result<Self, ConstructionError> {
        let interval_days = NonZeroU32::new(interval_days).ok_or(ConstructionError::ZeroInterval)?;
        Ok(Self::ShiftCycle {
            reference_date,
            interval_days,
        })
    }

    /// Does this rule make `date` an eligible day?
    ///
    /// Pure and total: no clock reads, no failure cases.
    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            RecurrenceRule::Daily => true,
            RecurrenceRule::Weekdays => !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
            RecurrenceRule::Weekends => matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
            RecurrenceRule::OddDayOfMonth => date.day() % 2 != 0,
            RecurrenceRule::EvenDayOfMonth => date.day() % 2 == 0,
            RecurrenceRule::SpecificWeekdays { days } => days.contains(date.weekday()),
            RecurrenceRule::Once { reference_date } => date == *reference_date,
            RecurrenceRule::WeeklyOnSameWeekday { reference_date } => {
                date.weekday() == reference_date.weekday()
            }
            RecurrenceRule::MonthlyOnSameDayOfMonth { reference_date } => {
                date.day() == reference_date.day()
            }
            RecurrenceRule::YearlyOnSameDate { reference_date } => {
                date.day() == reference_date.day() && date.month() == reference_date.month()
            }
            RecurrenceRule::ShiftCycle {
                reference_date,
                interval_days,
            } => {
                // Calendar-date difference: immune to DST, always whole days.
                let diff = date.signed_duration_since(*reference_date).num_days();
                diff >= 0 && diff % i64::from(interval_days.get()) == 0
            }
        }
    }
}

/// Short human description, e.g. "Weekdays" or "Shift every 2d from 2024-01-01".
impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceRule::Daily => write!(f, "Daily"),
            RecurrenceRule::Weekdays => write!(f, "Weekdays"),
            RecurrenceRule::Weekends => write!(f, "Weekends"),
            RecurrenceRule::OddDayOfMonth => write!(f, "Odd days"),
            RecurrenceRule::EvenDayOfMonth => write!(f, "Even days"),
            RecurrenceRule::SpecificWeekdays { days } if days.is_full() => write!(f, "Daily"),
            RecurrenceRule::SpecificWeekdays { days } => {
                let names: Vec<&str> = days.days().map(|d| WEEKDAY_ABBREV[d as usize]).collect();
                write!(f, "{}", names.join(", "))
            }
            RecurrenceRule::Once { reference_date } => write!(f, "Once on {reference_date}"),
            RecurrenceRule::WeeklyOnSameWeekday { reference_date } => {
                let day = weekday_number(reference_date.weekday());
                write!(f, "Weekly on {}", WEEKDAY_ABBREV[day as usize])
            }
            RecurrenceRule::MonthlyOnSameDayOfMonth { reference_date } => {
                write!(f, "Monthly on day {}", reference_date.day())
            }
            RecurrenceRule::YearlyOnSameDate { reference_date } => {
                write!(f, "Yearly on {}", reference_date.format("%b %-d"))
            }
            RecurrenceRule::ShiftCycle {
                reference_date,
                interval_days,
            } => write!(f, "Shift every {interval_days}d from {reference_date}"),
        }
    }
}
