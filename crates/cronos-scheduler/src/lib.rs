//! `cronos-scheduler`: recurrence evaluation, occurrence projection and
//! snooze handling for the Cronos alarm clock.
//!
//! # Overview
//!
//! [`RecurrenceRule::matches`] decides whether a calendar date is eligible.
//! [`schedule::next_occurrence`] scans forward day by day (bounded) to find
//! the next firing datetime for previews. [`SnoozeLedger`] holds pending
//! deferred wake-ups. [`engine::AlarmEngine`] ties them together on a 1 Hz
//! tick: a due snooze fires first, otherwise every alarm whose time is the
//! current minute and whose rule matches today is a candidate.
//!
//! # Rule variants
//!
//! | Variant                   | Matches                                        |
//! |---------------------------|------------------------------------------------|
//! | `Daily`                   | every date                                     |
//! | `Weekdays` / `Weekends`   | Mon–Fri / Sat–Sun                              |
//! | `OddDayOfMonth` / `Even…` | parity of the day number                       |
//! | `SpecificWeekdays`        | weekday in a set (0 = Sunday … 6 = Saturday)   |
//! | `Once`                    | exactly one date                               |
//! | `WeeklyOnSameWeekday`     | reference weekday, no lower bound              |
//! | `MonthlyOnSameDayOfMonth` | reference day number; short months skipped    |
//! | `YearlyOnSameDate`        | reference month and day                        |
//! | `ShiftCycle`              | every N days from the reference date onwards   |
//!
//! All evaluation is on local calendar dates; no timezone is involved.

pub mod clock;
pub mod engine;
pub mod error;
pub mod recurrence;
pub mod schedule;
pub mod snooze;
pub mod types;

pub use clock::{Clock, ManualClock, Now, SystemClock};
pub use engine::{AlarmEngine, AlarmHandle};
pub use error::{ConstructionError, Result, SchedulerError};
pub use recurrence::{RecurrenceRule, WeekdaySet};
pub use schedule::{next_occurrence, preview, Countdown};
pub use snooze::{SnoozeEntry, SnoozeLedger};
pub use types::{Alarm, FireSource, FiredAlarm, TimeOfDay};
