use thiserror::Error;

use cronos_core::AlarmId;

/// Rejected rule or alarm parameters. Raised when a value is built, never
/// when it is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// Shift cycles need an interval of at least one day.
    #[error("Shift interval must be at least 1 day")]
    ZeroInterval,

    /// Weekday numbers run 0 (Sunday) to 6 (Saturday).
    #[error("Weekday out of range: {day} (expected 0-6, 0 = Sunday)")]
    WeekdayOutOfRange { day: u8 },

    /// A weekday rule with no days could never fire.
    #[error("Weekday set is empty")]
    EmptyWeekdaySet,

    #[error("Invalid time of day: {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },

    #[error("Invalid time format: {0:?} (expected HH:MM)")]
    InvalidTimeFormat(String),

    #[error("Invalid date: {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// An alarm or rule definition failed validation.
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// No alarm with the given ID is registered with the engine.
    #[error("Alarm not found: {id}")]
    AlarmNotFound { id: AlarmId },

    /// The alarm has a zero snooze duration, so it cannot be snoozed.
    #[error("Snooze is disabled for alarm {id}")]
    SnoozeDisabled { id: AlarmId },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
