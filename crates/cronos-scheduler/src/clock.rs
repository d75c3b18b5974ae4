use std::sync::{Mutex, PoisonError};

use chrono::{Local, NaiveDateTime};

/// One reading of the clock: local wall time for rule evaluation plus an
/// epoch timestamp for snooze arithmetic, taken at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Now {
    pub local: NaiveDateTime,
    pub epoch_ms: i64,
}

impl Now {
    /// Reading for a fixed wall time, with the epoch derived as if local were UTC.
    pub fn at(local: NaiveDateTime) -> Self {
        Self {
            local,
            epoch_ms: local.and_utc().timestamp_millis(),
        }
    }
}

/// "Now" provider injected into the engine.
pub trait Clock: Send + Sync {
    fn now(&self) -> Now;
}

/// The device clock in its local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Now {
        let now = Local::now();
        Now {
            local: now.naive_local(),
            epoch_ms: now.timestamp_millis(),
        }
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn set(&self, to: NaiveDateTime) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Now {
        Now::at(*self.current.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn manual_clock_advances() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now().local, start);

        clock.advance(chrono::Duration::seconds(90));
        let now = clock.now();
        assert_eq!(now.local, start + chrono::Duration::seconds(90));
        assert_eq!(now.epoch_ms - Now::at(start).epoch_ms, 90_000);
    }
}
