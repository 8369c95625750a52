//! Time utilities.
//!
//! Every store-assigned timestamp comes from a [`Clock`]. Production code uses
//! the system clock; tests drive a manual clock so that windows, cohorts and
//! calendar boundaries are reproducible.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::{Arc, Mutex};

/// Injectable time source.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    source: Source,
}

#[derive(Debug, Clone, Default)]
enum Source {
    #[default]
    System,
    Manual(Arc<Mutex<DateTime<Utc>>>),
}

impl Clock {
    /// Clock backed by `Utc::now()`
    pub fn system() -> Self {
        Self { source: Source::System }
    }

    /// Clock that only moves when told to
    pub fn manual(start: DateTime<Utc>) -> Self {
        Self {
            source: Source::Manual(Arc::new(Mutex::new(start))),
        }
    }

    /// Current instant
    pub fn now(&self) -> DateTime<Utc> {
        match &self.source {
            Source::System => Utc::now(),
            Source::Manual(at) => *at.lock().unwrap_or_else(|p| p.into_inner()),
        }
    }

    /// Move a manual clock to `at`. No effect on the system clock.
    pub fn set(&self, at: DateTime<Utc>) {
        if let Source::Manual(current) = &self.source {
            *current.lock().unwrap_or_else(|p| p.into_inner()) = at;
        }
    }

    /// Move a manual clock forward. No effect on the system clock.
    pub fn advance(&self, by: Duration) {
        if let Source::Manual(current) = &self.source {
            let mut guard = current.lock().unwrap_or_else(|p| p.into_inner());
            *guard += by;
        }
    }

    /// Whether this clock is manually driven
    pub fn is_manual(&self) -> bool {
        matches!(self.source, Source::Manual(_))
    }
}

/// Convert stored Unix milliseconds back into an instant
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Midnight (UTC) of the given calendar date
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

/// Last millisecond (UTC) of the given calendar date
pub fn day_end(date: NaiveDate) -> DateTime<Utc> {
    day_start(date) + Duration::days(1) - Duration::milliseconds(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_system_clock_moves() {
        let clock = Clock::system();
        assert!(!clock.is_manual());
        assert!(clock.now().timestamp() > 0);
    }

    #[test]
    fn test_manual_clock() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let clock = Clock::manual(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now().hour(), 13);
        assert_eq!(clock.now().minute(), 30);

        // Clones share the same instant
        let other = clock.clone();
        other.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_day_bounds() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        let start = day_start(date);
        let end = day_end(date);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap());
        assert_eq!((end - start).num_milliseconds(), 86_400_000 - 1);
        assert_eq!(from_millis(end.timestamp_millis()), end);
    }
}
