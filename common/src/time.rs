//! Time utilities for Mi Plata.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use parking_lot::RwLock;

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Calendar-month difference between two timestamps.
///
/// Only year and month are compared, so Jan 31 to Feb 1 is one month and
/// Feb 1 to Feb 28 is zero. Negative when `to` is before `from`.
pub fn months_between(from: Timestamp, to: Timestamp) -> i64 {
    let years = i64::from(to.year()) - i64::from(from.year());
    let months = i64::from(to.month()) - i64::from(from.month());
    years * 12 + months
}

/// Source of the current time for account rules.
pub trait Clock: Send + Sync {
    /// Current timestamp.
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<RwLock<Timestamp>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Arc::new(RwLock::new(start)),
        }
    }

    /// Jump to a specific timestamp.
    pub fn set(&self, at: Timestamp) {
        *self.current.write() = at;
    }

    /// Move forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        *self.current.write() += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_months_between_uses_calendar_months() {
        assert_eq!(months_between(at(2024, 1, 31), at(2024, 2, 1)), 1);
        assert_eq!(months_between(at(2024, 2, 1), at(2024, 2, 28)), 0);
        assert_eq!(months_between(at(2023, 11, 15), at(2024, 2, 15)), 3);
        assert_eq!(months_between(at(2024, 5, 1), at(2024, 3, 1)), -2);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(at(2024, 1, 1));
        assert_eq!(clock.now(), at(2024, 1, 1));

        clock.advance(Duration::days(31));
        assert_eq!(clock.now(), at(2024, 2, 1));

        clock.set(at(2025, 6, 1));
        assert_eq!(clock.now(), at(2025, 6, 1));
    }

    #[test]
    fn test_system_clock_moves() {
        let before = now();
        assert!(SystemClock.now() >= before);
    }
}
