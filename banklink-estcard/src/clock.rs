//! Wall clock used to stamp requests.

use std::fmt::Debug;

use chrono::{Local, NaiveDateTime};

/// `datetime` field layout.
pub const DATETIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Source of the local time written into requests.
pub trait Clock: Debug + Send + Sync {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;

    /// Current time in the `YYYYMMDDhhmmss` layout.
    fn timestamp(&self) -> String {
        self.now().format(DATETIME_FORMAT).to_string()
    }
}

/// The system clock in the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock stopped at a fixed instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_timestamp_layout() {
        let instant = NaiveDate::from_ymd_opt(2026, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 1)
            .unwrap();
        assert_eq!(FixedClock(instant).timestamp(), "20260307090501");
    }

    #[test]
    fn test_local_clock_is_fourteen_digits() {
        let stamp = LocalClock.timestamp();
        assert_eq!(stamp.len(), 14);
        assert!(stamp.bytes().all(|b| b.is_ascii_digit()));
    }
}
