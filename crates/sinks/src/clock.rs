//! Time source for timestamps, rollover and retention age
//!
//! Production code uses [`SystemClock`]. Tests drive a [`ManualClock`] to
//! cross day boundaries without waiting.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Source of the current time
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current instant in local time (used for file names and `logTime`)
    fn now(&self) -> DateTime<Local> {
        self.now_utc().with_timezone(&Local)
    }

    /// Local calendar date
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// UTC calendar date (used for retention age)
    fn today_utc(&self) -> NaiveDate {
        self.now_utc().date_naive()
    }
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

impl SystemClock {
    /// Shared handle to the wall clock
    pub fn shared() -> SharedClock {
        Arc::new(SystemClock)
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Clock frozen at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock frozen at noon UTC of `date`
    pub fn on_date(date: NaiveDate) -> Self {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
        Self::new(Utc.from_utc_datetime(&noon))
    }

    /// Move the clock to `now`
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Move the clock forward
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock();
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_dates() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let clock = ManualClock::on_date(date);
        assert_eq!(clock.today_utc(), date);

        clock.advance(TimeDelta::days(1));
        assert_eq!(
            clock.today_utc(),
            NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
        );
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::on_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let later = Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap();
        clock.set(later);
        assert_eq!(clock.now_utc(), later);
        assert_eq!(clock.now(), later.with_timezone(&Local));
    }

    #[test]
    fn test_system_clock_moves() {
        let clock = SystemClock;
        let a = clock.now_utc();
        let b = clock.now_utc();
        assert!(b >= a);
    }
}
