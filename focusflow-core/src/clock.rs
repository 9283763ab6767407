//! Time source abstraction.
//!
//! Analytics buckets events by the server's local calendar date and the
//! planner schedules due dates from "now", so both take an injected
//! [`Clock`] instead of reading the wall clock directly.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use std::sync::Mutex;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Today's date in the server's local timezone.
    fn today(&self) -> NaiveDate {
        local_date(self.now())
    }
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// A clock pinned to local noon of `date`.
    pub fn at_local_noon(date: NaiveDate) -> Self {
        Self::new(local_at(date, 12, 0))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Local calendar date of an instant.
pub fn local_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&Local).date_naive()
}

/// The instant local midnight begins on `date`.
pub fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // Midnight skipped by a DST jump: fall back to treating it as UTC
        .unwrap_or_else(|| naive.and_utc())
}

/// The instant at `hour:minute` local time on `date`.
pub fn local_at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let naive = date.and_time(time);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let clock = ManualClock::at_local_noon(date);
        assert_eq!(clock.today(), date);

        clock.advance(chrono::Duration::days(2));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 12).unwrap());
    }

    #[test]
    fn test_local_midnight_round_trips_to_same_date() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(local_date(local_midnight(date)), date);
        assert_eq!(local_date(local_at(date, 23, 59)), date);
    }
}
