//! Calendar-day bucketing of timestamps.
//!
//! All bucketing uses the server-local calendar date of each timestamp.

use crate::clock::local_date;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One day of the completion trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub count: i64,
}

/// Activity for one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayActivity {
    pub day: String,
    pub completed: i64,
    pub created: i64,
}

/// Dense daily counts for `[today - days + 1, today]`, oldest first.
///
/// Timestamps outside the window are ignored.
pub fn completion_trend(timestamps: &[DateTime<Utc>], today: NaiveDate, days: u32) -> Vec<TrendPoint> {
    let start = today - Duration::days(i64::from(days) - 1);

    let mut counts: HashMap<NaiveDate, i64> = HashMap::new();
    for ts in timestamps {
        let date = local_date(*ts);
        if date >= start && date <= today {
            *counts.entry(date).or_insert(0) += 1;
        }
    }

    start
        .iter_days()
        .take(days as usize)
        .map(|date| TrendPoint {
            date,
            count: counts.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

/// Sparse map from ISO date to number of timestamps on that date.
pub fn activity_heatmap(timestamps: &[DateTime<Utc>]) -> BTreeMap<String, i64> {
    let mut map = BTreeMap::new();
    for ts in timestamps {
        let key = local_date(*ts).format("%Y-%m-%d").to_string();
        *map.entry(key).or_insert(0) += 1;
    }
    map
}

/// Distinct local dates of the given timestamps.
pub fn distinct_dates(timestamps: &[DateTime<Utc>]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = timestamps.iter().map(|ts| local_date(*ts)).collect();
    dates.sort_unstable();
    dates.dedup();
    dates
}

/// Completions and creations per weekday, Monday first.
pub fn productivity_by_day(
    completions: &[DateTime<Utc>],
    creations: &[DateTime<Utc>],
) -> Vec<WeekdayActivity> {
    let mut completed = [0i64; 7];
    let mut created = [0i64; 7];
    for ts in completions {
        completed[local_date(*ts).weekday().num_days_from_monday() as usize] += 1;
    }
    for ts in creations {
        created[local_date(*ts).weekday().num_days_from_monday() as usize] += 1;
    }

    WEEKDAYS
        .iter()
        .enumerate()
        .map(|(i, day)| WeekdayActivity {
            day: weekday_name(*day).to_string(),
            completed: completed[i],
            created: created[i],
        })
        .collect()
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
