//! Consecutive-day completion streaks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Current and best run of consecutive days with at least one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub current: i64,
    pub best: i64,
}

/// Calculate streaks from the dates on which completions happened.
///
/// `dates` may be unsorted and contain duplicates. The current streak is
/// alive only if the latest active date is `today` or the day before.
pub fn calculate_streak(dates: &[NaiveDate], today: NaiveDate) -> Streak {
    let mut days: Vec<NaiveDate> = dates.to_vec();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let Some(&latest) = days.first() else {
        return Streak::default();
    };

    let mut current = 0i64;
    if (today - latest).num_days() <= 1 {
        current = 1;
        for pair in days.windows(2) {
            if (pair[0] - pair[1]).num_days() == 1 {
                current += 1;
            } else {
                break;
            }
        }
    }

    let mut best = 1i64;
    let mut run = 1i64;
    for pair in days.windows(2) {
        if (pair[0] - pair[1]).num_days() == 1 {
            run += 1;
            best = best.max(run);
        } else {
            run = 1;
        }
    }

    Streak {
        current,
        best: best.max(current),
    }
}
