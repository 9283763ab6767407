//! Composite goal-health score.
//!
//! | Component | Weight | Source |
//! |-----------|--------|--------|
//! | consistency | 0.30 | share of the last 14 days with a completion |
//! | completion | 0.30 | overview completion rate |
//! | on-time | 0.25 | share of dated tasks that are not overdue |
//! | active projects | 0.15 | workload balance heuristic |

use super::dashboard::OverviewStats;
use super::trend::TrendPoint;
use serde::{Deserialize, Serialize};

/// Days of trend used for the consistency component.
pub const CONSISTENCY_WINDOW_DAYS: u32 = 14;

const CONSISTENCY_WEIGHT: f64 = 0.30;
const COMPLETION_WEIGHT: f64 = 0.30;
const ON_TIME_WEIGHT: f64 = 0.25;
const ACTIVE_PROJECTS_WEIGHT: f64 = 0.15;

/// Overall score and its four components, each 0..=100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthScore {
    pub overall: i64,
    pub breakdown: HealthBreakdown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthBreakdown {
    pub consistency: i64,
    pub completion: i64,
    pub on_time: i64,
    pub active_projects: i64,
}

impl HealthScore {
    pub fn from_breakdown(breakdown: HealthBreakdown) -> Self {
        let weighted = breakdown.consistency as f64 * CONSISTENCY_WEIGHT
            + breakdown.completion as f64 * COMPLETION_WEIGHT
            + breakdown.on_time as f64 * ON_TIME_WEIGHT
            + breakdown.active_projects as f64 * ACTIVE_PROJECTS_WEIGHT;

        Self {
            overall: (weighted.round() as i64).clamp(0, 100),
            breakdown,
        }
    }
}

/// Rounded percentage, 0 when `total` is 0.
pub fn percent(part: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round().clamp(0.0, 100.0) as i64
}

/// Percentage of trend days with at least one completion.
pub fn consistency_score(trend: &[TrendPoint]) -> i64 {
    let active = trend.iter().filter(|p| p.count > 0).count() as i64;
    percent(active, trend.len() as i64)
}

/// Percentage of dated tasks that are not overdue; 100 with no dated tasks.
pub fn on_time_score(with_due_date: i64, overdue: i64) -> i64 {
    if with_due_date <= 0 {
        return 100;
    }
    percent((with_due_date - overdue).max(0), with_due_date)
}

/// Workload balance. 0 when the user has no projects.
pub fn active_project_score(stats: &OverviewStats) -> i64 {
    if stats.total_projects == 0 {
        return 0;
    }

    let mut score = 50;
    if stats.in_progress_tasks > 0 {
        score += 25;
    }
    if stats.in_progress_tasks <= stats.total_projects * 5 {
        score += 15;
    }
    if stats.todo_tasks > 0 {
        score += 10;
    }
    score.min(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn overview(projects: i64, todo: i64, in_progress: i64) -> OverviewStats {
        OverviewStats {
            total_projects: projects,
            todo_tasks: todo,
            in_progress_tasks: in_progress,
            total_tasks: todo + in_progress,
            ..Default::default()
        }
    }

    #[test]
    fn test_percent_handles_zero_total() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(5, 5), 100);
    }

    #[test]
    fn test_consistency_score() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let trend: Vec<TrendPoint> = start
            .iter_days()
            .take(14)
            .enumerate()
            .map(|(i, date)| TrendPoint {
                date,
                count: if i % 2 == 0 { 1 } else { 0 },
            })
            .collect();
        assert_eq!(consistency_score(&trend), 50);
        assert_eq!(consistency_score(&[]), 0);
    }

    #[test]
    fn test_on_time_score() {
        assert_eq!(on_time_score(0, 0), 100);
        assert_eq!(on_time_score(4, 1), 75);
        assert_eq!(on_time_score(4, 4), 0);
    }

    #[test]
    fn test_active_project_score() {
        assert_eq!(active_project_score(&overview(0, 3, 1)), 0);
        // 50 + 25 + 15 + 10
        assert_eq!(active_project_score(&overview(1, 1, 1)), 100);
        // Overloaded: 6 in progress for 1 project
        assert_eq!(active_project_score(&overview(1, 0, 6)), 75);
        // Nothing started, nothing planned
        assert_eq!(active_project_score(&overview(2, 0, 0)), 65);
    }

    #[test]
    fn test_overall_is_weighted_and_bounded() {
        let score = HealthScore::from_breakdown(HealthBreakdown {
            consistency: 50,
            completion: 40,
            on_time: 100,
            active_projects: 75,
        });
        // 15 + 12 + 25 + 11.25
        assert_eq!(score.overall, 63);

        let max = HealthScore::from_breakdown(HealthBreakdown {
            consistency: 100,
            completion: 100,
            on_time: 100,
            active_projects: 100,
        });
        assert_eq!(max.overall, 100);
    }
}
