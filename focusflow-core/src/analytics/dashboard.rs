//! Overview statistics and the dashboard aggregate.

use super::health::{percent, HealthScore};
use super::streak::Streak;
use super::trend::TrendPoint;
use crate::types::{TaskStatus, TaskWithProject};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Counts across a user's projects and tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    // Projects
    pub total_projects: i64,
    pub active_projects: i64,
    pub completed_projects: i64,

    // Tasks
    pub total_tasks: i64,
    pub todo_tasks: i64,
    pub in_progress_tasks: i64,
    pub completed_tasks: i64,
    /// completed / total as a rounded percentage
    pub completion_rate: i64,

    // Streaks
    pub current_streak: i64,
    pub best_streak: i64,
}

impl OverviewStats {
    /// Assemble overview stats from project counts, per-status task counts
    /// and the streak.
    pub fn from_counts(
        total_projects: i64,
        active_projects: i64,
        completed_projects: i64,
        by_status: &HashMap<TaskStatus, i64>,
        streak: Streak,
    ) -> Self {
        let count = |status| by_status.get(&status).copied().unwrap_or(0);
        let total_tasks: i64 = by_status.values().sum();
        let completed_tasks = count(TaskStatus::Completed);

        Self {
            total_projects,
            active_projects,
            completed_projects,
            total_tasks,
            todo_tasks: count(TaskStatus::Todo),
            in_progress_tasks: count(TaskStatus::InProgress),
            completed_tasks,
            completion_rate: percent(completed_tasks, total_tasks),
            current_streak: streak.current,
            best_streak: streak.best,
        }
    }

    pub fn streak(&self) -> Streak {
        Streak {
            current: self.current_streak,
            best: self.best_streak,
        }
    }
}

/// Everything the dashboard shows, computed in one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub overview: OverviewStats,
    pub trend: Vec<TrendPoint>,
    pub health: HealthScore,
    pub recent_completed: Vec<TaskWithProject>,
    pub overdue_count: i64,
    pub upcoming_deadlines: Vec<TaskWithProject>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_counts_with_no_tasks() {
        let stats = OverviewStats::from_counts(0, 0, 0, &HashMap::new(), Streak::default());
        assert_eq!(stats.total_tasks, 0);
        assert_eq!(stats.completed_tasks, 0);
        assert_eq!(stats.completion_rate, 0);
    }

    #[test]
    fn test_from_counts_rounds_completion_rate() {
        let mut by_status = HashMap::new();
        by_status.insert(TaskStatus::Todo, 1);
        by_status.insert(TaskStatus::InProgress, 1);
        by_status.insert(TaskStatus::Completed, 1);

        let stats = OverviewStats::from_counts(
            2,
            1,
            1,
            &by_status,
            Streak {
                current: 2,
                best: 5,
            },
        );
        assert_eq!(stats.total_tasks, 3);
        assert_eq!(stats.in_progress_tasks, 1);
        assert_eq!(stats.completion_rate, 33);
        assert_eq!(stats.streak(), Streak { current: 2, best: 5 });
    }

    #[test]
    fn test_overview_serializes_camel_case() {
        let json = serde_json::to_value(OverviewStats::default()).unwrap();
        assert!(json.get("completionRate").is_some());
        assert!(json.get("inProgressTasks").is_some());
    }
}
