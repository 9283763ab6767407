//! Task normalization and deadline distribution for generated plans.

use crate::tracker::{truncate_chars, MAX_TITLE_LEN};
use crate::types::{PlannedTask, Priority};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// Title used when a generated task has none.
pub const UNTITLED_TASK: &str = "Untitled Task";

/// Lower bound on the compression applied to fit a deadline.
pub const MIN_SCALE_FACTOR: f64 = 0.1;

/// Largest estimate accepted from a model; anything above falls back to the
/// priority default.
pub const MAX_ESTIMATED_DAYS: u32 = 365;

/// A plan task before due dates are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub estimated_days: u32,
}

impl DraftTask {
    fn new(title: &str, description: &str, priority: Priority, estimated_days: u32) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            priority,
            estimated_days,
        }
    }
}

/// Coerce one task object from a model response into a [`DraftTask`].
///
/// Blank titles become "Untitled Task" and long ones are cut to
/// [`MAX_TITLE_LEN`] characters. Unknown priorities become MEDIUM. A missing,
/// zero or out-of-range estimate falls back to the priority default.
pub fn normalize_task(value: &Value) -> DraftTask {
    let title = value
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED_TASK);
    let title = truncate_chars(title, MAX_TITLE_LEN);
    let description = value
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let priority = value
        .get("priority")
        .and_then(Value::as_str)
        .and_then(|p| p.parse::<Priority>().ok())
        .unwrap_or(Priority::Medium);
    let estimated_days = value
        .get("estimatedDays")
        .and_then(estimate_from_json)
        .filter(|days| (1..=MAX_ESTIMATED_DAYS).contains(days))
        .unwrap_or_else(|| priority.default_estimated_days());

    DraftTask::new(&title, description, priority, estimated_days)
}

fn estimate_from_json(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f.round() as u64))
            .and_then(|days| u32::try_from(days).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The generic six-task plan used whenever generation fails.
pub fn fallback_tasks() -> Vec<DraftTask> {
    vec![
        DraftTask::new(
            "Research and Planning",
            "Gather information and create a detailed plan",
            Priority::High,
            7,
        ),
        DraftTask::new(
            "Setup and Preparation",
            "Set up necessary tools and environment",
            Priority::Medium,
            3,
        ),
        DraftTask::new(
            "Implementation Phase 1",
            "Begin the main work",
            Priority::High,
            10,
        ),
        DraftTask::new(
            "Testing and Review",
            "Test and review the work done",
            Priority::Medium,
            5,
        ),
        DraftTask::new(
            "Final Adjustments",
            "Make final improvements",
            Priority::Low,
            2,
        ),
        DraftTask::new(
            "Completion and Documentation",
            "Finalize and document the project",
            Priority::Medium,
            3,
        ),
    ]
}

/// Assign due dates to tasks in order, starting from `now`.
///
/// Without a deadline each due date is `now` plus the running total of
/// estimates. With a deadline the estimates are scaled to the days
/// available (never below [`MIN_SCALE_FACTOR`], never below one day per
/// task) and due dates are clamped to the deadline. A deadline that is not
/// in the future makes every task due `now`. Due dates stop advancing at
/// the end of the representable calendar instead of overflowing.
pub fn distribute_deadlines(
    tasks: Vec<DraftTask>,
    now: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
) -> Vec<PlannedTask> {
    let Some(deadline) = deadline else {
        let mut current = now;
        return tasks
            .into_iter()
            .map(|task| {
                current = advance(current, task.estimated_days);
                planned(task, current, None)
            })
            .collect();
    };

    let available_days = available_days(now, deadline);
    if available_days <= 0 {
        return tasks
            .into_iter()
            .map(|task| planned(task, now, None))
            .collect();
    }

    let total_days: u64 = tasks.iter().map(|t| u64::from(t.estimated_days)).sum();
    let scale = (available_days as f64 / total_days.max(1) as f64).max(MIN_SCALE_FACTOR);

    let mut current = now;
    tasks
        .into_iter()
        .map(|task| {
            let scaled = (f64::from(task.estimated_days) * scale)
                .round()
                .clamp(1.0, f64::from(u32::MAX));
            let adjusted = scaled as u32;
            current = advance(current, adjusted).min(deadline);
            planned(task, current, Some(adjusted))
        })
        .collect()
}

fn advance(from: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    from.checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(from)
}

/// Whole days from `now` to `deadline`, rounded up.
fn available_days(now: DateTime<Utc>, deadline: DateTime<Utc>) -> i64 {
    let millis = (deadline - now).num_milliseconds();
    let day = Duration::days(1).num_milliseconds();
    if millis > 0 {
        (millis + day - 1) / day
    } else {
        millis / day
    }
}

fn planned(task: DraftTask, due_date: DateTime<Utc>, adjusted_days: Option<u32>) -> PlannedTask {
    PlannedTask {
        title: task.title,
        description: task.description,
        priority: task.priority,
        estimated_days: task.estimated_days,
        due_date,
        adjusted_days,
    }
}
