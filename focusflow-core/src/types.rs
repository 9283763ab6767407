//! Core domain types for focusflow
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Project** | A user's goal; owns an ordered set of Tasks |
//! | **Task** | A unit of work inside a Project with a status and optional due date |
//! | **History event** | Append-only record of a task status transition |
//! | **AI plan** | A generated project outline that can be imported into a real Project once |
//!
//! Users are identified by an opaque id string issued by the surrounding
//! authentication layer; there is no user table in this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Enums
// ============================================

/// Task and project priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }

    /// Day estimate used when a generated task carries none.
    pub fn default_estimated_days(&self) -> u32 {
        match self {
            Priority::High => 10,
            Priority::Medium => 5,
            Priority::Low => 2,
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Priority::Low),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            _ => Err(format!("unknown priority: {}", s)),
        }
    }
}

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "TODO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "COMPLETED" => Ok(TaskStatus::Completed),
            _ => Err(format!("unknown task status: {}", s)),
        }
    }
}

/// Project status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Active,
    Paused,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "ACTIVE",
            ProjectStatus::Paused => "PAUSED",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::Archived => "ARCHIVED",
        }
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(ProjectStatus::Active),
            "PAUSED" => Ok(ProjectStatus::Paused),
            "COMPLETED" => Ok(ProjectStatus::Completed),
            "ARCHIVED" => Ok(ProjectStatus::Archived),
            _ => Err(format!("unknown project status: {}", s)),
        }
    }
}

// ============================================
// Projects and tasks
// ============================================

/// A user's goal, owning an ordered set of tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    /// Owning user
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Display colour (hex)
    pub color: Option<String>,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a project.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub priority: Option<Priority>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Partial project update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub priority: Option<Priority>,
    /// `Some(None)` clears the deadline
    pub deadline: Option<Option<DateTime<Utc>>>,
}

/// A unit of work inside a project.
///
/// `completed_at` is set exactly when `status` is [`TaskStatus::Completed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub status: TaskStatus,
    /// Position within the project (unique per project)
    pub order: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// A task is overdue when it is not completed and its due date has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Completed && self.due_date.is_some_and(|due| due < now)
    }
}

/// Fields for creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial task update. Status changes go through the status-change path.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    /// `Some(None)` clears the due date
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// A task together with its project's display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskWithProject {
    #[serde(flatten)]
    pub task: Task,
    pub project_name: String,
    pub project_color: Option<String>,
}

// ============================================
// Task history
// ============================================

/// Action tag written for status transitions.
pub const STATUS_CHANGE_ACTION: &str = "status_change";

/// Append-only record of something that happened to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskHistoryEvent {
    pub id: i64,
    pub task_id: String,
    pub action: String,
    pub previous_status: Option<TaskStatus>,
    pub new_status: Option<TaskStatus>,
    pub created_at: DateTime<Utc>,
}

/// A history event before it is assigned an id.
#[derive(Debug, Clone)]
pub struct NewHistoryEvent {
    pub task_id: String,
    pub action: String,
    pub previous_status: Option<TaskStatus>,
    pub new_status: Option<TaskStatus>,
    pub created_at: DateTime<Utc>,
}

impl NewHistoryEvent {
    pub fn status_change(
        task_id: &str,
        previous: TaskStatus,
        new: TaskStatus,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id: task_id.to_string(),
            action: STATUS_CHANGE_ACTION.to_string(),
            previous_status: Some(previous),
            new_status: Some(new),
            created_at: at,
        }
    }
}

// ============================================
// AI plans
// ============================================

/// Self-reported experience level for structured plan requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Experience {
    Beginner,
    Intermediate,
    Advanced,
}

impl Experience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Experience::Beginner => "BEGINNER",
            Experience::Intermediate => "INTERMEDIATE",
            Experience::Advanced => "ADVANCED",
        }
    }
}

impl std::str::FromStr for Experience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BEGINNER" => Ok(Experience::Beginner),
            "INTERMEDIATE" => Ok(Experience::Intermediate),
            "ADVANCED" => Ok(Experience::Advanced),
            _ => Err(format!(
                "experience must be one of BEGINNER, INTERMEDIATE, ADVANCED (got {})",
                s
            )),
        }
    }
}

/// Structured plan request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<Experience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_per_day: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_weeks: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub focus_areas: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

/// Input to plan generation: a bare goal or a structured request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GoalInput {
    Goal(String),
    Structured(PlanRequest),
}

impl GoalInput {
    pub fn goal(&self) -> &str {
        match self {
            GoalInput::Goal(goal) => goal,
            GoalInput::Structured(request) => &request.goal,
        }
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        match self {
            GoalInput::Goal(_) => None,
            GoalInput::Structured(request) => request.deadline,
        }
    }

    /// The context persisted alongside a plan, as submitted.
    pub fn context(&self) -> serde_json::Value {
        match self {
            GoalInput::Goal(goal) => serde_json::json!({ "goal": goal }),
            GoalInput::Structured(request) => {
                serde_json::to_value(request).unwrap_or_else(|_| serde_json::json!({}))
            }
        }
    }
}

impl From<&str> for GoalInput {
    fn from(goal: &str) -> Self {
        GoalInput::Goal(goal.to_string())
    }
}

/// One task of a generated plan, with its computed due date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub estimated_days: u32,
    pub due_date: DateTime<Utc>,
    /// Duration after scaling to a project deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_days: Option<u32>,
}

/// The structured plan payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPlan {
    pub project_name: String,
    pub project_description: String,
    pub deadline: Option<DateTime<Utc>>,
    pub tasks: Vec<PlannedTask>,
}

/// Lifecycle state of a stored plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanState {
    Generated,
    Imported,
}

/// A persisted generated plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiPlan {
    pub id: String,
    pub user_id: String,
    pub goal: String,
    /// Input as submitted (experience, hours, duration, deadline, ...)
    pub context: serde_json::Value,
    pub plan: GeneratedPlan,
    pub imported: bool,
    pub imported_project_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AiPlan {
    pub fn state(&self) -> PlanState {
        if self.imported {
            PlanState::Imported
        } else {
            PlanState::Generated
        }
    }
}

/// Result of importing a plan: the new project and its tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedProject {
    pub project: Project,
    pub tasks: Vec<Task>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_parsing() {
        assert_eq!("in_progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!("COMPLETED".parse::<TaskStatus>(), Ok(TaskStatus::Completed));
        assert!("done".parse::<TaskStatus>().is_err());
        assert_eq!("archived".parse::<ProjectStatus>(), Ok(ProjectStatus::Archived));
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
    }

    #[test]
    fn test_task_overdue() {
        let now = Utc::now();
        let mut task = Task {
            id: "t1".to_string(),
            project_id: "p1".to_string(),
            title: "Write tests".to_string(),
            description: None,
            priority: Priority::Medium,
            status: TaskStatus::Todo,
            order: 0,
            due_date: Some(now - Duration::hours(1)),
            completed_at: None,
            created_at: now,
        };
        assert!(task.is_overdue(now));

        task.status = TaskStatus::Completed;
        assert!(!task.is_overdue(now));

        task.status = TaskStatus::InProgress;
        task.due_date = None;
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn test_goal_input_accepts_both_shapes() {
        let bare: GoalInput = serde_json::from_str("\"Learn Spanish\"").unwrap();
        assert_eq!(bare.goal(), "Learn Spanish");
        assert_eq!(bare.context(), serde_json::json!({ "goal": "Learn Spanish" }));

        let structured: GoalInput = serde_json::from_str(
            r#"{"goal":"Run a marathon","experience":"BEGINNER","hoursPerDay":1.5}"#,
        )
        .unwrap();
        match &structured {
            GoalInput::Structured(request) => {
                assert_eq!(request.experience, Some(Experience::Beginner));
                assert_eq!(request.hours_per_day, Some(1.5));
            }
            GoalInput::Goal(_) => panic!("expected structured input"),
        }
        assert_eq!(structured.context()["experience"], "BEGINNER");
    }
}
