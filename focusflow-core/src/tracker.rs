//! Project and task mutations.
//!
//! Every successful write invalidates the owning user's analytics cache.
//! Status changes run as two independent steps:
//!
//! 1. write `status` and `completed_at` (errors propagate)
//! 2. append a `status_change` event through [`HistoryLog`] (errors are
//!    logged and swallowed; the status change stays committed)

use crate::analytics::AnalyticsEngine;
use crate::clock::Clock;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::*;
use std::sync::Arc;

/// Longest accepted project name, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// Longest accepted task title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Append-only sink for task history events.
pub trait HistoryLog: Send + Sync {
    fn append(&self, event: &NewHistoryEvent) -> Result<i64>;
}

impl HistoryLog for Database {
    fn append(&self, event: &NewHistoryEvent) -> Result<i64> {
        self.append_history_event(event)
    }
}

/// The first `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Validates a project name and returns it trimmed.
pub fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(Error::Validation(format!(
            "name must be 1..={} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_TITLE_LEN {
        return Err(Error::Validation(format!(
            "task title must be 1..={} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Write path for projects and tasks.
pub struct Tracker {
    db: Arc<Database>,
    history: Arc<dyn HistoryLog>,
    analytics: Arc<AnalyticsEngine>,
    clock: Arc<dyn Clock>,
}

impl Tracker {
    pub fn new(
        db: Arc<Database>,
        history: Arc<dyn HistoryLog>,
        analytics: Arc<AnalyticsEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            history,
            analytics,
            clock,
        }
    }

    // ============================================
    // Projects
    // ============================================

    pub fn create_project(&self, user_id: &str, new: NewProject) -> Result<Project> {
        let project = Project {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: validate_name(&new.name)?,
            description: new.description,
            color: new.color,
            status: ProjectStatus::Active,
            priority: new.priority.unwrap_or_default(),
            deadline: new.deadline,
            created_at: self.clock.now(),
        };

        self.db.insert_project(&project)?;
        self.analytics.invalidate_user_cache(user_id);
        tracing::info!(user_id, project_id = %project.id, "Created project");
        Ok(project)
    }

    pub fn list_projects(&self, user_id: &str) -> Result<Vec<Project>> {
        self.db.list_projects(user_id)
    }

    pub fn get_project(&self, user_id: &str, project_id: &str) -> Result<Project> {
        self.db
            .get_user_project(user_id, project_id)?
            .ok_or_else(|| Error::not_found("project", project_id))
    }

    pub fn update_project(
        &self,
        user_id: &str,
        project_id: &str,
        update: ProjectUpdate,
    ) -> Result<Project> {
        let mut project = self.get_project(user_id, project_id)?;

        if let Some(name) = update.name {
            project.name = validate_name(&name)?;
        }
        if let Some(description) = update.description {
            project.description = Some(description);
        }
        if let Some(color) = update.color {
            project.color = Some(color);
        }
        if let Some(priority) = update.priority {
            project.priority = priority;
        }
        if let Some(deadline) = update.deadline {
            project.deadline = deadline;
        }

        self.db.update_project(&project)?;
        self.analytics.invalidate_user_cache(user_id);
        Ok(project)
    }

    pub fn set_project_status(
        &self,
        user_id: &str,
        project_id: &str,
        status: ProjectStatus,
    ) -> Result<Project> {
        let mut project = self.get_project(user_id, project_id)?;
        self.db.set_project_status(project_id, status)?;
        project.status = status;
        self.analytics.invalidate_user_cache(user_id);
        tracing::info!(user_id, project_id, status = status.as_str(), "Project status changed");
        Ok(project)
    }

    /// Delete a project with its tasks and their history.
    pub fn delete_project(&self, user_id: &str, project_id: &str) -> Result<()> {
        self.get_project(user_id, project_id)?;
        self.db.delete_project(project_id)?;
        self.analytics.invalidate_user_cache(user_id);
        tracing::info!(user_id, project_id, "Deleted project");
        Ok(())
    }

    // ============================================
    // Tasks
    // ============================================

    /// Append a task to the end of a project.
    pub fn create_task(&self, user_id: &str, project_id: &str, new: NewTask) -> Result<Task> {
        self.get_project(user_id, project_id)?;

        let now = self.clock.now();
        let status = new.status.unwrap_or_default();
        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            title: validate_title(&new.title)?,
            description: new.description,
            priority: new.priority.unwrap_or_default(),
            status,
            order: self.db.next_task_order(project_id)?,
            due_date: new.due_date,
            completed_at: (status == TaskStatus::Completed).then_some(now),
            created_at: now,
        };

        self.db.insert_task(&task)?;
        self.analytics.invalidate_user_cache(user_id);
        tracing::debug!(user_id, project_id, task_id = %task.id, "Created task");
        Ok(task)
    }

    /// Tasks of a project in display order.
    pub fn list_tasks(&self, user_id: &str, project_id: &str) -> Result<Vec<Task>> {
        self.get_project(user_id, project_id)?;
        self.db.list_project_tasks(project_id)
    }

    pub fn get_task(&self, user_id: &str, task_id: &str) -> Result<Task> {
        self.db
            .get_user_task(user_id, task_id)?
            .ok_or_else(|| Error::not_found("task", task_id))
    }

    /// Edit title, description, priority or due date. Never touches status.
    pub fn update_task(&self, user_id: &str, task_id: &str, update: TaskUpdate) -> Result<Task> {
        let mut task = self.get_task(user_id, task_id)?;

        if let Some(title) = update.title {
            task.title = validate_title(&title)?;
        }
        if let Some(description) = update.description {
            task.description = Some(description);
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if let Some(due_date) = update.due_date {
            task.due_date = due_date;
        }

        self.db.update_task(&task)?;
        self.analytics.invalidate_user_cache(user_id);
        Ok(task)
    }

    /// Move a task to `status`, recording the transition.
    ///
    /// Requesting the current status changes nothing and records nothing.
    pub fn update_task_status(
        &self,
        user_id: &str,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<Task> {
        let mut task = self.get_task(user_id, task_id)?;
        let previous = task.status;
        if previous == status {
            return Ok(task);
        }

        let now = self.clock.now();
        task.completed_at = match status {
            TaskStatus::Completed => Some(now),
            _ => None,
        };
        task.status = status;
        self.db
            .set_task_status(&task.id, task.status, task.completed_at)?;

        let event = NewHistoryEvent::status_change(&task.id, previous, status, now);
        if let Err(e) = self.history.append(&event) {
            tracing::warn!(
                user_id,
                task_id,
                error = %e,
                "Failed to record task history; status change kept"
            );
        }

        if status == TaskStatus::Completed {
            self.complete_project_if_done(&task.project_id);
        }

        self.analytics.invalidate_user_cache(user_id);
        tracing::info!(
            user_id,
            task_id,
            from = previous.as_str(),
            to = status.as_str(),
            "Task status changed"
        );
        Ok(task)
    }

    /// Mark the project COMPLETED once every one of its tasks is. Best-effort.
    fn complete_project_if_done(&self, project_id: &str) {
        let result = (|| -> Result<()> {
            let tasks = self.db.list_project_tasks(project_id)?;
            if tasks.is_empty() || !tasks.iter().all(|t| t.status == TaskStatus::Completed) {
                return Ok(());
            }
            if let Some(project) = self.db.get_project(project_id)? {
                if project.status != ProjectStatus::Completed {
                    self.db
                        .set_project_status(project_id, ProjectStatus::Completed)?;
                    tracing::info!(project_id, "All tasks completed; project completed");
                }
            }
            Ok(())
        })();

        if let Err(e) = result {
            tracing::warn!(project_id, error = %e, "Failed to check project completion");
        }
    }

    pub fn delete_task(&self, user_id: &str, task_id: &str) -> Result<()> {
        self.get_task(user_id, task_id)?;
        self.db.delete_task(task_id)?;
        self.analytics.invalidate_user_cache(user_id);
        Ok(())
    }

    /// Reassign orders 0..n following `task_ids`, which must name every task
    /// of the project exactly once.
    pub fn reorder_tasks(
        &self,
        user_id: &str,
        project_id: &str,
        task_ids: &[String],
    ) -> Result<Vec<Task>> {
        self.get_project(user_id, project_id)?;
        self.db.reorder_tasks(project_id, task_ids)?;
        self.analytics.invalidate_user_cache(user_id);
        self.db.list_project_tasks(project_id)
    }
}
