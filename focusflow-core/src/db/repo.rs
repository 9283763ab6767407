//! Database repository layer
//!
//! Provides query and insert operations for all entity types.

use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

const PROJECT_COLUMNS: &str =
    "p.id, p.user_id, p.name, p.description, p.color, p.status, p.priority, p.deadline, p.created_at";

const TASK_COLUMNS: &str = "t.id, t.project_id, t.title, t.description, t.priority, t.status, \
     t.sort_order, t.due_date, t.completed_at, t.created_at";

const HISTORY_COLUMNS: &str =
    "h.id, h.task_id, h.action, h.previous_status, h.new_status, h.created_at";

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

/// Fixed-width UTC timestamp so that string order equals time order.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Corrupt timestamps surface as conversion failures rather than being
/// replaced, so they cannot silently move analytics buckets.
fn parse_ts(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into())
        })
}

fn parse_opt_ts(s: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_ts).transpose()
}

fn parse_times(times: &[String]) -> Result<Vec<DateTime<Utc>>> {
    Ok(times
        .iter()
        .map(|s| parse_ts(s))
        .collect::<rusqlite::Result<Vec<_>>>()?)
}

fn parse_enum<T: std::str::FromStr<Err = String>>(value: &str) -> rusqlite::Result<T> {
    value.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into())
    })
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable foreign keys and WAL mode for better concurrency
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    // ============================================
    // Project operations
    // ============================================

    /// Insert a new project
    pub fn insert_project(&self, project: &Project) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::insert_project_row(&conn, project)
    }

    fn insert_project_row(conn: &Connection, project: &Project) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO projects (id, user_id, name, description, color, status, priority, deadline, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                project.id,
                project.user_id,
                project.name,
                project.description,
                project.color,
                project.status.as_str(),
                project.priority.as_str(),
                project.deadline.as_ref().map(ts),
                ts(&project.created_at),
            ],
        )?;
        Ok(())
    }

    /// Get a project by ID regardless of owner
    pub fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?"),
            [id],
            Self::row_to_project,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Get a project by ID if it belongs to `user_id`
    pub fn get_user_project(&self, user_id: &str, id: &str) -> Result<Option<Project>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?1 AND p.user_id = ?2"),
            params![id, user_id],
            Self::row_to_project,
        )
        .optional()
        .map_err(Error::from)
    }

    /// List a user's projects, newest first
    pub fn list_projects(&self, user_id: &str) -> Result<Vec<Project>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.user_id = ? ORDER BY p.created_at DESC"
        ))?;
        let projects = stmt
            .query_map([user_id], Self::row_to_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    /// Overwrite a project's mutable fields
    pub fn update_project(&self, project: &Project) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            UPDATE projects
            SET name = ?2, description = ?3, color = ?4, status = ?5, priority = ?6, deadline = ?7
            WHERE id = ?1
            "#,
            params![
                project.id,
                project.name,
                project.description,
                project.color,
                project.status.as_str(),
                project.priority.as_str(),
                project.deadline.as_ref().map(ts),
            ],
        )?;
        Ok(())
    }

    /// Set a project's status. Returns false if the project does not exist.
    pub fn set_project_status(&self, id: &str, status: ProjectStatus) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE projects SET status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        Ok(updated > 0)
    }

    /// Delete a project together with its tasks and their history
    pub fn delete_project(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM projects WHERE id = ?", [id])?;
        Ok(deleted > 0)
    }

    /// Count a user's projects, optionally only those with `status`
    pub fn count_projects(&self, user_id: &str, status: Option<ProjectStatus>) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count = match status {
            Some(status) => conn.query_row(
                "SELECT COUNT(*) FROM projects WHERE user_id = ?1 AND status = ?2",
                params![user_id, status.as_str()],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM projects WHERE user_id = ?",
                [user_id],
                |row| row.get(0),
            )?,
        };
        Ok(count)
    }

    fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
        let status: String = row.get("status")?;
        let priority: String = row.get("priority")?;
        let created_at: String = row.get("created_at")?;

        Ok(Project {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            color: row.get("color")?,
            status: parse_enum(&status)?,
            priority: parse_enum(&priority)?,
            deadline: parse_opt_ts(row.get("deadline")?)?,
            created_at: parse_ts(&created_at)?,
        })
    }

    // ============================================
    // Task operations
    // ============================================

    /// Insert a new task
    pub fn insert_task(&self, task: &Task) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::insert_task_row(&conn, task)
    }

    fn insert_task_row(conn: &Connection, task: &Task) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO tasks (id, project_id, title, description, priority, status,
                               sort_order, due_date, completed_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                task.id,
                task.project_id,
                task.title,
                task.description,
                task.priority.as_str(),
                task.status.as_str(),
                task.order,
                task.due_date.as_ref().map(ts),
                task.completed_at.as_ref().map(ts),
                ts(&task.created_at),
            ],
        )?;
        Ok(())
    }

    /// Order value for a task appended to the end of a project
    pub fn next_task_order(&self, project_id: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let next: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM tasks WHERE project_id = ?",
            [project_id],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    /// Get a task by ID regardless of owner
    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?"),
            [id],
            Self::row_to_task,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Get a task by ID if its project belongs to `user_id`
    pub fn get_user_task(&self, user_id: &str, id: &str) -> Result<Option<Task>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks t JOIN projects p ON p.id = t.project_id \
                 WHERE t.id = ?1 AND p.user_id = ?2"
            ),
            params![id, user_id],
            Self::row_to_task,
        )
        .optional()
        .map_err(Error::from)
    }

    /// List a project's tasks in display order
    pub fn list_project_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.project_id = ? ORDER BY t.sort_order ASC"
        ))?;
        let tasks = stmt
            .query_map([project_id], Self::row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Overwrite a task's editable fields (not status)
    pub fn update_task(&self, task: &Task) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            UPDATE tasks
            SET title = ?2, description = ?3, priority = ?4, due_date = ?5
            WHERE id = ?1
            "#,
            params![
                task.id,
                task.title,
                task.description,
                task.priority.as_str(),
                task.due_date.as_ref().map(ts),
            ],
        )?;
        Ok(())
    }

    /// Write a task's status and completion timestamp together
    pub fn set_task_status(
        &self,
        id: &str,
        status: TaskStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE tasks SET status = ?2, completed_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), completed_at.as_ref().map(ts)],
        )?;
        Ok(updated > 0)
    }

    /// Delete a task and its history
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM tasks WHERE id = ?", [id])?;
        Ok(deleted > 0)
    }

    /// Assign orders 0..n to a project's tasks in the given sequence.
    ///
    /// `task_ids` must name every task of the project exactly once.
    pub fn reorder_tasks(&self, project_id: &str, task_ids: &[String]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let existing: HashSet<String> = {
            let mut stmt = tx.prepare("SELECT id FROM tasks WHERE project_id = ?")?;
            let ids = stmt
                .query_map([project_id], |row| row.get(0))?
                .collect::<rusqlite::Result<HashSet<String>>>()?;
            ids
        };
        let requested: HashSet<&str> = task_ids.iter().map(String::as_str).collect();
        if requested.len() != task_ids.len()
            || requested.len() != existing.len()
            || !requested.iter().all(|id| existing.contains(*id))
        {
            return Err(Error::Validation(
                "reorder must list every task of the project exactly once".to_string(),
            ));
        }

        // Two passes keep (project_id, sort_order) unique at every statement
        for (index, id) in task_ids.iter().enumerate() {
            tx.execute(
                "UPDATE tasks SET sort_order = ?2 WHERE id = ?1",
                params![id, -(index as i64) - 1],
            )?;
        }
        for (index, id) in task_ids.iter().enumerate() {
            tx.execute(
                "UPDATE tasks SET sort_order = ?2 WHERE id = ?1",
                params![id, index as i64],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Task counts grouped by status; statuses with no tasks are absent
    pub fn count_tasks_by_status(&self, user_id: &str) -> Result<HashMap<TaskStatus, i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT t.status, COUNT(*)
            FROM tasks t JOIN projects p ON p.id = t.project_id
            WHERE p.user_id = ?
            GROUP BY t.status
            "#,
        )?;
        let rows = stmt.query_map([user_id], |row| {
            let status: String = row.get(0)?;
            Ok((parse_enum::<TaskStatus>(&status)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (status, count) = row?;
            counts.insert(status, count);
        }
        Ok(counts)
    }

    /// Number of a user's tasks that carry a due date
    pub fn count_tasks_with_due_date(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM tasks t JOIN projects p ON p.id = t.project_id
            WHERE p.user_id = ? AND t.due_date IS NOT NULL
            "#,
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Non-completed tasks whose due date is before `now`
    pub fn count_overdue_tasks(&self, user_id: &str, now: DateTime<Utc>) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM tasks t JOIN projects p ON p.id = t.project_id
            WHERE p.user_id = ?1 AND t.status != 'COMPLETED'
              AND t.due_date IS NOT NULL AND t.due_date < ?2
            "#,
            params![user_id, ts(&now)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Most recently completed tasks, newest first
    pub fn recent_completed_tasks(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<TaskWithProject>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {TASK_COLUMNS}, p.name AS project_name, p.color AS project_color
            FROM tasks t JOIN projects p ON p.id = t.project_id
            WHERE p.user_id = ?1 AND t.status = 'COMPLETED'
            ORDER BY t.completed_at DESC
            LIMIT ?2
            "#
        ))?;
        let tasks = stmt
            .query_map(params![user_id, limit as i64], Self::row_to_task_with_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Non-completed tasks due within `[from, until]`, soonest first
    pub fn upcoming_deadlines(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TaskWithProject>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {TASK_COLUMNS}, p.name AS project_name, p.color AS project_color
            FROM tasks t JOIN projects p ON p.id = t.project_id
            WHERE p.user_id = ?1 AND t.status != 'COMPLETED'
              AND t.due_date >= ?2 AND t.due_date <= ?3
            ORDER BY t.due_date ASC
            LIMIT ?4
            "#
        ))?;
        let tasks = stmt
            .query_map(
                params![user_id, ts(&from), ts(&until), limit as i64],
                Self::row_to_task_with_project,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Creation timestamps of a user's tasks created at or after `since`
    pub fn task_creation_times(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT t.created_at
            FROM tasks t JOIN projects p ON p.id = t.project_id
            WHERE p.user_id = ?1 AND t.created_at >= ?2
            ORDER BY t.created_at ASC
            "#,
        )?;
        let times = stmt
            .query_map(params![user_id, ts(&since)], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        parse_times(&times)
    }

    fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
        let priority: String = row.get("priority")?;
        let status: String = row.get("status")?;
        let created_at: String = row.get("created_at")?;

        Ok(Task {
            id: row.get("id")?,
            project_id: row.get("project_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            priority: parse_enum(&priority)?,
            status: parse_enum(&status)?,
            order: row.get("sort_order")?,
            due_date: parse_opt_ts(row.get("due_date")?)?,
            completed_at: parse_opt_ts(row.get("completed_at")?)?,
            created_at: parse_ts(&created_at)?,
        })
    }

    fn row_to_task_with_project(row: &Row) -> rusqlite::Result<TaskWithProject> {
        Ok(TaskWithProject {
            task: Self::row_to_task(row)?,
            project_name: row.get("project_name")?,
            project_color: row.get("project_color")?,
        })
    }

    // ============================================
    // Task history operations
    // ============================================

    /// Append a history event, returning its id
    pub fn append_history_event(&self, event: &NewHistoryEvent) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO task_history (task_id, action, previous_status, new_status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                event.task_id,
                event.action,
                event.previous_status.map(|s| s.as_str()),
                event.new_status.map(|s| s.as_str()),
                ts(&event.created_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// History of one task in recording order
    pub fn list_task_history(&self, task_id: &str) -> Result<Vec<TaskHistoryEvent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {HISTORY_COLUMNS} FROM task_history h WHERE h.task_id = ? ORDER BY h.id ASC"
        ))?;
        let events = stmt
            .query_map([task_id], Self::row_to_history_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    /// All of a user's history events at or after `since`, oldest first
    pub fn history_events_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<TaskHistoryEvent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {HISTORY_COLUMNS}
            FROM task_history h
            JOIN tasks t ON t.id = h.task_id
            JOIN projects p ON p.id = t.project_id
            WHERE p.user_id = ?1 AND h.created_at >= ?2
            ORDER BY h.created_at ASC
            "#
        ))?;
        let events = stmt
            .query_map(params![user_id, ts(&since)], Self::row_to_history_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    /// Timestamps of status changes to COMPLETED at or after `since`, oldest first
    pub fn completion_times_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT h.created_at
            FROM task_history h
            JOIN tasks t ON t.id = h.task_id
            JOIN projects p ON p.id = t.project_id
            WHERE p.user_id = ?1 AND h.action = ?2 AND h.new_status = 'COMPLETED'
              AND h.created_at >= ?3
            ORDER BY h.created_at ASC
            "#,
        )?;
        let times = stmt
            .query_map(params![user_id, STATUS_CHANGE_ACTION, ts(&since)], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        parse_times(&times)
    }

    /// Every completion timestamp the user has ever logged, newest first
    pub fn all_completion_times(&self, user_id: &str) -> Result<Vec<DateTime<Utc>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT h.created_at
            FROM task_history h
            JOIN tasks t ON t.id = h.task_id
            JOIN projects p ON p.id = t.project_id
            WHERE p.user_id = ? AND h.new_status = 'COMPLETED'
            ORDER BY h.created_at DESC
            "#,
        )?;
        let times = stmt
            .query_map([user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        parse_times(&times)
    }

    fn row_to_history_event(row: &Row) -> rusqlite::Result<TaskHistoryEvent> {
        let previous: Option<String> = row.get("previous_status")?;
        let new: Option<String> = row.get("new_status")?;
        let created_at: String = row.get("created_at")?;

        Ok(TaskHistoryEvent {
            id: row.get("id")?,
            task_id: row.get("task_id")?,
            action: row.get("action")?,
            previous_status: previous.as_deref().map(parse_enum).transpose()?,
            new_status: new.as_deref().map(parse_enum).transpose()?,
            created_at: parse_ts(&created_at)?,
        })
    }

    // ============================================
    // AI plan operations
    // ============================================

    /// Persist a generated plan
    pub fn insert_ai_plan(&self, plan: &AiPlan) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO ai_plans (id, user_id, goal, context, generated_plan, imported,
                                  imported_project_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                plan.id,
                plan.user_id,
                plan.goal,
                plan.context.to_string(),
                serde_json::to_string(&plan.plan)?,
                plan.imported,
                plan.imported_project_id,
                ts(&plan.created_at),
            ],
        )?;
        Ok(())
    }

    /// Get a plan by ID
    pub fn get_ai_plan(&self, id: &str) -> Result<Option<AiPlan>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT * FROM ai_plans WHERE id = ?",
                [id],
                Self::row_to_ai_plan_parts,
            )
            .optional()?;
        row.map(AiPlanRow::into_plan).transpose()
    }

    /// A user's plans, newest first
    pub fn list_ai_plans(&self, user_id: &str, limit: usize) -> Result<Vec<AiPlan>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM ai_plans WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id, limit as i64], Self::row_to_ai_plan_parts)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(AiPlanRow::into_plan).collect()
    }

    /// Delete a plan that has not been imported.
    ///
    /// Fails with [`Error::AlreadyImported`] for an imported plan and
    /// [`Error::NotFound`] for an unknown one; neither deletes anything.
    pub fn delete_ai_plan(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM ai_plans WHERE id = ? AND imported = 0", [id])?;
        if deleted > 0 {
            return Ok(());
        }

        let imported: Option<bool> = conn
            .query_row("SELECT imported FROM ai_plans WHERE id = ?", [id], |r| r.get(0))
            .optional()?;
        match imported {
            Some(_) => Err(Error::AlreadyImported(id.to_string())),
            None => Err(Error::not_found("plan", id)),
        }
    }

    /// Materialize a plan: insert the project and its tasks and mark the
    /// plan imported, all in one transaction.
    ///
    /// Fails with [`Error::AlreadyImported`] (and writes nothing) if the plan
    /// was imported in the meantime.
    pub fn import_ai_plan(&self, plan_id: &str, project: &Project, tasks: &[Task]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let marked = tx.execute(
            "UPDATE ai_plans SET imported = 1 WHERE id = ?1 AND imported = 0",
            [plan_id],
        )?;
        if marked == 0 {
            return Err(Error::AlreadyImported(plan_id.to_string()));
        }

        Self::insert_project_row(&tx, project)?;
        for task in tasks {
            Self::insert_task_row(&tx, task)?;
        }
        tx.execute(
            "UPDATE ai_plans SET imported_project_id = ?2 WHERE id = ?1",
            params![plan_id, project.id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn row_to_ai_plan_parts(row: &Row) -> rusqlite::Result<AiPlanRow> {
        Ok(AiPlanRow {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            goal: row.get("goal")?,
            context: row.get("context")?,
            generated_plan: row.get("generated_plan")?,
            imported: row.get("imported")?,
            imported_project_id: row.get("imported_project_id")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Raw `ai_plans` row; JSON columns are decoded outside the rusqlite closure
/// so decoding errors surface as [`Error::Json`].
struct AiPlanRow {
    id: String,
    user_id: String,
    goal: String,
    context: String,
    generated_plan: String,
    imported: bool,
    imported_project_id: Option<String>,
    created_at: String,
}

impl AiPlanRow {
    fn into_plan(self) -> Result<AiPlan> {
        Ok(AiPlan {
            id: self.id,
            user_id: self.user_id,
            goal: self.goal,
            context: serde_json::from_str(&self.context)?,
            plan: serde_json::from_str(&self.generated_plan)?,
            imported: self.imported,
            imported_project_id: self.imported_project_id,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}
