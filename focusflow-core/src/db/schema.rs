//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: projects, tasks, task history
    r#"
    CREATE TABLE projects (
        id               TEXT PRIMARY KEY,
        user_id          TEXT NOT NULL,
        name             TEXT NOT NULL,
        description      TEXT,
        color            TEXT,
        status           TEXT NOT NULL DEFAULT 'ACTIVE',   -- ACTIVE, PAUSED, COMPLETED, ARCHIVED
        priority         TEXT NOT NULL DEFAULT 'MEDIUM',   -- LOW, MEDIUM, HIGH
        deadline         DATETIME,
        created_at       DATETIME NOT NULL
    );

    CREATE INDEX idx_projects_user ON projects(user_id);
    CREATE INDEX idx_projects_user_status ON projects(user_id, status);

    CREATE TABLE tasks (
        id               TEXT PRIMARY KEY,
        project_id       TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        title            TEXT NOT NULL,
        description      TEXT,
        priority         TEXT NOT NULL DEFAULT 'MEDIUM',
        status           TEXT NOT NULL DEFAULT 'TODO',     -- TODO, IN_PROGRESS, COMPLETED
        sort_order       INTEGER NOT NULL,
        due_date         DATETIME,
        completed_at     DATETIME,
        created_at       DATETIME NOT NULL,

        CHECK ((status = 'COMPLETED') = (completed_at IS NOT NULL))
    );

    CREATE UNIQUE INDEX idx_tasks_project_order ON tasks(project_id, sort_order);
    CREATE INDEX idx_tasks_status ON tasks(status);
    CREATE INDEX idx_tasks_due ON tasks(due_date);

    -- Append-only; rows only disappear with their task
    CREATE TABLE task_history (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        task_id          TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        action           TEXT NOT NULL,
        previous_status  TEXT,
        new_status       TEXT,
        created_at       DATETIME NOT NULL
    );

    CREATE INDEX idx_task_history_task ON task_history(task_id, created_at);
    CREATE INDEX idx_task_history_created ON task_history(created_at);
    "#,
    // Version 2: generated plans
    r#"
    CREATE TABLE ai_plans (
        id                   TEXT PRIMARY KEY,
        user_id              TEXT NOT NULL,
        goal                 TEXT NOT NULL,
        context              JSON NOT NULL,
        generated_plan       JSON NOT NULL,
        imported             INTEGER NOT NULL DEFAULT 0,
        imported_project_id  TEXT REFERENCES projects(id) ON DELETE SET NULL,
        created_at           DATETIME NOT NULL
    );

    CREATE INDEX idx_ai_plans_user ON ai_plans(user_id, created_at DESC);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
