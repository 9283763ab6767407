//! focusflow - goal and task tracking from the command line
//!
//! Thin CLI over `focusflow-core`: projects, tasks, analytics and AI plans.

mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use focusflow_core::clock::local_at;
use focusflow_core::{
    Config, Database, Experience, GoalInput, NewProject, NewTask, PlanRequest, Priority,
    ProjectStatus, Services, SystemClock, TaskStatus,
};

use crate::output::Printer;

#[derive(Parser)]
#[command(name = "focusflow")]
#[command(about = "Track goals and tasks, see your progress, and plan with AI")]
#[command(version)]
struct Cli {
    /// Database file (overrides the configured path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// User the command acts for
    #[arg(short, long, global = true, default_value = "local")]
    user: String,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Manage projects
    Project {
        #[command(subcommand)]
        action: ProjectCommand,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: TaskCommand,
    },
    /// Show analytics
    Stats {
        #[command(subcommand)]
        action: StatsCommand,
    },
    /// Generate and import AI plans
    Plan {
        #[command(subcommand)]
        action: PlanCommand,
    },
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// Create a project
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Display colour, e.g. #22c55e
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        /// YYYY-MM-DD or RFC 3339
        #[arg(long, value_parser = parse_when)]
        deadline: Option<DateTime<Utc>>,
    },
    /// List projects
    List,
    /// Change a project's status
    Status { id: String, status: ProjectStatus },
    /// Delete a project and its tasks
    Delete { id: String },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Add a task to a project
    Add {
        project: String,
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        /// YYYY-MM-DD or RFC 3339
        #[arg(long, value_parser = parse_when)]
        due: Option<DateTime<Utc>>,
    },
    /// List a project's tasks in order
    List { project: String },
    /// Change a task's status (TODO, IN_PROGRESS, COMPLETED)
    Status { id: String, status: TaskStatus },
    /// Delete a task
    Delete { id: String },
    /// Reorder a project's tasks; list every task id in the new order
    Reorder {
        project: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand)]
enum StatsCommand {
    /// Project and task counts with streaks
    Overview,
    /// Daily completions
    Trend {
        #[arg(long)]
        days: Option<u32>,
    },
    /// Activity per date
    Heatmap {
        #[arg(long)]
        months: Option<u32>,
    },
    /// Current and best completion streak
    Streak,
    /// Health score with breakdown
    Health,
    /// Completions and new tasks per weekday over 30 days
    Productivity,
    /// Everything at once
    Dashboard,
}

#[derive(Subcommand)]
enum PlanCommand {
    /// Generate a plan for a goal
    Generate {
        goal: String,
        /// BEGINNER, INTERMEDIATE or ADVANCED
        #[arg(long)]
        experience: Option<Experience>,
        #[arg(long)]
        hours_per_day: Option<f64>,
        #[arg(long)]
        duration_weeks: Option<u32>,
        /// Repeatable
        #[arg(long = "focus")]
        focus_areas: Vec<String>,
        #[arg(long)]
        context: Option<String>,
        /// YYYY-MM-DD or RFC 3339
        #[arg(long, value_parser = parse_when)]
        deadline: Option<DateTime<Utc>>,
    },
    /// List generated plans, newest first
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one plan
    Show { id: String },
    /// Turn a plan into a project
    Import {
        id: String,
        /// Project name instead of the generated one
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete a plan that was not imported
    Delete { id: String },
}

/// Accepts a calendar date (end of that local day) or an RFC 3339 timestamp.
fn parse_when(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(local_at(date, 23, 59));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| format!("expected YYYY-MM-DD or an RFC 3339 timestamp, got '{value}'"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    Config::ensure_xdg_env();

    // Load configuration
    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(db) = &cli.db {
        config.database_path = Some(db.clone());
    }

    // Initialize logging
    let _log_guard =
        focusflow_core::logging::init(&config.logging).context("failed to initialize logging")?;

    // Open database
    let db_path = config.database_path();
    tracing::info!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let services = Services::from_config(Arc::new(db), Arc::new(SystemClock), &config);
    let printer = Printer::new(cli.format);

    match cli.command {
        Command::Project { action } => run_project(&services, &printer, &cli.user, action),
        Command::Task { action } => run_task(&services, &printer, &cli.user, action),
        Command::Stats { action } => run_stats(&services, &printer, &cli.user, action),
        Command::Plan { action } => run_plan(&services, &printer, &cli.user, action),
    }
}

fn run_project(
    services: &Services,
    printer: &Printer,
    user: &str,
    action: ProjectCommand,
) -> Result<()> {
    let tracker = &services.tracker;
    match action {
        ProjectCommand::Add {
            name,
            description,
            color,
            priority,
            deadline,
        } => {
            let project = tracker.create_project(
                user,
                NewProject {
                    name,
                    description,
                    color,
                    priority,
                    deadline,
                },
            )?;
            printer.project(&project)
        }
        ProjectCommand::List => printer.projects(&tracker.list_projects(user)?),
        ProjectCommand::Status { id, status } => {
            printer.project(&tracker.set_project_status(user, &id, status)?)
        }
        ProjectCommand::Delete { id } => {
            tracker.delete_project(user, &id)?;
            printer.done(&format!("Deleted project {id}"))
        }
    }
}

fn run_task(services: &Services, printer: &Printer, user: &str, action: TaskCommand) -> Result<()> {
    let tracker = &services.tracker;
    match action {
        TaskCommand::Add {
            project,
            title,
            description,
            priority,
            due,
        } => {
            let task = tracker.create_task(
                user,
                &project,
                NewTask {
                    title,
                    description,
                    priority,
                    status: None,
                    due_date: due,
                },
            )?;
            printer.task(&task)
        }
        TaskCommand::List { project } => printer.tasks(&tracker.list_tasks(user, &project)?),
        TaskCommand::Status { id, status } => {
            printer.task(&tracker.update_task_status(user, &id, status)?)
        }
        TaskCommand::Delete { id } => {
            tracker.delete_task(user, &id)?;
            printer.done(&format!("Deleted task {id}"))
        }
        TaskCommand::Reorder { project, ids } => {
            printer.tasks(&tracker.reorder_tasks(user, &project, &ids)?)
        }
    }
}

fn run_stats(
    services: &Services,
    printer: &Printer,
    user: &str,
    action: StatsCommand,
) -> Result<()> {
    let analytics = &services.analytics;
    let defaults = analytics.config();
    match action {
        StatsCommand::Overview => printer.overview(&analytics.get_overview_stats(user)?),
        StatsCommand::Trend { days } => printer.trend(
            &analytics.get_completion_trend(user, days.unwrap_or(defaults.trend_days))?,
        ),
        StatsCommand::Heatmap { months } => printer.heatmap(
            &analytics.get_activity_heatmap(user, months.unwrap_or(defaults.heatmap_months))?,
        ),
        StatsCommand::Streak => printer.streak(&analytics.get_streak(user)?),
        StatsCommand::Health => printer.health(&analytics.get_health_score(user)?),
        StatsCommand::Productivity => {
            printer.productivity(&analytics.get_productivity_by_day(user)?)
        }
        StatsCommand::Dashboard => printer.dashboard(&analytics.get_dashboard(user)?),
    }
}

fn run_plan(services: &Services, printer: &Printer, user: &str, action: PlanCommand) -> Result<()> {
    let planner = &services.planner;
    match action {
        PlanCommand::Generate {
            goal,
            experience,
            hours_per_day,
            duration_weeks,
            focus_areas,
            context,
            deadline,
        } => {
            let structured = experience.is_some()
                || hours_per_day.is_some()
                || duration_weeks.is_some()
                || !focus_areas.is_empty()
                || context.is_some()
                || deadline.is_some();
            let input = if structured {
                GoalInput::Structured(PlanRequest {
                    goal,
                    experience,
                    hours_per_day,
                    duration_weeks,
                    focus_areas,
                    additional_context: context,
                    deadline,
                })
            } else {
                GoalInput::Goal(goal)
            };
            printer.plan(&planner.generate_plan(user, &input)?)
        }
        PlanCommand::List { limit } => printer.plans(&planner.list_plans(user, limit)?),
        PlanCommand::Show { id } => printer.plan(&planner.get_plan(user, &id)?),
        PlanCommand::Import { id, name } => {
            let imported = planner.import_plan(user, &id, name.as_deref())?;
            printer.imported(&imported)
        }
        PlanCommand::Delete { id } => {
            planner.delete_plan(user, &id)?;
            printer.done(&format!("Deleted plan {id}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_when_accepts_dates_and_timestamps() {
        let date = parse_when("2026-03-01").unwrap();
        assert_eq!(
            focusflow_core::clock::local_date(date),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
        assert!(parse_when("2026-03-01T10:00:00Z").is_ok());
        assert!(parse_when("next tuesday").is_err());
    }

    #[test]
    fn test_status_arguments_parse() {
        let cli = Cli::try_parse_from(["focusflow", "task", "status", "t1", "in_progress"]).unwrap();
        match cli.command {
            Command::Task {
                action: TaskCommand::Status { status, .. },
            } => assert_eq!(status, TaskStatus::InProgress),
            _ => panic!("expected task status command"),
        }
    }
}
