//! Text and JSON rendering for command results.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use focusflow_core::analytics::{
    DashboardData, HealthScore, OverviewStats, Streak, TrendPoint, WeekdayActivity,
};
use focusflow_core::{AiPlan, ImportedProject, Project, Task, TaskWithProject};
use serde::Serialize;

use crate::Format;

pub struct Printer {
    format: Format,
}

impl Printer {
    pub fn new(format: Format) -> Self {
        Self { format }
    }

    /// Print `value` as pretty JSON, or fall back to `text` for human output.
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce()) -> Result<()> {
        match self.format {
            Format::Json => println!("{}", serde_json::to_string_pretty(value)?),
            Format::Text => text(),
        }
        Ok(())
    }

    pub fn done(&self, message: &str) -> Result<()> {
        self.emit(&serde_json::json!({ "ok": true, "message": message }), || {
            println!("{}", message)
        })
    }

    pub fn project(&self, project: &Project) -> Result<()> {
        self.emit(project, || print_project(project))
    }

    pub fn projects(&self, projects: &[Project]) -> Result<()> {
        self.emit(&projects, || {
            if projects.is_empty() {
                println!("No projects yet. Create one with 'focusflow project add <name>'.");
            }
            for project in projects {
                print_project(project);
            }
        })
    }

    pub fn task(&self, task: &Task) -> Result<()> {
        self.emit(task, || print_task(task))
    }

    pub fn tasks(&self, tasks: &[Task]) -> Result<()> {
        self.emit(&tasks, || {
            if tasks.is_empty() {
                println!("No tasks in this project.");
            }
            for task in tasks {
                print_task(task);
            }
        })
    }

    pub fn overview(&self, stats: &OverviewStats) -> Result<()> {
        self.emit(stats, || print_overview(stats))
    }

    pub fn trend(&self, trend: &[TrendPoint]) -> Result<()> {
        self.emit(&trend, || print_trend(trend))
    }

    pub fn heatmap(&self, heatmap: &BTreeMap<String, i64>) -> Result<()> {
        self.emit(heatmap, || {
            if heatmap.is_empty() {
                println!("No activity in this window.");
            }
            for (date, count) in heatmap {
                println!("{}  {:>3}", date, count);
            }
        })
    }

    pub fn streak(&self, streak: &Streak) -> Result<()> {
        self.emit(streak, || {
            println!("Current streak: {} day(s)", streak.current);
            println!("Best streak:    {} day(s)", streak.best);
        })
    }

    pub fn health(&self, health: &HealthScore) -> Result<()> {
        self.emit(health, || print_health(health))
    }

    pub fn productivity(&self, days: &[WeekdayActivity]) -> Result<()> {
        self.emit(&days, || {
            println!("{:<10} {:>9} {:>8}", "Day", "Completed", "Created");
            for day in days {
                println!("{:<10} {:>9} {:>8}", day.day, day.completed, day.created);
            }
        })
    }

    pub fn dashboard(&self, dashboard: &DashboardData) -> Result<()> {
        self.emit(dashboard, || {
            print_overview(&dashboard.overview);
            println!();
            print_health(&dashboard.health);
            println!();
            println!("Overdue tasks: {}", dashboard.overdue_count);
            print_task_list("Recently completed", &dashboard.recent_completed, |t| {
                t.task.completed_at
            });
            print_task_list("Upcoming deadlines", &dashboard.upcoming_deadlines, |t| {
                t.task.due_date
            });
            println!();
            print_trend(&dashboard.trend);
        })
    }

    pub fn plan(&self, plan: &AiPlan) -> Result<()> {
        self.emit(plan, || print_plan(plan))
    }

    pub fn plans(&self, plans: &[AiPlan]) -> Result<()> {
        self.emit(&plans, || {
            if plans.is_empty() {
                println!("No plans yet. Generate one with 'focusflow plan generate <goal>'.");
            }
            for plan in plans {
                println!(
                    "{}  {}  {} task(s)  {}{}",
                    plan.id,
                    format_time(plan.created_at),
                    plan.plan.tasks.len(),
                    plan.goal,
                    if plan.imported { "  [imported]" } else { "" }
                );
            }
        })
    }

    pub fn imported(&self, imported: &ImportedProject) -> Result<()> {
        self.emit(imported, || {
            println!(
                "Imported plan as project {} with {} task(s)",
                imported.project.id,
                imported.tasks.len()
            );
            print_project(&imported.project);
            for task in &imported.tasks {
                print_task(task);
            }
        })
    }
}

fn format_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn format_date(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.with_timezone(&Local).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_project(project: &Project) {
    println!(
        "{}  {:<9} {:<6} due {}  {}",
        project.id,
        project.status.as_str(),
        project.priority.as_str(),
        format_date(project.deadline),
        project.name
    );
}

fn print_task(task: &Task) {
    println!(
        "{:>3}. {}  {:<11} {:<6} due {}  {}",
        task.order,
        task.id,
        task.status.as_str(),
        task.priority.as_str(),
        format_date(task.due_date),
        task.title
    );
}

fn print_task_list(
    heading: &str,
    tasks: &[TaskWithProject],
    when: impl Fn(&TaskWithProject) -> Option<DateTime<Utc>>,
) {
    println!("{}:", heading);
    if tasks.is_empty() {
        println!("  (none)");
    }
    for item in tasks {
        println!(
            "  {}  {}  ({})",
            format_date(when(item)),
            item.task.title,
            item.project_name
        );
    }
}

fn print_overview(stats: &OverviewStats) {
    println!(
        "Projects: {} total, {} active, {} completed",
        stats.total_projects, stats.active_projects, stats.completed_projects
    );
    println!(
        "Tasks:    {} total, {} todo, {} in progress, {} completed ({}%)",
        stats.total_tasks,
        stats.todo_tasks,
        stats.in_progress_tasks,
        stats.completed_tasks,
        stats.completion_rate
    );
    println!(
        "Streak:   {} day(s) current, {} day(s) best",
        stats.current_streak, stats.best_streak
    );
}

fn print_health(health: &HealthScore) {
    println!("Health score: {}/100", health.overall);
    println!("  consistency      {:>3}", health.breakdown.consistency);
    println!("  completion       {:>3}", health.breakdown.completion);
    println!("  on time          {:>3}", health.breakdown.on_time);
    println!("  active projects  {:>3}", health.breakdown.active_projects);
}

fn print_trend(trend: &[TrendPoint]) {
    println!("Completions per day:");
    for point in trend {
        println!(
            "  {}  {:>3} {}",
            point.date,
            point.count,
            "#".repeat(point.count.clamp(0, 50) as usize)
        );
    }
}

fn print_plan(plan: &AiPlan) {
    println!("Plan {} ({:?})", plan.id, plan.state());
    println!("Goal:    {}", plan.goal);
    println!("Project: {}", plan.plan.project_name);
    println!("         {}", plan.plan.project_description);
    if let Some(deadline) = plan.plan.deadline {
        println!("Deadline: {}", format_date(Some(deadline)));
    }
    for (i, task) in plan.plan.tasks.iter().enumerate() {
        let days = task.adjusted_days.unwrap_or(task.estimated_days);
        println!(
            "{:>3}. [{:<6}] {}  ({} day(s), due {})",
            i + 1,
            task.priority.as_str(),
            task.title,
            days,
            format_date(Some(task.due_date))
        );
        if !task.description.is_empty() {
            println!("       {}", task.description);
        }
    }
}
