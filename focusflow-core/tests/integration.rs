//! End-to-end tests for the analytics, tracker and planner components
//! sharing one database.

use chrono::{Duration, NaiveDate};
use focusflow_core::clock::{local_at, ManualClock};
use focusflow_core::planner::LlmClient;
use focusflow_core::{
    Clock, Config, Database, Error, GoalInput, NewProject, NewTask, PlanRequest, Result,
    Services, TaskStatus,
};
use std::sync::Arc;
use tempfile::TempDir;

struct OfflineModel;

impl LlmClient for OfflineModel {
    fn complete(&self, _prompt: &str) -> Result<String> {
        Err(Error::Llm("network unreachable".to_string()))
    }
}

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
}

fn setup_with(client: Option<Box<dyn LlmClient>>) -> (Arc<ManualClock>, Services) {
    focusflow_core::logging::init_test();
    let db = Database::open_in_memory().unwrap();
    db.migrate().unwrap();
    let clock = Arc::new(ManualClock::at_local_noon(start_date()));
    let services = Services::new(
        Arc::new(db),
        clock.clone() as Arc<dyn Clock>,
        &Config::default(),
        client,
    );
    (clock, services)
}

fn setup() -> (Arc<ManualClock>, Services) {
    setup_with(None)
}

fn project(services: &Services, user: &str, name: &str) -> String {
    services
        .tracker
        .create_project(
            user,
            NewProject {
                name: name.to_string(),
                ..Default::default()
            },
        )
        .unwrap()
        .id
}

fn task(services: &Services, user: &str, project_id: &str, title: &str) -> String {
    services
        .tracker
        .create_task(
            user,
            project_id,
            NewTask {
                title: title.to_string(),
                ..Default::default()
            },
        )
        .unwrap()
        .id
}

fn complete_on(services: &Services, clock: &ManualClock, user: &str, task_id: &str, day: NaiveDate) {
    clock.set(local_at(day, 12, 0));
    services
        .tracker
        .update_task_status(user, task_id, TaskStatus::Completed)
        .unwrap();
}

// ============================================
// Analytics properties
// ============================================

#[test]
fn test_trend_is_dense_for_any_window() {
    let (clock, services) = setup();
    let p = project(&services, "u", "P");
    let t = task(&services, "u", &p, "t");
    complete_on(&services, &clock, "u", &t, start_date() + Duration::days(3));

    let today = clock.today();
    for days in [1u32, 7, 30, 90, 365] {
        let trend = services.analytics.get_completion_trend("u", days).unwrap();
        assert_eq!(trend.len(), days as usize);
        assert_eq!(trend.last().unwrap().date, today);
        assert!(trend
            .windows(2)
            .all(|w| w[1].date - w[0].date == Duration::days(1)));
    }

    let trend = services.analytics.get_completion_trend("u", 7).unwrap();
    assert_eq!(trend.iter().map(|p| p.count).sum::<i64>(), 1);
    assert_eq!(trend[6].count, 1);
}

#[test]
fn test_streak_resets_after_two_day_gap() {
    let (clock, services) = setup();
    let p = project(&services, "u", "P");
    let d = start_date() + Duration::days(10);
    for (offset, title) in [(2, "a"), (1, "b"), (0, "c")] {
        let t = task(&services, "u", &p, title);
        complete_on(&services, &clock, "u", &t, d - Duration::days(offset));
    }

    let streak = services.analytics.get_streak("u").unwrap();
    assert_eq!((streak.current, streak.best), (3, 3));

    clock.set(local_at(d + Duration::days(2), 12, 0));
    let streak = services.analytics.get_streak("u").unwrap();
    assert_eq!((streak.current, streak.best), (0, 3));
}

#[test]
fn test_reopened_and_recompleted_task_counts_once_per_day() {
    let (clock, services) = setup();
    let p = project(&services, "u", "P");
    let t = task(&services, "u", &p, "t");
    task(&services, "u", &p, "other");

    complete_on(&services, &clock, "u", &t, start_date());
    services
        .tracker
        .update_task_status("u", &t, TaskStatus::Todo)
        .unwrap();
    services
        .tracker
        .update_task_status("u", &t, TaskStatus::Completed)
        .unwrap();

    let trend = services.analytics.get_completion_trend("u", 1).unwrap();
    assert_eq!(trend[0].count, 2);
    let heatmap = services.analytics.get_activity_heatmap("u", 1).unwrap();
    assert_eq!(heatmap.values().sum::<i64>(), 3);
    assert_eq!(services.analytics.get_streak("u").unwrap().current, 1);
}

#[test]
fn test_completion_rate_and_health_bounds() {
    let (clock, services) = setup();
    let p = project(&services, "u", "P");
    let ids: Vec<String> = (0..3).map(|i| task(&services, "u", &p, &format!("t{i}"))).collect();

    let overview = services.analytics.get_overview_stats("u").unwrap();
    assert_eq!(overview.completion_rate, 0);

    complete_on(&services, &clock, "u", &ids[0], start_date());
    let overview = services.analytics.get_overview_stats("u").unwrap();
    assert_eq!(overview.completion_rate, 33);
    assert!((0..=100).contains(&overview.completion_rate));

    // Every remaining task overdue
    for id in &ids[1..] {
        services
            .tracker
            .update_task(
                "u",
                id,
                focusflow_core::TaskUpdate {
                    due_date: Some(Some(clock.now() - Duration::days(3))),
                    ..Default::default()
                },
            )
            .unwrap();
    }
    let health = services.analytics.get_health_score("u").unwrap();
    assert_eq!(health.breakdown.on_time, 0);
    assert!((0..=100).contains(&health.overall));
    assert_eq!(services.analytics.get_overdue_count("u").unwrap(), 2);
}

#[test]
fn test_invalidation_forces_recompute() {
    let (_clock, services) = setup();
    let p = project(&services, "u", "P");
    task(&services, "u", &p, "a");
    assert_eq!(services.analytics.get_overview_stats("u").unwrap().total_tasks, 1);

    // Written behind the tracker's back: stays invisible until invalidated
    let hidden = focusflow_core::Task {
        id: "hidden".to_string(),
        project_id: p.clone(),
        title: "hidden".to_string(),
        description: None,
        priority: Default::default(),
        status: TaskStatus::Todo,
        order: 99,
        due_date: None,
        completed_at: None,
        created_at: chrono::Utc::now(),
    };
    services.db.insert_task(&hidden).unwrap();
    assert_eq!(services.analytics.get_overview_stats("u").unwrap().total_tasks, 1);

    services.analytics.invalidate_user_cache("u");
    assert_eq!(services.analytics.get_overview_stats("u").unwrap().total_tasks, 2);
}

#[test]
fn test_user_with_nothing() {
    let (_clock, services) = setup();
    let overview = services.analytics.get_overview_stats("new-user").unwrap();
    assert_eq!(overview.total_tasks, 0);
    assert_eq!(overview.completed_tasks, 0);
    assert_eq!(overview.completion_rate, 0);

    let streak = services.analytics.get_streak("new-user").unwrap();
    assert_eq!((streak.current, streak.best), (0, 0));

    let health = services.analytics.get_health_score("new-user").unwrap();
    assert_eq!(health.breakdown.completion, 0);
    assert_eq!(health.breakdown.on_time, 100);
    assert!((0..=100).contains(&health.overall));
}

#[test]
fn test_dashboard_lists_recent_and_upcoming() {
    let (clock, services) = setup();
    let p = project(&services, "u", "Launch");
    let done = task(&services, "u", &p, "done");
    let soon = task(&services, "u", &p, "soon");
    let later = task(&services, "u", &p, "later");
    for (id, days) in [(&soon, 2), (&later, 20)] {
        services
            .tracker
            .update_task(
                "u",
                id,
                focusflow_core::TaskUpdate {
                    due_date: Some(Some(clock.now() + Duration::days(days))),
                    ..Default::default()
                },
            )
            .unwrap();
    }
    complete_on(&services, &clock, "u", &done, start_date());

    let dashboard = services.analytics.get_dashboard("u").unwrap();
    assert_eq!(dashboard.recent_completed.len(), 1);
    assert_eq!(dashboard.recent_completed[0].task.id, done);
    assert_eq!(dashboard.recent_completed[0].project_name, "Launch");
    assert_eq!(dashboard.upcoming_deadlines.len(), 1);
    assert_eq!(dashboard.upcoming_deadlines[0].task.id, soon);
    assert_eq!(dashboard.trend.len(), 30);

    let productivity = services.analytics.get_productivity_by_day("u").unwrap();
    assert_eq!(productivity.iter().map(|d| d.completed).sum::<i64>(), 1);
    assert_eq!(productivity.iter().map(|d| d.created).sum::<i64>(), 3);
}

// ============================================
// Planner properties
// ============================================

#[test]
fn test_offline_model_returns_fallback_plan() {
    let (clock, services) = setup_with(Some(Box::new(OfflineModel)));
    let plan = services
        .planner
        .generate_plan("u", &GoalInput::from("Learn Spanish"))
        .unwrap();

    assert_eq!(plan.plan.project_name, "Project: Learn Spanish");
    assert_eq!(plan.plan.tasks.len(), 6);
    assert!(!plan.imported);

    let mut running = 0i64;
    for task in &plan.plan.tasks {
        running += i64::from(task.estimated_days);
        assert_eq!(task.due_date, clock.now() + Duration::days(running));
    }

    let stored = services.planner.get_plan("u", &plan.id).unwrap();
    assert_eq!(stored.plan, plan.plan);
}

#[test]
fn test_future_deadline_bounds_due_dates() {
    let (clock, services) = setup();
    let deadline = clock.now() + Duration::days(12);
    let input = GoalInput::Structured(PlanRequest {
        goal: "Ship the beta".to_string(),
        deadline: Some(deadline),
        ..Default::default()
    });

    let plan = services.planner.generate_plan("u", &input).unwrap();
    assert_eq!(plan.plan.deadline, Some(deadline));
    assert!(plan
        .plan
        .tasks
        .windows(2)
        .all(|w| w[0].due_date <= w[1].due_date));
    assert!(plan.plan.tasks.iter().all(|t| t.due_date <= deadline));
}

#[test]
fn test_past_deadline_makes_every_task_due_today() {
    let (clock, services) = setup();
    let input = GoalInput::Structured(PlanRequest {
        goal: "Catch up".to_string(),
        deadline: Some(clock.now() - Duration::days(1)),
        ..Default::default()
    });

    let plan = services.planner.generate_plan("u", &input).unwrap();
    assert!(plan.plan.tasks.iter().all(|t| t.due_date == clock.now()));
}

#[test]
fn test_import_is_idempotent() {
    let (_clock, services) = setup();
    let plan = services
        .planner
        .generate_plan("u", &GoalInput::from("Write a novel"))
        .unwrap();

    let imported = services.planner.import_plan("u", &plan.id, None).unwrap();
    assert_eq!(imported.project.name, "Project: Write a novel");

    for _ in 0..3 {
        let err = services.planner.import_plan("u", &plan.id, None).unwrap_err();
        assert!(matches!(err, Error::AlreadyImported(_)));
        assert!(err.is_client_error());
    }

    assert_eq!(services.tracker.list_projects("u").unwrap().len(), 1);
    let overview = services.analytics.get_overview_stats("u").unwrap();
    assert_eq!(overview.total_projects, 1);
    assert_eq!(overview.todo_tasks, 6);
}

#[test]
fn test_on_disk_database_persists_plans() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("focusflow.db");
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::at_local_noon(start_date()));

    let plan_id = {
        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        let services = Services::new(Arc::new(db), clock.clone(), &Config::default(), None);
        services
            .planner
            .generate_plan("u", &GoalInput::from("Garden"))
            .unwrap()
            .id
    };

    let db = Database::open(&path).unwrap();
    db.migrate().unwrap();
    let services = Services::new(Arc::new(db), clock, &Config::default(), None);
    let plans = services.planner.list_plans("u", None).unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].id, plan_id);
}
