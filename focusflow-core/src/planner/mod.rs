//! AI plan generation.
//!
//! A goal goes in, a persisted [`AiPlan`] comes out:
//!
//! ```text
//! validate -> prompt -> model -> extract JSON -> normalize tasks
//!                 \ (any failure) -> fallback tasks /
//!                         distribute deadlines -> persist
//! ```
//!
//! Generation never fails once the input is valid: a missing model, a
//! transport error, a timeout or an unusable response all degrade to the
//! fixed fallback plan. Stored plans can be imported into a real project
//! exactly once.

pub mod extract;
pub mod llm;
pub mod prompt;
pub mod schedule;

pub use llm::{create_llm_client, HttpLlmClient, LlmClient};
pub use schedule::DraftTask;

use crate::analytics::AnalyticsEngine;
use crate::clock::Clock;
use crate::config::PlannerConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::tracker::{truncate_chars, validate_name, MAX_NAME_LEN, MAX_TITLE_LEN};
use crate::types::*;
use serde_json::Value;
use std::sync::Arc;

/// Longest accepted goal, in characters.
pub const MAX_GOAL_LEN: usize = 500;

/// Longest accepted additional context, in characters.
pub const MAX_CONTEXT_LEN: usize = 1000;

/// Colour given to projects created from a plan.
pub const IMPORTED_PROJECT_COLOR: &str = "#6366f1";

const DEFAULT_PROJECT_NAME: &str = "Generated Project";
const DEFAULT_PROJECT_DESCRIPTION: &str = "AI generated project";

/// Reject malformed generation input before any model call.
pub fn validate_input(input: &GoalInput) -> Result<()> {
    let goal = input.goal().trim();
    if goal.is_empty() {
        return Err(Error::Validation("goal must not be empty".to_string()));
    }
    if goal.chars().count() > MAX_GOAL_LEN {
        return Err(Error::Validation(format!(
            "goal must be at most {} characters",
            MAX_GOAL_LEN
        )));
    }

    if let GoalInput::Structured(request) = input {
        if let Some(hours) = request.hours_per_day {
            if !(0.5..=12.0).contains(&hours) {
                return Err(Error::Validation(
                    "hoursPerDay must be between 0.5 and 12".to_string(),
                ));
            }
        }
        if let Some(weeks) = request.duration_weeks {
            if !(1..=52).contains(&weeks) {
                return Err(Error::Validation(
                    "durationWeeks must be between 1 and 52".to_string(),
                ));
            }
        }
        if let Some(context) = &request.additional_context {
            if context.chars().count() > MAX_CONTEXT_LEN {
                return Err(Error::Validation(format!(
                    "additionalContext must be at most {} characters",
                    MAX_CONTEXT_LEN
                )));
            }
        }
    }

    Ok(())
}

/// Project outline before due dates are assigned.
#[derive(Debug, Clone, PartialEq)]
struct DraftPlan {
    project_name: String,
    project_description: String,
    tasks: Vec<DraftTask>,
}

impl DraftPlan {
    fn fallback(goal: &str) -> Self {
        Self {
            project_name: format!("Project: {}", goal),
            project_description: format!("A project to achieve: {}", goal),
            tasks: schedule::fallback_tasks(),
        }
    }

    /// Normalize a parsed model response. A plan without tasks is unusable.
    fn from_response(value: &Value) -> Result<Self> {
        let text = |key: &str, default: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(default)
                .to_string()
        };

        let tasks: Vec<DraftTask> = value
            .get("tasks")
            .and_then(Value::as_array)
            .map(|tasks| tasks.iter().map(schedule::normalize_task).collect())
            .unwrap_or_default();
        if tasks.is_empty() {
            return Err(Error::Llm("model response contained no tasks".to_string()));
        }

        Ok(Self {
            project_name: text("projectName", DEFAULT_PROJECT_NAME),
            project_description: text("projectDescription", DEFAULT_PROJECT_DESCRIPTION),
            tasks,
        })
    }
}

/// Generates, stores and imports plans.
pub struct PlanGenerator {
    db: Arc<Database>,
    analytics: Arc<AnalyticsEngine>,
    clock: Arc<dyn Clock>,
    client: Option<Box<dyn LlmClient>>,
    config: PlannerConfig,
}

impl PlanGenerator {
    /// Without a `client` every generation uses the fallback plan.
    pub fn new(
        db: Arc<Database>,
        analytics: Arc<AnalyticsEngine>,
        clock: Arc<dyn Clock>,
        client: Option<Box<dyn LlmClient>>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            db,
            analytics,
            clock,
            client,
            config,
        }
    }

    /// Generate and persist a plan for `input`.
    ///
    /// Only invalid input is an error; generation failures fall back.
    pub fn generate_plan(&self, user_id: &str, input: &GoalInput) -> Result<AiPlan> {
        validate_input(input)?;
        let goal = input.goal().trim().to_string();

        let draft = match self.request_draft(input) {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Plan generation failed; using fallback plan");
                DraftPlan::fallback(&goal)
            }
        };

        let now = self.clock.now();
        let deadline = input.deadline();
        let plan = AiPlan {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            goal,
            context: input.context(),
            plan: GeneratedPlan {
                project_name: draft.project_name,
                project_description: draft.project_description,
                deadline,
                tasks: schedule::distribute_deadlines(draft.tasks, now, deadline),
            },
            imported: false,
            imported_project_id: None,
            created_at: now,
        };

        self.db.insert_ai_plan(&plan)?;
        tracing::info!(
            user_id,
            plan_id = %plan.id,
            tasks = plan.plan.tasks.len(),
            "Stored generated plan"
        );
        Ok(plan)
    }

    fn request_draft(&self, input: &GoalInput) -> Result<DraftPlan> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| Error::Llm("no model configured".to_string()))?;

        let raw = client.complete(&prompt::build_prompt(input))?;
        let value = extract::parse_json_object(&raw)?;
        DraftPlan::from_response(&value)
    }

    /// A plan owned by `user_id`.
    pub fn get_plan(&self, user_id: &str, plan_id: &str) -> Result<AiPlan> {
        self.db
            .get_ai_plan(plan_id)?
            .filter(|plan| plan.user_id == user_id)
            .ok_or_else(|| Error::not_found("plan", plan_id))
    }

    /// A user's plans, newest first. `None` uses the configured history limit.
    pub fn list_plans(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<AiPlan>> {
        self.db
            .list_ai_plans(user_id, limit.unwrap_or(self.config.history_limit))
    }

    /// Materialize a plan into a project with one task per planned task.
    ///
    /// Fails with [`Error::AlreadyImported`] on any attempt after the first.
    pub fn import_plan(
        &self,
        user_id: &str,
        plan_id: &str,
        project_name: Option<&str>,
    ) -> Result<ImportedProject> {
        let plan = self.get_plan(user_id, plan_id)?;
        if plan.imported {
            return Err(Error::AlreadyImported(plan_id.to_string()));
        }

        let name = match project_name {
            Some(name) => validate_name(name)?,
            None => truncate_chars(&plan.plan.project_name, MAX_NAME_LEN),
        };

        let now = self.clock.now();
        let project = Project {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name,
            description: Some(plan.plan.project_description.clone()),
            color: Some(IMPORTED_PROJECT_COLOR.to_string()),
            status: ProjectStatus::Active,
            priority: Priority::Medium,
            deadline: plan.plan.deadline,
            created_at: now,
        };

        let tasks: Vec<Task> = plan
            .plan
            .tasks
            .iter()
            .enumerate()
            .map(|(index, planned)| Task {
                id: uuid::Uuid::new_v4().to_string(),
                project_id: project.id.clone(),
                title: import_title(&planned.title),
                description: Some(planned.description.clone()).filter(|d| !d.is_empty()),
                priority: planned.priority,
                status: TaskStatus::Todo,
                order: index as i64,
                due_date: Some(planned.due_date),
                completed_at: None,
                created_at: now,
            })
            .collect();

        self.db.import_ai_plan(plan_id, &project, &tasks)?;
        self.analytics.invalidate_user_cache(user_id);
        tracing::info!(
            user_id,
            plan_id,
            project_id = %project.id,
            tasks = tasks.len(),
            "Imported plan"
        );

        Ok(ImportedProject { project, tasks })
    }

    /// Delete a plan that has not been imported.
    pub fn delete_plan(&self, user_id: &str, plan_id: &str) -> Result<()> {
        self.get_plan(user_id, plan_id)?;
        self.db.delete_ai_plan(plan_id)?;
        tracing::info!(user_id, plan_id, "Deleted plan");
        Ok(())
    }
}

/// Task title for an imported plan task, held to the same limits as
/// titles entered through the tracker.
fn import_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        schedule::UNTITLED_TASK.to_string()
    } else {
        truncate_chars(trimmed, MAX_TITLE_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, Utc};
    use std::sync::Mutex;

    struct MockClient {
        response: Result<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl MockClient {
        fn replying(text: &str) -> Self {
            Self {
                response: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                response: Err(Error::Llm("connection refused".to_string())),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl LlmClient for MockClient {
        fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(Error::Llm(e.to_string())),
            }
        }
    }

    fn setup(client: Option<Box<dyn LlmClient>>) -> (Arc<Database>, PlanGenerator) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.migrate().unwrap();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Utc::now()));
        let analytics = Arc::new(AnalyticsEngine::with_defaults(db.clone(), clock.clone()));
        let generator = PlanGenerator::new(
            db.clone(),
            analytics,
            clock,
            client,
            PlannerConfig::default(),
        );
        (db, generator)
    }

    const MODEL_REPLY: &str = r#"Here you go:
```json
{
  "projectName": "Conversational Spanish",
  "projectDescription": "Reach B1 in six months",
  "tasks": [
    {"title": "Pick a course", "description": "Compare apps", "priority": "HIGH", "estimatedDays": 7},
    {"title": "", "priority": "whenever"},
    {"title": "Daily practice", "priority": "LOW", "estimatedDays": 3}
  ]
}
```"#;

    #[test]
    fn test_validation() {
        assert!(validate_input(&GoalInput::from("   ")).is_err());
        assert!(validate_input(&GoalInput::from("x".repeat(501).as_str())).is_err());
        assert!(validate_input(&GoalInput::from("Learn Spanish")).is_ok());

        let structured = |hours: Option<f64>, weeks: Option<u32>| {
            GoalInput::Structured(PlanRequest {
                goal: "Learn Spanish".to_string(),
                hours_per_day: hours,
                duration_weeks: weeks,
                ..Default::default()
            })
        };
        assert!(validate_input(&structured(Some(0.25), None)).is_err());
        assert!(validate_input(&structured(Some(13.0), None)).is_err());
        assert!(validate_input(&structured(None, Some(0))).is_err());
        assert!(validate_input(&structured(None, Some(53))).is_err());
        assert!(validate_input(&structured(Some(2.0), Some(8))).is_ok());
    }

    #[test]
    fn test_invalid_input_never_reaches_model() {
        let (_db, generator) = setup(Some(Box::new(MockClient::failing())));
        let err = generator.generate_plan("u", &GoalInput::from("")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_model_reply_is_normalized() {
        let (db, generator) = setup(Some(Box::new(MockClient::replying(MODEL_REPLY))));
        let plan = generator
            .generate_plan("u", &GoalInput::from("Learn Spanish"))
            .unwrap();

        assert_eq!(plan.plan.project_name, "Conversational Spanish");
        assert_eq!(plan.plan.tasks.len(), 3);
        assert_eq!(plan.plan.tasks[1].title, "Untitled Task");
        assert_eq!(plan.plan.tasks[1].priority, Priority::Medium);
        assert_eq!(plan.plan.tasks[1].estimated_days, 5);
        assert_eq!(
            plan.plan.tasks[2].due_date,
            plan.created_at + Duration::days(15)
        );

        let stored = db.get_ai_plan(&plan.id).unwrap().unwrap();
        assert_eq!(stored.plan, plan.plan);
        assert_eq!(stored.context, serde_json::json!({ "goal": "Learn Spanish" }));
    }

    #[test]
    fn test_model_failure_uses_fallback() {
        let (_db, generator) = setup(Some(Box::new(MockClient::failing())));
        let plan = generator
            .generate_plan("u", &GoalInput::from("Learn Spanish"))
            .unwrap();
        assert_eq!(plan.plan.project_name, "Project: Learn Spanish");
        assert_eq!(plan.plan.tasks.len(), 6);
        assert!(!plan.imported);
    }

    #[test]
    fn test_empty_task_list_uses_fallback() {
        let reply = r#"{"projectName": "Nothing", "tasks": []}"#;
        let (_db, generator) = setup(Some(Box::new(MockClient::replying(reply))));
        let plan = generator.generate_plan("u", &GoalInput::from("Read")).unwrap();
        assert_eq!(plan.plan.project_name, "Project: Read");
        assert_eq!(plan.plan.tasks[0].title, "Research and Planning");
    }

    #[test]
    fn test_missing_project_fields_get_defaults() {
        let reply = r#"{"tasks": [{"title": "Only task", "priority": "HIGH"}]}"#;
        let (_db, generator) = setup(Some(Box::new(MockClient::replying(reply))));
        let plan = generator.generate_plan("u", &GoalInput::from("Read")).unwrap();
        assert_eq!(plan.plan.project_name, "Generated Project");
        assert_eq!(plan.plan.project_description, "AI generated project");
        assert_eq!(plan.plan.tasks[0].estimated_days, 10);
    }

    #[test]
    fn test_import_creates_project_once() {
        let (db, generator) = setup(None);
        let plan = generator
            .generate_plan("alice", &GoalInput::from("Learn Spanish"))
            .unwrap();

        let imported = generator
            .import_plan("alice", &plan.id, Some("Spanish 2026"))
            .unwrap();
        assert_eq!(imported.project.name, "Spanish 2026");
        assert_eq!(imported.project.color.as_deref(), Some(IMPORTED_PROJECT_COLOR));
        assert_eq!(imported.tasks.len(), 6);
        assert!(imported
            .tasks
            .iter()
            .enumerate()
            .all(|(i, t)| t.order == i as i64 && t.due_date.is_some()));

        let err = generator.import_plan("alice", &plan.id, None).unwrap_err();
        assert!(matches!(err, Error::AlreadyImported(_)));
        assert_eq!(db.count_projects("alice", None).unwrap(), 1);

        let stored = generator.get_plan("alice", &plan.id).unwrap();
        assert_eq!(stored.state(), PlanState::Imported);
        assert_eq!(
            stored.imported_project_id.as_deref(),
            Some(imported.project.id.as_str())
        );
    }

    #[test]
    fn test_other_users_plan_is_not_found() {
        let (_db, generator) = setup(None);
        let plan = generator
            .generate_plan("alice", &GoalInput::from("Learn Spanish"))
            .unwrap();

        assert!(matches!(
            generator.get_plan("bob", &plan.id),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            generator.import_plan("bob", &plan.id, None),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            generator.delete_plan("bob", &plan.id),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_only_from_generated() {
        let (_db, generator) = setup(None);
        let kept = generator.generate_plan("u", &GoalInput::from("A")).unwrap();
        let dropped = generator.generate_plan("u", &GoalInput::from("B")).unwrap();

        generator.delete_plan("u", &dropped.id).unwrap();
        assert!(matches!(
            generator.get_plan("u", &dropped.id),
            Err(Error::NotFound { .. })
        ));

        generator.import_plan("u", &kept.id, None).unwrap();
        assert!(matches!(
            generator.delete_plan("u", &kept.id),
            Err(Error::AlreadyImported(_))
        ));
    }

    #[test]
    fn test_import_name_override_is_validated() {
        let (_db, generator) = setup(None);
        let plan = generator.generate_plan("u", &GoalInput::from("A")).unwrap();
        assert!(matches!(
            generator.import_plan("u", &plan.id, Some("")),
            Err(Error::Validation(_))
        ));
        assert!(!generator.get_plan("u", &plan.id).unwrap().imported);
    }

    #[test]
    fn test_absurd_estimate_from_model_gets_priority_default() {
        let reply = r#"{"projectName": "X", "tasks": [{"title": "a", "estimatedDays": 4000000000}]}"#;
        let (_db, generator) = setup(Some(Box::new(MockClient::replying(reply))));
        let plan = generator.generate_plan("u", &GoalInput::from("Read")).unwrap();

        assert_eq!(plan.plan.project_name, "X");
        assert_eq!(plan.plan.tasks[0].estimated_days, 5);
        assert_eq!(
            plan.plan.tasks[0].due_date,
            plan.created_at + Duration::days(5)
        );
    }

    #[test]
    fn test_braces_after_the_plan_are_ignored() {
        let reply = "Here is the plan: {\"projectName\": \"Spanish\", \"tasks\": [{\"title\": \"Verbs\"}]}\nTip: reply with {\"more\": true} for extra tasks.";
        let (_db, generator) = setup(Some(Box::new(MockClient::replying(reply))));
        let plan = generator.generate_plan("u", &GoalInput::from("Spanish")).unwrap();

        assert_eq!(plan.plan.project_name, "Spanish");
        assert_eq!(plan.plan.tasks.len(), 1);
        assert_eq!(plan.plan.tasks[0].title, "Verbs");
    }

    #[test]
    fn test_import_holds_titles_to_task_limits() {
        let (db, generator) = setup(None);
        let mut stored = generator.generate_plan("u", &GoalInput::from("A")).unwrap();
        stored.id = "legacy".to_string();
        stored.plan.tasks[0].title = "y".repeat(MAX_TITLE_LEN + 100);
        stored.plan.tasks[1].title = "   ".to_string();
        db.insert_ai_plan(&stored).unwrap();

        let imported = generator.import_plan("u", "legacy", None).unwrap();
        assert_eq!(imported.tasks[0].title.chars().count(), MAX_TITLE_LEN);
        assert_eq!(imported.tasks[1].title, schedule::UNTITLED_TASK);
        assert_eq!(imported.tasks[2].title, stored.plan.tasks[2].title);
    }

    #[test]
    fn test_deleting_imported_plan_keeps_it() {
        let (db, generator) = setup(None);
        let plan = generator.generate_plan("u", &GoalInput::from("A")).unwrap();
        generator.import_plan("u", &plan.id, None).unwrap();

        assert!(matches!(
            db.delete_ai_plan(&plan.id),
            Err(Error::AlreadyImported(_))
        ));
        assert!(generator.get_plan("u", &plan.id).unwrap().imported);
    }
}
