//! Prompt construction for plan generation.

use crate::types::GoalInput;
use std::fmt::Write;

const RESPONSE_SHAPE: &str = r#"Return a JSON response with this exact structure:
{
  "projectName": "Clear project name",
  "projectDescription": "Brief description",
  "tasks": [
    {
      "title": "Task title",
      "description": "Task description",
      "priority": "HIGH|MEDIUM|LOW",
      "estimatedDays": 7
    }
  ]
}

Create 5-8 actionable tasks. For estimatedDays: HIGH priority = 7-14 days, MEDIUM = 3-7 days, LOW = 1-3 days."#;

/// Build the planning prompt for a goal and its optional context.
pub fn build_prompt(input: &GoalInput) -> String {
    let mut prompt = format!(
        "You are a project planning assistant. Create a detailed project plan for the following goal: \"{}\"",
        input.goal().trim()
    );

    if let GoalInput::Structured(request) = input {
        let mut context = String::new();
        if let Some(experience) = request.experience {
            let _ = writeln!(context, "- Experience level: {}", experience.as_str());
        }
        if let Some(hours) = request.hours_per_day {
            let _ = writeln!(context, "- Available time: {} hours per day", hours);
        }
        if let Some(weeks) = request.duration_weeks {
            let _ = writeln!(context, "- Desired duration: {} weeks", weeks);
        }
        if !request.focus_areas.is_empty() {
            let _ = writeln!(context, "- Focus areas: {}", request.focus_areas.join(", "));
        }
        if let Some(extra) = request.additional_context.as_deref().map(str::trim) {
            if !extra.is_empty() {
                let _ = writeln!(context, "- Additional context: {}", extra);
            }
        }
        if !context.is_empty() {
            prompt.push_str("\n\nAbout the user:\n");
            prompt.push_str(context.trim_end());
        }
    }

    if let Some(deadline) = input.deadline() {
        let _ = write!(
            prompt,
            "\n\nIMPORTANT: The user wants to complete this by {}. Create a realistic timeline that fits within this deadline.",
            deadline.format("%Y-%m-%d")
        );
    }

    prompt.push_str("\n\n");
    prompt.push_str(RESPONSE_SHAPE);
    prompt
}
