//! Versioned prompt templates
//!
//! The template text is an external contract with the LLM. Bump the version
//! constant whenever the wording changes.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::models::{ProjectSummary, TaskSnapshot, TaskSummary};

pub const SCHEDULE_TEMPLATE_VERSION: &str = "schedule-optimization/v1";
pub const SUGGESTION_TEMPLATE_VERSION: &str = "task-suggestion/v1";

const SCHEDULE_OPTIMIZATION_TEMPLATE: &str = "\
You are an AI project management assistant. I need you to optimize the schedule for the following tasks, taking into account dependencies, priorities, and deadlines.

Here are the current tasks:
{tasks_json}

The current date is {current_date}.

Please analyze these tasks and provide an optimized schedule by:
1. Identifying the most critical tasks based on priority and due dates
2. Suggesting adjusted due dates if needed to create a more realistic schedule
3. Reprioritizing tasks where appropriate
4. Ensuring a balanced workload

FORMAT YOUR RESPONSE AS A JSON ARRAY with the same structure as the input tasks, but with optimized 'due_date' and potentially updated 'priority' fields.
The JSON should include all task fields from the original tasks, especially preserving the 'id' field.
Only modify the 'due_date' and 'priority' fields.
";

const TASK_SUGGESTION_TEMPLATE: &str = "\
You are an AI project management assistant. Based on the project information below, suggest {num_suggestions} tasks that should be created to help the project move forward effectively.

Project name: {project_name}
Project description: {project_description}
Project category: {project_category}
Project status: {project_status}
Project priority: {project_priority}
Project start date: {project_start_date}
Project end date: {project_end_date}
Project completion percentage: {project_completion}%

Current tasks:
{current_tasks}

For each task suggestion, provide:
1. A clear, concise title
2. A detailed description
3. An appropriate priority level (low, medium, high, or urgent)
4. Estimated hours to complete
5. Suggested due date
6. Relevant tags
7. A rationale for why this task is important

FORMAT YOUR RESPONSE AS A JSON ARRAY WITH EACH TASK AS A JSON OBJECT.
";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Fills `{name}` placeholders in a single pass over the template.
///
/// Inserted values are never rescanned, so placeholder-like text inside task
/// or project fields comes through verbatim. Unknown placeholders are kept.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let filled = tail.find('}').and_then(|close| {
            let name = &tail[1..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (close, *value))
        });

        match filled {
            Some((close, value)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Renders the schedule optimization prompt
pub fn schedule_prompt(tasks: &[TaskSnapshot], now: DateTime<Utc>) -> String {
    let rows: Vec<Value> = tasks
        .iter()
        .map(|t| {
            json!({
                "id": t.id.value(),
                "title": t.title,
                "description": t.description,
                "status": t.status.as_str(),
                "priority": t.priority.as_str(),
                "project_id": t.project_id,
                "due_date": t.due_date.to_rfc3339(),
                "estimated_hours": t.estimated_hours,
                "actual_hours": t.actual_hours,
                "assignee_id": t.assignee_id,
            })
        })
        .collect();

    // Alternate Display on a Value is the pretty printer and cannot fail.
    let tasks_json = format!("{:#}", Value::Array(rows));
    let current_date = now.format(DATE_FORMAT).to_string();

    render(
        SCHEDULE_OPTIMIZATION_TEMPLATE,
        &[
            ("tasks_json", tasks_json.as_str()),
            ("current_date", current_date.as_str()),
        ],
    )
}

/// Renders the task suggestion prompt
pub fn suggestion_prompt(
    project: &ProjectSummary,
    existing_tasks: &[TaskSummary],
    count: usize,
) -> String {
    let current_tasks = if existing_tasks.is_empty() {
        "No tasks created yet.".to_string()
    } else {
        existing_tasks
            .iter()
            .enumerate()
            .map(|(i, t)| {
                format!(
                    "{}. {} - Status: {}, Priority: {}",
                    i + 1,
                    t.title,
                    t.status.as_str(),
                    t.priority
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let end_date = project
        .end_date
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| "not set".to_string());

    let count = count.to_string();
    let start_date = project.start_date.format(DATE_FORMAT).to_string();
    let completion = project.completion_percentage.to_string();

    render(
        TASK_SUGGESTION_TEMPLATE,
        &[
            ("num_suggestions", count.as_str()),
            ("project_name", project.name.as_str()),
            ("project_description", project.description.as_str()),
            ("project_category", project.category.as_str()),
            ("project_status", project.status.as_str()),
            ("project_priority", project.priority.as_str()),
            ("project_start_date", start_date.as_str()),
            ("project_end_date", end_date.as_str()),
            ("project_completion", completion.as_str()),
            ("current_tasks", current_tasks.as_str()),
        ],
    )
}
