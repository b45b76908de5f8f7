//! Task suggestion generator
//!
//! Proposes new tasks for a project. The oracle is asked first; its drafts are
//! coerced field by field with safe defaults. Without usable oracle output the
//! generator falls back to a fixed template bank per project stage.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use lazy_static::lazy_static;
use serde::Serialize;
use serde_json::Value;

use crate::merge::parse_due_date;
use crate::models::{
    DraftProposal, Priority, ProjectStatus, ProjectSummary, TaskSuggestionDraft, TaskSummary,
};
use crate::optimizer::{with_deadline, FallbackReason, OutcomeSource};
use crate::oracle::Oracle;

pub const DEFAULT_SUGGESTION_COUNT: usize = 3;
pub const UNTITLED_TASK: &str = "Untitled Task";
pub const DEFAULT_ESTIMATED_HOURS: f64 = 2.0;
pub const DEFAULT_DUE_DAYS: i64 = 7;
const MAX_TEMPLATE_DUE_DAYS: i64 = 14;

/// A canned suggestion used when the oracle has nothing to offer
#[derive(Debug, Clone, Copy)]
pub struct SuggestionTemplate {
    pub title: &'static str,
    pub description: &'static str,
    pub priority: Priority,
    pub estimated_hours: f64,
    pub tags: &'static [&'static str],
    pub rationale: &'static str,
}

lazy_static! {
    static ref TEMPLATE_BANKS: HashMap<ProjectStatus, Vec<SuggestionTemplate>> = {
        let mut banks = HashMap::new();
        banks.insert(
            ProjectStatus::Planning,
            vec![
                SuggestionTemplate {
                    title: "Create project requirements document",
                    description: "Define the detailed requirements for the project including all features, constraints, and acceptance criteria.",
                    priority: Priority::High,
                    estimated_hours: 6.0,
                    tags: &["documentation", "planning"],
                    rationale: "A clear requirements document is essential for project success.",
                },
                SuggestionTemplate {
                    title: "Define project milestones and timeline",
                    description: "Break down the project into key milestones with specific deadlines to track progress effectively.",
                    priority: Priority::High,
                    estimated_hours: 4.0,
                    tags: &["planning", "timeline"],
                    rationale: "Proper timeline planning is critical for meeting the project deadline.",
                },
                SuggestionTemplate {
                    title: "Create resource allocation plan",
                    description: "Identify all resources needed for the project and create a plan for their allocation.",
                    priority: Priority::Medium,
                    estimated_hours: 3.0,
                    tags: &["planning", "resources"],
                    rationale: "Resource planning prevents bottlenecks during project execution.",
                },
            ],
        );
        banks.insert(
            ProjectStatus::Active,
            vec![
                SuggestionTemplate {
                    title: "Conduct weekly progress review",
                    description: "Review the progress of all ongoing tasks and identify any bottlenecks or issues.",
                    priority: Priority::Medium,
                    estimated_hours: 2.0,
                    tags: &["review", "meeting"],
                    rationale: "Regular reviews help keep the project on track.",
                },
                SuggestionTemplate {
                    title: "Update project documentation",
                    description: "Ensure all project documentation is up-to-date with the latest changes and decisions.",
                    priority: Priority::Low,
                    estimated_hours: 3.0,
                    tags: &["documentation", "maintenance"],
                    rationale: "Maintaining documentation is important for knowledge sharing and future reference.",
                },
                SuggestionTemplate {
                    title: "Prepare progress report for stakeholders",
                    description: "Create a detailed progress report highlighting achievements, challenges, and next steps.",
                    priority: Priority::Medium,
                    estimated_hours: 2.5,
                    tags: &["reporting", "communication"],
                    rationale: "Keeping stakeholders informed is crucial for project support.",
                },
            ],
        );
        banks.insert(
            ProjectStatus::OnHold,
            vec![
                SuggestionTemplate {
                    title: "Document current project status",
                    description: "Create a detailed document capturing the current state of the project before on-hold period.",
                    priority: Priority::High,
                    estimated_hours: 4.0,
                    tags: &["documentation", "status"],
                    rationale: "Proper documentation will facilitate smooth resumption of the project.",
                },
                SuggestionTemplate {
                    title: "Identify blockers preventing project progress",
                    description: "Analyze and document all blockers that led to the project being put on hold.",
                    priority: Priority::High,
                    estimated_hours: 3.0,
                    tags: &["analysis", "blockers"],
                    rationale: "Understanding blockers is the first step to resolving them.",
                },
                SuggestionTemplate {
                    title: "Create resumption plan",
                    description: "Develop a detailed plan for resuming the project once the on-hold status is lifted.",
                    priority: Priority::Medium,
                    estimated_hours: 4.0,
                    tags: &["planning", "strategy"],
                    rationale: "A proper resumption plan will minimize delays when the project restarts.",
                },
            ],
        );
        banks.insert(
            ProjectStatus::Completed,
            vec![
                SuggestionTemplate {
                    title: "Conduct project retrospective",
                    description: "Analyze what went well and what could be improved for future projects.",
                    priority: Priority::Medium,
                    estimated_hours: 3.0,
                    tags: &["analysis", "closing"],
                    rationale: "Learning from completed projects improves future performance.",
                },
                SuggestionTemplate {
                    title: "Create project closure report",
                    description: "Document the final state of the project, achievements, and any outstanding items.",
                    priority: Priority::High,
                    estimated_hours: 5.0,
                    tags: &["documentation", "closing"],
                    rationale: "Proper closure documentation is important for organizational knowledge.",
                },
                SuggestionTemplate {
                    title: "Plan maintenance and support activities",
                    description: "Define the approach for ongoing maintenance and support of the project deliverables.",
                    priority: Priority::Medium,
                    estimated_hours: 4.0,
                    tags: &["planning", "maintenance"],
                    rationale: "Planning for maintenance ensures the long-term success of the project.",
                },
            ],
        );
        banks
    };
}

/// Template bank for a project stage
pub fn templates_for(status: ProjectStatus) -> &'static [SuggestionTemplate] {
    TEMPLATE_BANKS
        .get(&status)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Due date for a template draft: two days per estimated hour, capped at two
/// weeks, and kept at least a day before the project's end date.
pub fn template_due_date(
    estimated_hours: f64,
    project_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let days = ((estimated_hours * 2.0).trunc() as i64).clamp(0, MAX_TEMPLATE_DUE_DAYS);
    let due_date = now + ChronoDuration::days(days);

    match project_end {
        Some(end) if due_date > end => end - ChronoDuration::days(1),
        _ => due_date,
    }
}

/// Deterministic suggestions from the project's template bank
pub fn fallback_suggestions(
    project: &ProjectSummary,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<TaskSuggestionDraft> {
    templates_for(project.status)
        .iter()
        .take(count)
        .map(|template| TaskSuggestionDraft {
            title: template.title.to_string(),
            description: template.description.to_string(),
            priority: template.priority,
            estimated_hours: template.estimated_hours,
            due_date: template_due_date(template.estimated_hours, project.end_date, now),
            tags: template.tags.iter().map(|t| t.to_string()).collect(),
            rationale: template.rationale.to_string(),
        })
        .collect()
}

/// Coerces one raw oracle object into a draft, defaulting each bad field.
pub fn coerce_draft(proposal: &DraftProposal, now: DateTime<Utc>) -> TaskSuggestionDraft {
    let title = proposal
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED_TASK)
        .to_string();

    let description = string_field(proposal, "description");
    let rationale = string_field(proposal, "rationale");

    let priority = proposal
        .get("priority")
        .and_then(Value::as_str)
        .and_then(Priority::parse_strict)
        .unwrap_or(Priority::Medium);

    let estimated_hours = proposal
        .get("estimated_hours")
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|h| h.is_finite() && *h >= 0.0)
        .unwrap_or(DEFAULT_ESTIMATED_HOURS);

    let due_date = proposal
        .get("due_date")
        .and_then(|v| parse_due_date(v).ok())
        .unwrap_or_else(|| now + ChronoDuration::days(DEFAULT_DUE_DAYS));

    let tags = match proposal.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    TaskSuggestionDraft {
        title,
        description,
        priority,
        estimated_hours,
        due_date,
        tags,
        rationale,
    }
}

fn string_field(proposal: &DraftProposal, key: &str) -> String {
    proposal
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Result of one suggestion run
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionOutcome {
    pub drafts: Vec<TaskSuggestionDraft>,
    pub source: OutcomeSource,
}

/// Suggestion generator. Stateless between runs; cheap to clone.
#[derive(Clone)]
pub struct SuggestionGenerator {
    oracle: Option<Arc<dyn Oracle>>,
    timeout: Duration,
}

impl SuggestionGenerator {
    /// Create a generator. `None` means the oracle capability is disabled.
    pub fn new(oracle: Option<Arc<dyn Oracle>>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    pub async fn suggest_tasks(
        &self,
        project: &ProjectSummary,
        existing_tasks: &[TaskSummary],
        count: usize,
    ) -> SuggestionOutcome {
        self.suggest_tasks_at(project, existing_tasks, count, Utc::now())
            .await
    }

    pub async fn suggest_tasks_at(
        &self,
        project: &ProjectSummary,
        existing_tasks: &[TaskSummary],
        count: usize,
        now: DateTime<Utc>,
    ) -> SuggestionOutcome {
        if count == 0 {
            return SuggestionOutcome {
                drafts: Vec::new(),
                source: OutcomeSource::Fallback(FallbackReason::NothingRequested),
            };
        }

        let Some(oracle) = &self.oracle else {
            return self.fallback(project, count, now, FallbackReason::OracleDisabled);
        };

        let proposals = with_deadline(
            self.timeout,
            oracle.request_task_suggestions(project, existing_tasks, count, now),
        )
        .await;

        let proposals = match proposals {
            Ok(proposals) => proposals,
            Err(e) => return self.fallback(project, count, now, e.into()),
        };

        if proposals.is_empty() {
            return self.fallback(project, count, now, FallbackReason::NoUsableSuggestion);
        }

        let drafts: Vec<TaskSuggestionDraft> = proposals
            .iter()
            .take(count)
            .map(|p| coerce_draft(p, now))
            .collect();

        tracing::info!(
            project_id = project.id,
            drafts = drafts.len(),
            "generated oracle task suggestions"
        );

        SuggestionOutcome {
            drafts,
            source: OutcomeSource::Oracle,
        }
    }

    fn fallback(
        &self,
        project: &ProjectSummary,
        count: usize,
        now: DateTime<Utc>,
        reason: FallbackReason,
    ) -> SuggestionOutcome {
        if reason.is_expected() {
            tracing::debug!("using fallback task suggestions: {}", reason);
        } else {
            tracing::warn!("using fallback task suggestions: {}", reason);
        }

        SuggestionOutcome {
            drafts: fallback_suggestions(project, count, now),
            source: OutcomeSource::Fallback(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn project(status: ProjectStatus, end_date: Option<DateTime<Utc>>) -> ProjectSummary {
        ProjectSummary {
            id: 1,
            owner_id: 1,
            name: "Website".to_string(),
            description: String::new(),
            category: "web".to_string(),
            status,
            priority: Priority::Medium,
            start_date: now(),
            end_date,
            completion_percentage: 0.0,
        }
    }

    fn proposal(value: Value) -> DraftProposal {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_every_stage_has_three_templates() {
        for status in [
            ProjectStatus::Planning,
            ProjectStatus::Active,
            ProjectStatus::OnHold,
            ProjectStatus::Completed,
        ] {
            assert_eq!(templates_for(status).len(), 3);
        }
    }

    #[test]
    fn test_fallback_count_is_clamped() {
        let p = project(ProjectStatus::Planning, None);
        assert_eq!(fallback_suggestions(&p, 2, now()).len(), 2);
        assert_eq!(fallback_suggestions(&p, 10, now()).len(), 3);
        assert!(fallback_suggestions(&p, 0, now()).is_empty());
    }

    #[test]
    fn test_fallback_due_dates() {
        let p = project(ProjectStatus::Active, None);
        let drafts = fallback_suggestions(&p, 3, now());

        assert_eq!(drafts[0].title, "Conduct weekly progress review");
        assert_eq!(drafts[0].due_date, now() + ChronoDuration::days(4));
        assert_eq!(drafts[1].due_date, now() + ChronoDuration::days(6));
        assert_eq!(drafts[2].due_date, now() + ChronoDuration::days(5));
        assert_eq!(drafts[2].estimated_hours, 2.5);
    }

    #[test]
    fn test_fallback_due_date_capped_at_two_weeks() {
        assert_eq!(
            template_due_date(9.0, None, now()),
            now() + ChronoDuration::days(14)
        );
    }

    #[test]
    fn test_fallback_respects_project_end() {
        let end = now() + ChronoDuration::days(5);
        let p = project(ProjectStatus::Planning, Some(end));
        let drafts = fallback_suggestions(&p, 3, now());

        // 6h -> 12 days, past the end date
        assert_eq!(drafts[0].due_date, end - ChronoDuration::days(1));
        // 3h -> 6 days, past the end date
        assert_eq!(drafts[2].due_date, end - ChronoDuration::days(1));

        let exact = template_due_date(2.5, Some(end), now());
        assert_eq!(exact, end);
    }

    #[test]
    fn test_coerce_full_draft() {
        let draft = coerce_draft(
            &proposal(json!({
                "title": "Set up CI",
                "description": "Pipelines",
                "priority": "urgent",
                "estimated_hours": 5,
                "due_date": "2024-06-10",
                "tags": ["ci", "infra"],
                "rationale": "Catch regressions",
                "assignee": "nobody"
            })),
            now(),
        );

        assert_eq!(
            draft,
            TaskSuggestionDraft {
                title: "Set up CI".to_string(),
                description: "Pipelines".to_string(),
                priority: Priority::Urgent,
                estimated_hours: 5.0,
                due_date: Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap(),
                tags: vec!["ci".to_string(), "infra".to_string()],
                rationale: "Catch regressions".to_string(),
            }
        );
    }

    #[test]
    fn test_coerce_defaults_malformed_fields() {
        let draft = coerce_draft(
            &proposal(json!({
                "title": "   ",
                "description": 12,
                "priority": "CRITICAL",
                "estimated_hours": "lots",
                "due_date": "soon",
                "tags": "one,two",
            })),
            now(),
        );

        assert_eq!(draft.title, UNTITLED_TASK);
        assert_eq!(draft.description, "");
        assert_eq!(draft.priority, Priority::Medium);
        assert_eq!(draft.estimated_hours, DEFAULT_ESTIMATED_HOURS);
        assert_eq!(draft.due_date, now() + ChronoDuration::days(7));
        assert!(draft.tags.is_empty());
        assert_eq!(draft.rationale, "");
    }

    #[test]
    fn test_coerce_hours_and_tags() {
        let draft = coerce_draft(
            &proposal(json!({
                "estimated_hours": "3.5",
                "tags": ["ok", 4, null, "also ok"]
            })),
            now(),
        );
        assert_eq!(draft.estimated_hours, 3.5);
        assert_eq!(draft.tags, vec!["ok".to_string(), "also ok".to_string()]);

        let negative = coerce_draft(&proposal(json!({"estimated_hours": -1})), now());
        assert_eq!(negative.estimated_hours, DEFAULT_ESTIMATED_HOURS);
    }

    #[tokio::test]
    async fn test_disabled_generator_uses_templates() {
        let generator = SuggestionGenerator::new(None, Duration::from_secs(1));
        let p = project(ProjectStatus::OnHold, None);

        let outcome = generator.suggest_tasks_at(&p, &[], 2, now()).await;

        assert_eq!(
            outcome.source,
            OutcomeSource::Fallback(FallbackReason::OracleDisabled)
        );
        assert_eq!(outcome.drafts.len(), 2);
        assert_eq!(outcome.drafts[0].title, "Document current project status");
    }
}
