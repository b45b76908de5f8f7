//! Schedule optimizer
//!
//! Orchestrates one optimization run: ask the oracle, validate and merge its
//! advice, and fall back to the deterministic rebalancer whenever the advice
//! is missing or unusable. Never fails.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::merge::merge_with_report;
use crate::models::TaskSnapshot;
use crate::oracle::{Oracle, OracleError};
use crate::rebalance::fallback_optimize;

/// Why a run used the deterministic path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum FallbackReason {
    NoTasks,
    NothingRequested,
    OracleDisabled,
    OracleUnavailable(String),
    Transport(String),
    MalformedResponse(String),
    NoUsableSuggestion,
}

impl From<OracleError> for FallbackReason {
    fn from(error: OracleError) -> Self {
        match error {
            OracleError::Unavailable(msg) => FallbackReason::OracleUnavailable(msg),
            OracleError::Transport(msg) => FallbackReason::Transport(msg),
            OracleError::MalformedResponse(msg) => FallbackReason::MalformedResponse(msg),
        }
    }
}

impl FallbackReason {
    /// True for fallbacks that need no oracle call at all. These are routine
    /// and logged at debug; every other reason is a degraded run.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            FallbackReason::NoTasks
                | FallbackReason::NothingRequested
                | FallbackReason::OracleDisabled
        )
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NoTasks => f.write_str("no tasks to optimize"),
            FallbackReason::NothingRequested => f.write_str("zero suggestions requested"),
            FallbackReason::OracleDisabled => f.write_str("oracle disabled"),
            FallbackReason::OracleUnavailable(msg) => write!(f, "oracle unavailable: {}", msg),
            FallbackReason::Transport(msg) => write!(f, "transport error: {}", msg),
            FallbackReason::MalformedResponse(msg) => write!(f, "malformed response: {}", msg),
            FallbackReason::NoUsableSuggestion => {
                f.write_str("oracle suggestion matched no known task")
            }
        }
    }
}

/// Which path produced a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum OutcomeSource {
    Oracle,
    Fallback(FallbackReason),
}

impl OutcomeSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, OutcomeSource::Fallback(_))
    }
}

/// Result of one optimization run
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationOutcome {
    pub tasks: Vec<TaskSnapshot>,
    pub source: OutcomeSource,
}

/// Runs an oracle call under a deadline; expiry counts as a transport failure.
pub(crate) async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, OracleError>
where
    F: std::future::Future<Output = Result<T, OracleError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(OracleError::Transport(format!(
            "oracle timed out after {}s",
            deadline.as_secs_f32()
        ))),
    }
}

/// Schedule optimizer. Stateless between runs; cheap to clone.
#[derive(Clone)]
pub struct ScheduleOptimizer {
    oracle: Option<Arc<dyn Oracle>>,
    timeout: Duration,
}

impl ScheduleOptimizer {
    /// Create an optimizer. `None` means the oracle capability is disabled.
    pub fn new(oracle: Option<Arc<dyn Oracle>>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    pub fn oracle_enabled(&self) -> bool {
        self.oracle.is_some()
    }

    /// Optimize against the current time
    pub async fn optimize_schedule(&self, tasks: Vec<TaskSnapshot>) -> OptimizationOutcome {
        self.optimize_schedule_at(tasks, Utc::now()).await
    }

    /// Optimize against an explicit `now`
    pub async fn optimize_schedule_at(
        &self,
        tasks: Vec<TaskSnapshot>,
        now: DateTime<Utc>,
    ) -> OptimizationOutcome {
        let oracle = match &self.oracle {
            _ if tasks.is_empty() => return fallback(tasks, now, FallbackReason::NoTasks),
            None => return fallback(tasks, now, FallbackReason::OracleDisabled),
            Some(oracle) => oracle,
        };

        let advice = with_deadline(self.timeout, oracle.request_schedule_advice(&tasks, now)).await;
        let suggestion = match advice {
            Ok(suggestion) => suggestion,
            Err(e) => return fallback(tasks, now, e.into()),
        };

        let (merged, report) = merge_with_report(tasks.clone(), &suggestion);
        if !report.has_signal() {
            return fallback(tasks, now, FallbackReason::NoUsableSuggestion);
        }

        tracing::info!(
            tasks = merged.len(),
            matched = report.matched_entries,
            applied = report.applied_fields,
            skipped = report.skipped_fields.len(),
            unknown = report.unknown_ids.len(),
            "applied oracle schedule advice"
        );

        OptimizationOutcome {
            tasks: merged,
            source: OutcomeSource::Oracle,
        }
    }
}

fn fallback(
    tasks: Vec<TaskSnapshot>,
    now: DateTime<Utc>,
    reason: FallbackReason,
) -> OptimizationOutcome {
    if reason.is_expected() {
        tracing::debug!("using fallback schedule optimization: {}", reason);
    } else {
        tracing::warn!("using fallback schedule optimization: {}", reason);
    }

    OptimizationOutcome {
        tasks: fallback_optimize(tasks, now),
        source: OutcomeSource::Fallback(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DraftProposal, OracleSuggestion, Priority, ProjectSummary, SuggestionEntry, TaskId,
        TaskStatus, TaskSummary,
    };
    use chrono::{Duration as ChronoDuration, TimeZone};
    use serde_json::json;

    struct SlowOracle;

    #[async_trait::async_trait]
    impl Oracle for SlowOracle {
        async fn request_schedule_advice(
            &self,
            _tasks: &[TaskSnapshot],
            _now: DateTime<Utc>,
        ) -> Result<OracleSuggestion, OracleError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(OracleSuggestion::new(vec![SuggestionEntry::from_object(
                json!({"id": 1, "priority": "urgent"}).as_object().unwrap(),
            )]))
        }

        async fn request_task_suggestions(
            &self,
            _project: &ProjectSummary,
            _existing_tasks: &[TaskSummary],
            _count: usize,
            _now: DateTime<Utc>,
        ) -> Result<Vec<DraftProposal>, OracleError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back_as_transport_error() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let tasks = vec![TaskSnapshot {
            id: TaskId::new(1),
            title: "Slow".to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: Priority::Low,
            due_date: now - ChronoDuration::days(1),
            estimated_hours: 1.0,
            actual_hours: 0.0,
            project_id: 1,
            assignee_id: None,
        }];

        let optimizer = ScheduleOptimizer::new(Some(Arc::new(SlowOracle)), Duration::from_secs(5));
        let outcome = optimizer.optimize_schedule_at(tasks, now).await;

        assert!(matches!(
            outcome.source,
            OutcomeSource::Fallback(FallbackReason::Transport(_))
        ));
        assert_eq!(outcome.tasks[0].priority, Priority::Low);
        assert_eq!(outcome.tasks[0].due_date, now + ChronoDuration::days(14));
    }

    #[test]
    fn test_outcome_source_serialization() {
        let source = OutcomeSource::Fallback(FallbackReason::Transport("boom".to_string()));
        let value = serde_json::to_value(&source).unwrap();
        assert_eq!(value["source"], "fallback");
        assert_eq!(value["reason"], "transport");
        assert_eq!(value["detail"], "boom");
    }

    #[test]
    fn test_expected_fallbacks() {
        assert!(FallbackReason::NoTasks.is_expected());
        assert!(FallbackReason::NothingRequested.is_expected());
        assert!(FallbackReason::OracleDisabled.is_expected());
        assert!(!FallbackReason::NoUsableSuggestion.is_expected());
        assert!(!FallbackReason::Transport("reset".to_string()).is_expected());
        assert!(!FallbackReason::MalformedResponse("x".to_string()).is_expected());
    }
}
