//! Oracle trait definition
//!
//! This module defines the `Oracle` trait that abstracts over advisory backends,
//! so the orchestrators can be driven by a real LLM client or a test stub.

use chrono::{DateTime, Utc};

use super::OracleError;
use crate::models::{DraftProposal, OracleSuggestion, ProjectSummary, TaskSnapshot, TaskSummary};

/// Trait defining the advisory service interface
#[async_trait::async_trait]
pub trait Oracle: Send + Sync {
    /// Ask for revised due dates and priorities for the given tasks
    async fn request_schedule_advice(
        &self,
        tasks: &[TaskSnapshot],
        now: DateTime<Utc>,
    ) -> Result<OracleSuggestion, OracleError>;

    /// Ask for up to `count` new tasks for a project
    async fn request_task_suggestions(
        &self,
        project: &ProjectSummary,
        existing_tasks: &[TaskSummary],
        count: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<DraftProposal>, OracleError>;
}
