//! replan library crate
//!
//! Reschedules tasks and proposes new ones. An external LLM oracle is asked
//! for advice first; its output is validated against a strict allow-list and
//! merged, and deterministic algorithms take over whenever the advice is
//! missing, late, or malformed.
//!
//! # Module Organization
//!
//! - `models`: task, project, and suggestion types
//! - `oracle`: the advisory service trait and its OpenAI-compatible client
//! - `merge`: validation and merge of schedule advice
//! - `rebalance`: deterministic fallback rescheduling
//! - `optimizer`: schedule optimization orchestrator
//! - `suggestions`: task suggestion generator with template fallback
//! - `store`: persistence collaborator interface and in-memory store
//! - `api`: HTTP endpoints
//! - `cli`: command-line interface

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod merge;
pub mod models;
pub mod optimizer;
pub mod oracle;
pub mod rebalance;
pub mod store;
pub mod suggestions;

pub use error::{Error, Result};
pub use merge::{merge_suggestions, merge_with_report, MergeReport};
pub use optimizer::{OptimizationOutcome, OutcomeSource, ScheduleOptimizer};
pub use rebalance::fallback_optimize;
pub use suggestions::{SuggestionGenerator, SuggestionOutcome};
