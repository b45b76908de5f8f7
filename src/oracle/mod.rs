//! Oracle module
//!
//! The oracle is the external LLM service. Its output is advice: it is parsed,
//! validated, and may be ignored entirely in favour of the deterministic paths.

mod openai;
mod parse;
pub mod prompts;
mod trait_def;

use std::sync::Arc;

pub use openai::OpenAiOracle;
pub use parse::{extract_json_array, parse_schedule_response, parse_suggestion_response};
pub use trait_def::Oracle;

use crate::config::OracleConfig;

/// Oracle errors. Every variant is recoverable by falling back.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed oracle response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(error: reqwest::Error) -> Self {
        OracleError::Transport(error.to_string())
    }
}

/// Builds the oracle once at startup.
///
/// Returns `None` when no credential is configured; callers treat that as the
/// disabled capability for the lifetime of the process.
pub fn from_config(config: &OracleConfig) -> Option<Arc<dyn Oracle>> {
    if !config.is_enabled() {
        tracing::warn!("OPENAI_API_KEY not set; AI features will use deterministic fallbacks");
        return None;
    }

    match OpenAiOracle::new(config) {
        Ok(oracle) => {
            tracing::info!(model = %config.model, "oracle enabled");
            Some(Arc::new(oracle))
        }
        Err(e) => {
            tracing::warn!("failed to initialise oracle client: {}", e);
            None
        }
    }
}
