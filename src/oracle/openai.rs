//! OpenAI-compatible oracle
//!
//! Talks to a chat completions endpoint and returns the parsed advice.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};

use super::{parse, prompts, Oracle, OracleError};
use crate::config::OracleConfig;
use crate::models::{DraftProposal, OracleSuggestion, ProjectSummary, TaskSnapshot, TaskSummary};

const SCHEDULE_TEMPERATURE: f32 = 0.2;
const SUGGESTION_TEMPERATURE: f32 = 0.5;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Oracle backed by an OpenAI-compatible HTTP API
#[derive(Clone)]
pub struct OpenAiOracle {
    http_client: Arc<ReqwestClient>,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiOracle {
    /// Create a new oracle from configuration
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| OracleError::Unavailable("no API key configured".to_string()))?;

        let http_client = ReqwestClient::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http_client: Arc::new(http_client),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends one prompt and returns the completion text
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, OracleError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OracleError::Transport(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::MalformedResponse(format!("unreadable body: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| OracleError::MalformedResponse("completion had no content".to_string()))
    }
}

#[async_trait::async_trait]
impl Oracle for OpenAiOracle {
    async fn request_schedule_advice(
        &self,
        tasks: &[TaskSnapshot],
        now: DateTime<Utc>,
    ) -> Result<OracleSuggestion, OracleError> {
        let prompt = prompts::schedule_prompt(tasks, now);

        tracing::debug!(
            template = prompts::SCHEDULE_TEMPLATE_VERSION,
            tasks = tasks.len(),
            "requesting schedule advice"
        );
        let text = self.complete(&prompt, SCHEDULE_TEMPERATURE).await?;
        parse::parse_schedule_response(&text)
    }

    async fn request_task_suggestions(
        &self,
        project: &ProjectSummary,
        existing_tasks: &[TaskSummary],
        count: usize,
        _now: DateTime<Utc>,
    ) -> Result<Vec<DraftProposal>, OracleError> {
        let prompt = prompts::suggestion_prompt(project, existing_tasks, count);

        tracing::debug!(
            template = prompts::SUGGESTION_TEMPLATE_VERSION,
            project_id = project.id,
            count,
            "requesting task suggestions"
        );
        let text = self.complete(&prompt, SUGGESTION_TEMPERATURE).await?;
        parse::parse_suggestion_response(&text)
    }
}
