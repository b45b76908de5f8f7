//! API Server module
//!
//! HTTP surface for the AI endpoints. Authentication is handled upstream;
//! the caller is identified by the `x-user-id` header.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::models::TaskUpdate;
use crate::optimizer::ScheduleOptimizer;
use crate::store::TaskStore;
use crate::suggestions::{SuggestionGenerator, DEFAULT_SUGGESTION_COUNT};

pub const USER_HEADER: &str = "x-user-id";

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: SocketAddr,
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub optimizer: ScheduleOptimizer,
    pub generator: SuggestionGenerator,
    pub store: Arc<dyn TaskStore>,
}

/// API responses
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ApiResponse::<()>::error(message))).into_response()
}

fn caller_id(headers: &HeaderMap) -> Result<i64, Response> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or_else(|| {
            error_response(
                StatusCode::UNAUTHORIZED,
                format!("missing or invalid {} header", USER_HEADER),
            )
        })
}

/// Query for the task suggestion endpoint
#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    pub project_id: i64,
    pub count: Option<usize>,
}

/// Builds the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { Json(ApiResponse::success("ok")) }))
        .route("/api/ai/schedule-optimization", post(optimize_schedule))
        .route("/api/ai/task-suggestions", post(task_suggestions))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Starts the API server
pub async fn serve(state: AppState, config: ServerConfig) -> Result<(), std::io::Error> {
    let app = router(state);

    tracing::info!("Starting server on {}", config.address);
    let listener = TcpListener::bind(config.address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn optimize_schedule(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user_id = match caller_id(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let tasks = match state.store.tasks_for_user(user_id) {
        Ok(tasks) => tasks,
        Err(e) => {
            tracing::error!("failed to load tasks for user {}: {}", user_id, e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error: {}", e),
            );
        }
    };

    let outcome = state.optimizer.optimize_schedule(tasks).await;

    let updates: Vec<TaskUpdate> = outcome.tasks.iter().map(|t| t.to_update()).collect();
    if let Err(e) = state.store.apply_updates(&updates) {
        tracing::error!("failed to persist optimized schedule: {}", e);
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal server error: {}", e),
        );
    }

    (StatusCode::OK, Json(ApiResponse::success(outcome))).into_response()
}

async fn task_suggestions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SuggestionQuery>,
) -> Response {
    let user_id = match caller_id(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let project = match state.store.project(query.project_id) {
        Ok(Some(project)) if project.owner_id == user_id => project,
        Ok(_) => {
            return error_response(StatusCode::NOT_FOUND, "Project not found".to_string());
        }
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error: {}", e),
            );
        }
    };

    let existing = match state.store.tasks_for_project(project.id) {
        Ok(tasks) => tasks.iter().map(|t| t.summary()).collect::<Vec<_>>(),
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error: {}", e),
            );
        }
    };

    let count = query.count.unwrap_or(DEFAULT_SUGGESTION_COUNT);
    let outcome = state
        .generator
        .suggest_tasks(&project, &existing, count)
        .await;

    (StatusCode::OK, Json(ApiResponse::success(outcome))).into_response()
}
