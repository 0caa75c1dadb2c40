//! HTTP routes for the query service.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::agent::{Orchestrator, QueryRequest};
use crate::core::UserRecord;
use crate::error::{AgentError, InputError, ProviderError};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    shutdown: CancellationToken,
}

impl AppState {
    /// Creates state around `orchestrator`. In-flight queries are cancelled
    /// when `shutdown` fires.
    #[must_use]
    pub const fn new(orchestrator: Arc<Orchestrator>, shutdown: CancellationToken) -> Self {
        Self {
            orchestrator,
            shutdown,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    reason: &'static str,
    message: String,
}

/// An [`AgentError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(AgentError);

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        Self(err)
    }
}

/// HTTP status for an error kind.
#[must_use]
pub const fn status_for(err: &AgentError) -> StatusCode {
    match err {
        AgentError::Input(_) => StatusCode::BAD_REQUEST,
        AgentError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AgentError::Parse(_) => StatusCode::BAD_GATEWAY,
        AgentError::Provider(ProviderError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
        AgentError::Provider(_) => StatusCode::BAD_GATEWAY,
        AgentError::Store(_) | AgentError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AgentError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            kind: self.0.kind(),
            reason: self.0.reason(),
            message: self.0.to_string(),
        };
        (status_for(&self.0), Json(body)).into_response()
    }
}

/// Builds the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/users/query", post(query_users))
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .with_state(state)
}

async fn query_users(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Vec<UserRecord>>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        AgentError::from(InputError::Malformed {
            message: e.body_text(),
        })
    })?;

    let cancel = state.shutdown.child_token();
    let result = state.orchestrator.query(&request, &cancel).await?;
    Ok(Json(result.records))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn ready(State(state): State<AppState>) -> Response {
    match state.orchestrator.ready().await {
        Ok(()) => Json(json!({"status": "ready", "database": "connected"})).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unavailable", "database": "disconnected"})),
            )
                .into_response()
        }
    }
}
