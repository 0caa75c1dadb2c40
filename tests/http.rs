//! End-to-end HTTP tests: router → orchestrator → mock LLM → `SQLite`.

#![cfg(feature = "server")]

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use common::{MockBackend, seeded_store};
use nlq_rs::agent::{AgentConfig, Orchestrator, PromptBuilder, create_gateway};
use nlq_rs::server::{AppState, router};
use nlq_rs::storage::SqliteStore;

const BODY_LIMIT: usize = 1024 * 1024;

fn app(llm_url: &str, store: SqliteStore) -> Router {
    let config = AgentConfig::builder()
        .google_api_key("g-key")
        .openrouter_api_key("or-key")
        .google_base_url(llm_url)
        .openrouter_base_url(llm_url)
        .retry_delay(Duration::from_millis(1))
        .build()
        .unwrap_or_else(|e| unreachable!("{e}"));
    let gateway = create_gateway(&config).unwrap_or_else(|e| unreachable!("{e}"));
    let orchestrator = Orchestrator::new(gateway, Arc::new(store), config)
        .with_prompts(PromptBuilder::default());
    router(AppState::new(Arc::new(orchestrator), CancellationToken::new()))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .oneshot(request)
        .await
        .unwrap_or_else(|e| unreachable!("{e}"));
    let status = response.status();
    let bytes = to_bytes(response.into_body(), BODY_LIMIT)
        .await
        .unwrap_or_else(|e| unreachable!("{e}"));
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_query(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/users/query")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|e| unreachable!("{e}"))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap_or_else(|e| unreachable!("{e}"))
}

#[tokio::test]
async fn health_reports_version() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let app = app("http://unused.invalid", SqliteStore::new(dir.path().join("none.db")));

    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn ready_when_database_reachable() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let store = seeded_store(dir.path()).await;
    let app = app("http://unused.invalid", store);

    let (status, body) = send(app, get("/health/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn unavailable_when_database_missing() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let app = app("http://unused.invalid", SqliteStore::new(dir.path().join("missing.db")));

    let (status, body) = send(app, get("/health/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn email_query_returns_matching_record() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let store = seeded_store(dir.path()).await;
    let llm = MockBackend::gemini(
        r#"{"predicates":[{"field":"email","operator":"equals","value":"john@example.com"}]}"#,
    )
    .await;

    let (status, body) = send(
        app(&llm.base_url, store),
        post_query(r#"{"query":"find user email is john@example.com","provider":"google"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().cloned().unwrap_or_default();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["email"], "john@example.com");
    assert_eq!(records[0]["first_name"], "John");
    assert!(records[0].get("password").is_none());
    assert_eq!(llm.hits(), 1);

    let captured = llm.captured();
    let prompt = captured[0].body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default();
    assert!(prompt.starts_with(nlq_rs::agent::prompt::TRANSLATE_INSTRUCTIONS));
    assert!(prompt.ends_with("<query>find user email is john@example.com</query>"));
}

#[tokio::test]
async fn inactive_query_honours_limit() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let store = seeded_store(dir.path()).await;
    let llm = MockBackend::openrouter(
        "Sure:\n```json\n{\"predicates\":[{\"field\":\"is_active\",\"operator\":\"is\",\"value\":false}]}\n```",
    )
    .await;

    let (status, body) = send(
        app(&llm.base_url, store),
        post_query(r#"{"query":"show inactive users","provider":"openrouter","limit":1}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().cloned().unwrap_or_default();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["username"], "jane");
    assert_eq!(records[0]["is_active"], false);
}

#[tokio::test]
async fn contains_and_date_range_combine() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let store = seeded_store(dir.path()).await;
    let llm = MockBackend::gemini(
        &json!({"predicates": [
            {"field": "last_name", "operator": "contains", "value": "smi"},
            {"field": "created_at", "operator": "date_range",
             "value": {"from": "2024-01-01", "to": "2024-01-31"}}
        ]})
        .to_string(),
    )
    .await;

    let (status, body) = send(
        app(&llm.base_url, store),
        post_query(r#"{"query":"smiths who joined in January 2024","provider":"google"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().cloned().unwrap_or_default();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["username"], "jane");
}

#[tokio::test]
async fn empty_filter_uses_default_limit() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let store = seeded_store(dir.path()).await;
    let llm = MockBackend::gemini(r#"{"predicates":[]}"#).await;

    let (status, body) = send(
        app(&llm.base_url, store),
        post_query(r#"{"query":"everyone","provider":"google"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(20));
}

#[tokio::test]
async fn prose_reply_is_bad_gateway() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let store = seeded_store(dir.path()).await;
    let llm = MockBackend::gemini("I could not find any users.").await;

    let (status, body) = send(
        app(&llm.base_url, store),
        post_query(r#"{"query":"who?","provider":"google"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "parse_error");
    assert_eq!(body["reason"], "not_json");
}

#[tokio::test]
async fn unknown_field_is_unprocessable() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let store = seeded_store(dir.path()).await;
    let llm = MockBackend::gemini(
        r#"{"predicates":[{"field":"password","operator":"equals","value":"x"}]}"#,
    )
    .await;

    let (status, body) = send(
        app(&llm.base_url, store),
        post_query(r#"{"query":"password is x","provider":"google"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn unsupported_provider_is_bad_request_without_llm_call() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let store = seeded_store(dir.path()).await;
    let llm = MockBackend::gemini(r#"{"predicates":[]}"#).await;

    let (status, body) = send(
        app(&llm.base_url, store),
        post_query(r#"{"query":"everyone","provider":"anthropic"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "input_error");
    assert_eq!(body["reason"], "unsupported_provider");
    assert_eq!(llm.hits(), 0);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let app = app("http://unused.invalid", SqliteStore::new(dir.path().join("none.db")));

    let (status, body) = send(app, post_query(r#"{"provider":"google"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "malformed_request");
}

#[tokio::test]
async fn upstream_failure_is_retried_then_bad_gateway() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let store = seeded_store(dir.path()).await;
    let llm = MockBackend::start(503, json!({"error": "overloaded"}), Duration::ZERO).await;

    let (status, body) = send(
        app(&llm.base_url, store),
        post_query(r#"{"query":"everyone","provider":"openrouter"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "provider_error");
    assert_eq!(llm.hits(), 2);
}
