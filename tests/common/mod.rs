//! Shared fixtures: a local mock LLM backend and a seeded users database.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use nlq_rs::core::NewUser;
use nlq_rs::storage::SqliteStore;

/// A request captured by the mock backend.
#[derive(Debug, Clone)]
pub struct Captured {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Scripted HTTP backend bound to an ephemeral local port.
#[derive(Clone)]
pub struct MockBackend {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl MockBackend {
    /// Starts a backend answering every request with `status` and `body`
    /// after `delay`.
    pub async fn start(status: u16, body: Value, delay: Duration) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let captured = Arc::new(Mutex::new(Vec::new()));

        let handler = {
            let hits = Arc::clone(&hits);
            let captured = Arc::clone(&captured);
            move |uri: Uri, headers: HeaderMap, bytes: Bytes| {
                let hits = Arc::clone(&hits);
                let captured = Arc::clone(&captured);
                let body = body.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    if let Ok(mut all) = captured.lock() {
                        all.push(Captured {
                            path: uri.path().to_string(),
                            headers,
                            body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
                        });
                    }
                    tokio::time::sleep(delay).await;
                    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
                    (status, axum::Json(body)).into_response()
                }
            }
        };

        let app = Router::new().fallback(handler);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| unreachable!("bind failed: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| unreachable!("no local addr: {e}"));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            hits,
            captured,
        }
    }

    /// Backend replying 200 with a Gemini envelope around `text`.
    pub async fn gemini(text: &str) -> Self {
        Self::start(200, gemini_body(text), Duration::ZERO).await
    }

    /// Backend replying 200 with a chat-completion envelope around `text`.
    pub async fn openrouter(text: &str) -> Self {
        Self::start(200, chat_body(text), Duration::ZERO).await
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn captured(&self) -> Vec<Captured> {
        self.captured.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

pub fn gemini_body(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

pub fn chat_body(text: &str) -> Value {
    json!({
        "id": "gen-test",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    })
}

/// An address nothing listens on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap_or_else(|e| unreachable!("bind failed: {e}"));
    let addr = listener
        .local_addr()
        .unwrap_or_else(|e| unreachable!("no local addr: {e}"));
    drop(listener);
    format!("http://{addr}")
}

/// Creates and seeds a users database in `dir`.
///
/// Users, in id order: john (active), jane Smith (inactive, Jan 2024),
/// bob Smith (inactive), plus 20 active filler users.
pub async fn seeded_store(dir: &std::path::Path) -> SqliteStore {
    let store = SqliteStore::new(dir.join("users.db"));
    store
        .init()
        .await
        .unwrap_or_else(|e| unreachable!("init failed: {e}"));

    let jan = Utc
        .with_ymd_and_hms(2024, 1, 15, 9, 30, 0)
        .single()
        .unwrap_or_else(|| unreachable!());
    let mut users = vec![
        NewUser::new("john@example.com", "john").named("John", "Doe"),
        NewUser::new("jane@example.com", "jane")
            .named("Jane", "Smith")
            .active(false)
            .created_at(jan),
        NewUser::new("bob@example.com", "bob")
            .named("Bob", "Smith")
            .active(false),
    ];
    users.extend((0..20).map(|i| NewUser::new(format!("user{i}@example.net"), format!("user{i}"))));

    for user in users {
        store
            .insert(user)
            .await
            .unwrap_or_else(|e| unreachable!("insert failed: {e}"));
    }
    store
}
