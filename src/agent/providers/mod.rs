//! Concrete LLM provider implementations.

mod gemini;
mod openrouter;

use std::time::Duration;

pub use gemini::GeminiProvider;
pub use openrouter::OpenRouterProvider;

use crate::error::{EXCERPT_LEN, ProviderError};

/// Truncates an upstream body to a log-safe snippet.
fn snippet(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(EXCERPT_LEN) {
        Some((idx, _)) => body[..idx].to_string(),
        None => body.to_string(),
    }
}

/// Maps a `reqwest` transport error.
fn transport_error(err: &reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout { timeout }
    } else {
        ProviderError::UpstreamError {
            status: err.status().map(|s| s.as_u16()),
            body: snippet(&err.to_string()),
        }
    }
}

/// Reads a response, turning failure statuses into [`ProviderError`].
///
/// Returns the body text on success.
async fn read_body(response: reqwest::Response, timeout: Duration) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(&e, timeout))?;

    if status.is_client_error() || status.is_server_error() {
        return Err(ProviderError::UpstreamError {
            status: Some(status.as_u16()),
            body: snippet(&body),
        });
    }
    Ok(body)
}

/// Rejects missing or whitespace-only text.
fn non_empty(text: Option<String>) -> Result<String, ProviderError> {
    text.filter(|t| !t.trim().is_empty())
        .ok_or(ProviderError::EmptyResponse)
}
