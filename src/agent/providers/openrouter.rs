//! `OpenRouter` provider using the chat-completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{non_empty, read_body, transport_error};
use crate::agent::message::{ChatCompletionRequest, ChatCompletionResponse, user_message};
use crate::agent::provider::LlmProvider;
use crate::error::ProviderError;

/// `OpenRouter` chat-completion provider.
///
/// Any chat-completion-compatible API works via the base URL.
pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenRouterProvider {
    /// Creates a provider against `base_url` (e.g. `https://openrouter.ai/api/v1`).
    #[must_use]
    pub fn new(client: Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn extract_text(body: &str) -> Result<String, ProviderError> {
        let envelope: Option<ChatCompletionResponse> = serde_json::from_str(body).ok();
        non_empty(envelope.as_ref().and_then(|e| e.text()).map(str::to_string)).inspect_err(|_| {
            debug!(
                finish_reason = envelope
                    .as_ref()
                    .and_then(ChatCompletionResponse::finish_reason),
                "openrouter returned no text"
            );
        })
    }
}

impl std::fmt::Debug for OpenRouterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn send(
        &self,
        prompt: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        debug!(model, prompt_len = prompt.len(), "openrouter request");

        let body = ChatCompletionRequest {
            model,
            temperature: 0.0,
            messages: vec![user_message(prompt)],
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e, timeout))?;

        let body = read_body(response, timeout).await?;
        Self::extract_text(&body)
    }
}
