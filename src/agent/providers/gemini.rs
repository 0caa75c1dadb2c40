//! Google Gemini provider using the `generateContent` REST endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{non_empty, read_body, transport_error};
use crate::agent::message::{GenerateContentRequest, GenerateContentResponse};
use crate::agent::provider::LlmProvider;
use crate::error::ProviderError;

/// Gemini provider.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    /// Creates a provider against `base_url` (e.g.
    /// `https://generativelanguage.googleapis.com`).
    #[must_use]
    pub fn new(client: Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }

    /// Extracts the generated text from a response body.
    ///
    /// A body that is not the expected envelope counts as empty.
    fn extract_text(body: &str) -> Result<String, ProviderError> {
        let envelope: Option<GenerateContentResponse> = serde_json::from_str(body).ok();
        non_empty(envelope.as_ref().and_then(GenerateContentResponse::text)).inspect_err(|_| {
            debug!(
                finish_reason = envelope
                    .as_ref()
                    .and_then(GenerateContentResponse::finish_reason),
                "gemini returned no text"
            );
        })
    }
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn send(
        &self,
        prompt: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        debug!(model, prompt_len = prompt.len(), "gemini request");

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .timeout(timeout)
            .json(&GenerateContentRequest::single(prompt))
            .send()
            .await
            .map_err(|e| transport_error(&e, timeout))?;

        let body = read_body(response, timeout).await?;
        Self::extract_text(&body)
    }
}
