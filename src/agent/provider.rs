//! Pluggable LLM provider trait.
//!
//! Implementations translate a prompt into a backend-specific HTTP call and
//! map every failure onto [`ProviderError`]. This keeps the pipeline
//! decoupled from any particular LLM vendor.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;

/// Trait for LLM provider backends.
///
/// Implementations perform exactly one HTTP exchange per call. Retries are
/// the orchestrator's business.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"google"`, `"openrouter"`).
    fn name(&self) -> &'static str;

    /// Sends `prompt` to `model` and returns the raw generated text.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UpstreamError`] on failure statuses or
    /// transport errors, [`ProviderError::Timeout`] when `timeout` elapses,
    /// and [`ProviderError::EmptyResponse`] when no text came back.
    async fn send(
        &self,
        prompt: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<String, ProviderError>;
}
