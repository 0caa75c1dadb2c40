//! Provider gateway and factory.
//!
//! Maps [`ProviderKind`] tags to concrete [`LlmProvider`] implementations
//! and normalizes each call's outcome into a [`ProviderResponse`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::agent::config::AgentConfig;
use crate::agent::provider::LlmProvider;
use crate::agent::providers::{GeminiProvider, OpenRouterProvider};
use crate::agent::request::ProviderKind;
use crate::error::{AgentError, ProviderError};

/// Successful outcome of one provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    /// Backend that answered.
    pub provider: ProviderKind,
    /// Model used.
    pub model: String,
    /// Raw generated text, never blank.
    pub raw_text: String,
    /// Wall time of the call.
    pub latency: Duration,
}

/// Routes prompts to the configured backends.
///
/// A backend without a credential is simply absent; the orchestrator checks
/// [`is_configured`](Self::is_configured) before entering the pipeline.
#[derive(Clone, Default)]
pub struct ProviderGateway {
    google: Option<Arc<dyn LlmProvider>>,
    openrouter: Option<Arc<dyn LlmProvider>>,
}

impl ProviderGateway {
    /// Creates an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `provider` for `kind`, replacing any previous one.
    #[must_use]
    pub fn with_provider(mut self, kind: ProviderKind, provider: Arc<dyn LlmProvider>) -> Self {
        match kind {
            ProviderKind::Google => self.google = Some(provider),
            ProviderKind::OpenRouter => self.openrouter = Some(provider),
        }
        self
    }

    fn provider(&self, kind: ProviderKind) -> Option<&Arc<dyn LlmProvider>> {
        match kind {
            ProviderKind::Google => self.google.as_ref(),
            ProviderKind::OpenRouter => self.openrouter.as_ref(),
        }
    }

    /// Whether `kind` has a backend installed.
    #[must_use]
    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        self.provider(kind).is_some()
    }

    /// Sends `prompt` to the backend for `kind`.
    ///
    /// The call is bounded by `timeout`; no retries happen here.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on failure. An unconfigured `kind` is
    /// reported as an [`ProviderError::UpstreamError`] without status; the
    /// orchestrator never gets that far.
    pub async fn send(
        &self,
        prompt: &str,
        kind: ProviderKind,
        model: &str,
        timeout: Duration,
    ) -> Result<ProviderResponse, ProviderError> {
        let provider = self
            .provider(kind)
            .ok_or_else(|| ProviderError::UpstreamError {
                status: None,
                body: format!("provider '{kind}' is not configured"),
            })?;

        let start = Instant::now();
        let raw_text = tokio::time::timeout(timeout, provider.send(prompt, model, timeout))
            .await
            .map_err(|_| ProviderError::Timeout { timeout })??;
        let latency = start.elapsed();

        if raw_text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        debug!(
            provider = %kind,
            model,
            latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            "provider responded"
        );

        Ok(ProviderResponse {
            provider: kind,
            model: model.to_string(),
            raw_text,
            latency,
        })
    }
}

impl std::fmt::Debug for ProviderGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderGateway")
            .field("google", &self.google.as_ref().map(|p| p.name()))
            .field("openrouter", &self.openrouter.as_ref().map(|p| p.name()))
            .finish()
    }
}

/// Creates a [`ProviderGateway`] with a backend for every configured key.
///
/// # Errors
///
/// Returns [`AgentError::Config`] if the HTTP client cannot be built.
pub fn create_gateway(config: &AgentConfig) -> Result<ProviderGateway, AgentError> {
    let client = reqwest::Client::builder()
        .connect_timeout(config.timeout)
        .build()
        .map_err(|e| AgentError::Config {
            message: format!("failed to build HTTP client: {e}"),
        })?;

    let mut gateway = ProviderGateway::new();
    if let Some(key) = &config.google_api_key {
        gateway = gateway.with_provider(
            ProviderKind::Google,
            Arc::new(GeminiProvider::new(
                client.clone(),
                key,
                &config.google_base_url,
            )),
        );
    }
    if let Some(key) = &config.openrouter_api_key {
        gateway = gateway.with_provider(
            ProviderKind::OpenRouter,
            Arc::new(OpenRouterProvider::new(
                client,
                key,
                &config.openrouter_base_url,
            )),
        );
    }
    Ok(gateway)
}
