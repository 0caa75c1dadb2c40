//! Orchestrator for the natural-language query pipeline.
//!
//! Sequences one request through prompt building, the provider call,
//! response parsing, whitelist validation and execution:
//!
//! ```text
//! Received → PromptBuilt → ProviderCalled → Parsed → Validated → Executed → Completed
//!                               ↓              ↓          ↓           ↓
//!                        ProviderFailed   ParseFailed  ValidationFailed  StoreFailed
//! ```
//!
//! Any stage can also end in `Cancelled` when the caller's token fires or
//! the request deadline passes. Only the provider call is ever retried, at
//! most once, and only for transient failures.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use super::client::{ProviderGateway, ProviderResponse};
use super::config::{AgentConfig, MAX_PROVIDER_ATTEMPTS};
use super::executor::QueryExecutor;
use super::filter::validate;
use super::parser::parse;
use super::prompt::PromptBuilder;
use super::request::{ProviderKind, QueryRequest, ValidatedRequest};
use crate::core::{UserRecord, Whitelist};
use crate::error::{AgentError, InputError, ProviderError};
use crate::storage::RecordStore;

/// Pipeline states, including terminal failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Request passed pre-flight checks.
    Received,
    /// Prompt assembled.
    PromptBuilt,
    /// Provider returned text.
    ProviderCalled,
    /// Text parsed into a filter.
    Parsed,
    /// Filter passed the whitelist.
    Validated,
    /// Store returned records.
    Executed,
    /// Result delivered.
    Completed,
    /// Provider failed after any retry.
    ProviderFailed,
    /// Output was not a valid filter.
    ParseFailed,
    /// Filter violated the whitelist.
    ValidationFailed,
    /// Store failed.
    StoreFailed,
    /// Cancelled or past the request deadline.
    Cancelled,
}

impl PipelineState {
    /// Snake-case name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::PromptBuilt => "prompt_built",
            Self::ProviderCalled => "provider_called",
            Self::Parsed => "parsed",
            Self::Validated => "validated",
            Self::Executed => "executed",
            Self::Completed => "completed",
            Self::ProviderFailed => "provider_failed",
            Self::ParseFailed => "parse_failed",
            Self::ValidationFailed => "validation_failed",
            Self::StoreFailed => "store_failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition follows.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::ProviderFailed
                | Self::ParseFailed
                | Self::ValidationFailed
                | Self::StoreFailed
                | Self::Cancelled
        )
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn enter(state: PipelineState) {
    debug!(state = state.as_str(), "pipeline transition");
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Outcome of a successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Matching records, at most `limit`, in store order.
    pub records: Vec<UserRecord>,
    /// Backend that translated the query.
    pub provider: ProviderKind,
    /// Model that translated the query.
    pub model: String,
    /// Provider calls made (1 or 2).
    pub provider_attempts: usize,
    /// Number of predicates in the validated filter.
    pub predicates: usize,
    /// Wall time of the whole run.
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Orchestrates the query pipeline.
///
/// Holds no per-request state; one instance serves concurrent requests.
pub struct Orchestrator {
    gateway: ProviderGateway,
    executor: QueryExecutor,
    prompts: PromptBuilder,
    config: AgentConfig,
}

impl Orchestrator {
    /// Creates a new orchestrator.
    ///
    /// Loads the prompt template from [`AgentConfig::prompt_dir`], falling
    /// back to the compiled-in default.
    pub fn new(gateway: ProviderGateway, store: Arc<dyn RecordStore>, config: AgentConfig) -> Self {
        let prompts = PromptBuilder::load(config.prompt_dir.as_deref())
            .with_max_predicates(config.max_predicates);
        Self {
            gateway,
            executor: QueryExecutor::new(store),
            prompts,
            config,
        }
    }

    /// Replaces the prompt builder. The configured predicate ceiling is
    /// applied to it.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts.with_max_predicates(self.config.max_predicates);
        self
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Checks that the record store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Store`] if it is not.
    pub async fn ready(&self) -> Result<(), AgentError> {
        self.executor.ping().await.map_err(AgentError::from)
    }

    /// Runs one request through the pipeline.
    ///
    /// Pre-flight checks (text, provider, limit, provider credential) happen
    /// before any network access. The rest of the run is aborted when
    /// `cancel` fires or the configured request deadline passes.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Input`] for rejected requests and otherwise the
    /// error of the stage that failed; [`AgentError::terminal_state`] names
    /// the state the run ended in.
    pub async fn query(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<QueryResult, AgentError> {
        let request = request.validate(&self.config)?;
        if !self.gateway.is_configured(request.provider) {
            return Err(InputError::ProviderUnavailable {
                provider: request.provider.as_str(),
            }
            .into());
        }

        let span = info_span!(
            "nl_query",
            provider = %request.provider,
            limit = request.limit,
        );

        async {
            let deadline = self.config.request_deadline;
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(AgentError::Cancelled {
                    reason: "request cancelled by caller".to_string(),
                }),
                result = tokio::time::timeout(deadline, self.run(&request)) => {
                    result.unwrap_or_else(|_| Err(AgentError::Cancelled {
                        reason: format!("request deadline of {}ms exceeded", millis(deadline)),
                    }))
                }
            };

            match &outcome {
                Ok(result) => info!(
                    state = PipelineState::Completed.as_str(),
                    model = %result.model,
                    attempts = result.provider_attempts,
                    predicates = result.predicates,
                    rows = result.records.len(),
                    latency_ms = millis(result.elapsed),
                    "query completed"
                ),
                Err(e) => warn!(
                    state = e.terminal_state().map_or("rejected", PipelineState::as_str),
                    kind = e.kind(),
                    reason = e.reason(),
                    error = %e,
                    "query failed"
                ),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: &ValidatedRequest) -> Result<QueryResult, AgentError> {
        let start = Instant::now();
        enter(PipelineState::Received);

        let whitelist = Whitelist::users();
        let prompt = self.prompts.build(&request.text, whitelist);
        enter(PipelineState::PromptBuilt);

        let (response, attempts) = self.call_provider(&prompt, request.provider).await?;
        enter(PipelineState::ProviderCalled);

        let filter = parse(&response.raw_text)?;
        enter(PipelineState::Parsed);

        let validated = validate(&filter, whitelist, self.config.max_predicates)?;
        debug!(predicates = validated.conditions().len(), "filter validated");
        enter(PipelineState::Validated);

        let records = self.executor.execute(&validated, request.limit).await?;
        enter(PipelineState::Executed);

        Ok(QueryResult {
            records,
            provider: response.provider,
            model: response.model,
            provider_attempts: attempts,
            predicates: validated.conditions().len(),
            elapsed: start.elapsed(),
        })
    }

    fn model_for(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::Google => &self.config.google_model,
            ProviderKind::OpenRouter => &self.config.openrouter_model,
        }
    }

    /// Calls the provider, retrying once on transient failures.
    async fn call_provider(
        &self,
        prompt: &str,
        kind: ProviderKind,
    ) -> Result<(ProviderResponse, usize), ProviderError> {
        let model = self.model_for(kind);
        let mut attempt = 1;
        loop {
            match self
                .gateway
                .send(prompt, kind, model, self.config.timeout)
                .await
            {
                Ok(response) => {
                    debug!(
                        attempt,
                        model,
                        latency_ms = millis(response.latency),
                        "provider call succeeded"
                    );
                    return Ok((response, attempt));
                }
                Err(e) if e.is_retryable() && attempt < MAX_PROVIDER_ATTEMPTS => {
                    warn!(attempt, model, error = %e, "provider call failed, retrying");
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("gateway", &self.gateway)
            .field("executor", &self.executor)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
