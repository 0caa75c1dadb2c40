//! Error types for the natural-language query pipeline.
//!
//! Each pipeline stage owns a dedicated error enum. [`AgentError`] wraps
//! them all and knows which terminal [`PipelineState`] a failure maps to,
//! which lets callers distinguish "fix your request" from "retry may help".

use std::time::Duration;

use crate::agent::orchestrator::PipelineState;

/// Result alias defaulting to [`AgentError`].
pub type Result<T, E = AgentError> = std::result::Result<T, E>;

/// Maximum characters of raw text carried in error excerpts.
pub const EXCERPT_LEN: usize = 200;

/// Truncates `text` to at most [`EXCERPT_LEN`] characters on a char boundary.
#[must_use]
pub fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Request rejected before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// Query text is empty or whitespace.
    #[error("query text must not be empty")]
    EmptyQuery,

    /// Query text exceeds the accepted length.
    #[error("query text is too long ({len} characters, max {max})")]
    QueryTooLong {
        /// Observed length in characters.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// No provider was named.
    #[error("provider is required (one of: google, openrouter)")]
    MissingProvider,

    /// Provider name is not one of the supported backends.
    #[error("unsupported provider '{name}' (expected one of: google, openrouter)")]
    UnsupportedProvider {
        /// Name supplied by the caller.
        name: String,
    },

    /// Provider is supported but has no credential on this server.
    #[error("provider '{provider}' is not configured on this server")]
    ProviderUnavailable {
        /// Provider name.
        provider: &'static str,
    },

    /// Limit outside the accepted range.
    #[error("limit {limit} is out of range [{min}, {max}]")]
    LimitOutOfRange {
        /// Limit supplied by the caller.
        limit: i64,
        /// Smallest accepted limit.
        min: usize,
        /// Largest accepted limit.
        max: usize,
    },

    /// Request body could not be decoded.
    #[error("malformed request: {message}")]
    Malformed {
        /// Decoder message.
        message: String,
    },
}

impl InputError {
    /// Short machine-readable reason.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "empty_query",
            Self::QueryTooLong { .. } => "query_too_long",
            Self::MissingProvider => "missing_provider",
            Self::UnsupportedProvider { .. } => "unsupported_provider",
            Self::ProviderUnavailable { .. } => "provider_unavailable",
            Self::LimitOutOfRange { .. } => "limit_out_of_range",
            Self::Malformed { .. } => "malformed_request",
        }
    }
}

/// Failure reported by a provider backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The call did not finish within the timeout.
    #[error("provider call timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// Timeout that was exceeded.
        timeout: Duration,
    },

    /// The backend answered with a failure status or could not be reached.
    #[error("upstream error ({}): {body}", status_label(.status))]
    UpstreamError {
        /// HTTP status, `None` when no response was received.
        status: Option<u16>,
        /// Snippet of the response body or transport message.
        body: String,
    },

    /// The backend answered without any text.
    #[error("provider returned an empty response")]
    EmptyResponse,
}

#[allow(clippy::ref_option)]
fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "no response".to_string(), |s| format!("HTTP {s}"))
}

impl ProviderError {
    /// Whether the failure is transient and worth one retry.
    ///
    /// Timeouts and server-class failures qualify. A transport failure with
    /// no status never reached a server verdict and is treated as
    /// server-class. Client-class statuses and empty responses are
    /// deterministic and never retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::UpstreamError { status, .. } => match status {
                Some(code) => *code >= 500,
                None => true,
            },
            Self::EmptyResponse => false,
        }
    }

    /// Short machine-readable reason.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::UpstreamError { .. } => "upstream_error",
            Self::EmptyResponse => "empty_response",
        }
    }
}

/// Model output could not be turned into a filter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// No balanced, well-formed JSON object in the output.
    #[error("model output contains no JSON object (excerpt: {excerpt:?})")]
    NotJson {
        /// Start of the raw model output.
        excerpt: String,
    },

    /// A JSON object was found but does not have the predicate-list shape.
    #[error("model output does not match the predicate schema: {message} (excerpt: {excerpt:?})")]
    SchemaMismatch {
        /// What was wrong with the shape.
        message: String,
        /// Start of the raw model output.
        excerpt: String,
    },
}

impl ParseError {
    /// Short machine-readable reason.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::NotJson { .. } => "not_json",
            Self::SchemaMismatch { .. } => "schema_mismatch",
        }
    }
}

/// A parsed filter violates the field whitelist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Predicate names a field outside the whitelist.
    #[error("predicate {index}: unknown field '{field}'")]
    UnknownField {
        /// Position of the predicate.
        index: usize,
        /// Field name as emitted by the model.
        field: String,
    },

    /// Operator is not permitted for the field.
    #[error("predicate {index}: operator '{operator}' is not supported for field '{field}'")]
    UnsupportedOperator {
        /// Position of the predicate.
        index: usize,
        /// Field name.
        field: String,
        /// Operator name as emitted by the model.
        operator: String,
    },

    /// Value does not fit the field type or operator.
    #[error("predicate {index}: invalid value for '{field}' {operator}: {message}")]
    TypeMismatch {
        /// Position of the predicate.
        index: usize,
        /// Field name.
        field: String,
        /// Operator name.
        operator: String,
        /// What was expected.
        message: String,
    },

    /// Filter has more predicates than the ceiling.
    #[error("filter has {count} predicates (max {max})")]
    TooManyPredicates {
        /// Number of predicates in the filter.
        count: usize,
        /// Ceiling.
        max: usize,
    },
}

impl ValidationError {
    /// Short machine-readable reason.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::UnknownField { .. } => "unknown_field",
            Self::UnsupportedOperator { .. } => "unsupported_operator",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::TooManyPredicates { .. } => "too_many_predicates",
        }
    }
}

/// Record store failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `SQLite` error.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row could not be decoded.
    #[error("corrupt row: {message}")]
    CorruptRow {
        /// Decoding failure.
        message: String,
    },

    /// The blocking store task failed.
    #[error("store task failed: {message}")]
    Task {
        /// Join error message.
        message: String,
    },

    /// Filesystem error around the database file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Umbrella error for a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Request rejected pre-flight.
    #[error(transparent)]
    Input(#[from] InputError),

    /// Provider call failed (after any retry).
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Model output could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Parsed filter failed whitelist validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The request was cancelled or exceeded its deadline.
    #[error("request cancelled: {reason}")]
    Cancelled {
        /// Why the run stopped.
        reason: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },
}

impl AgentError {
    /// Error category reported to clients.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input_error",
            Self::Provider(_) => "provider_error",
            Self::Parse(_) => "parse_error",
            Self::Validation(_) => "validation_error",
            Self::Store(_) => "store_error",
            Self::Cancelled { .. } => "cancelled",
            Self::Config { .. } => "config_error",
        }
    }

    /// Finer-grained reason within [`kind`](Self::kind).
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Input(e) => e.reason(),
            Self::Provider(e) => e.reason(),
            Self::Parse(e) => e.reason(),
            Self::Validation(e) => e.reason(),
            Self::Store(_) => "store_failure",
            Self::Cancelled { .. } => "cancelled",
            Self::Config { .. } => "invalid_config",
        }
    }

    /// Terminal pipeline state this error leaves a run in.
    ///
    /// Input and configuration errors never enter the pipeline and map to
    /// `None`.
    #[must_use]
    pub const fn terminal_state(&self) -> Option<PipelineState> {
        match self {
            Self::Input(_) | Self::Config { .. } => None,
            Self::Provider(_) => Some(PipelineState::ProviderFailed),
            Self::Parse(_) => Some(PipelineState::ParseFailed),
            Self::Validation(_) => Some(PipelineState::ValidationFailed),
            Self::Store(_) => Some(PipelineState::StoreFailed),
            Self::Cancelled { .. } => Some(PipelineState::Cancelled),
        }
    }
}

/// CLI command failure.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The command could not run.
    #[error("{0}")]
    ExecutionFailed(String),

    /// The pipeline or store reported an error.
    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        Self::Agent(err.into())
    }
}
