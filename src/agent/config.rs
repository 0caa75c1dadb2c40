//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! It is built once at startup and never mutated afterwards.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;

/// Default Gemini model.
const DEFAULT_GOOGLE_MODEL: &str = "gemini-2.0-flash";
/// Default `OpenRouter` model.
const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o-mini";
/// Default Gemini API base.
const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Default `OpenRouter` API base.
const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// Default provider call timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 20;
/// Default overall request deadline in seconds.
const DEFAULT_REQUEST_DEADLINE_SECS: u64 = 45;
/// Slack kept between the provider budget and a derived request deadline.
const DEADLINE_HEADROOM_SECS: u64 = 5;
/// Default delay before the single provider retry.
const DEFAULT_RETRY_DELAY_MS: u64 = 250;
/// Default result limit when the request omits one.
pub const DEFAULT_LIMIT: usize = 20;
/// Hard upper bound on the result limit.
pub const MAX_LIMIT: usize = 100;
/// Default ceiling on predicates per filter.
pub const DEFAULT_MAX_PREDICATES: usize = 10;
/// Provider calls per request: the first call plus one retry.
pub const MAX_PROVIDER_ATTEMPTS: usize = 2;
/// Default maximum query length in characters.
const DEFAULT_MAX_QUERY_CHARS: usize = 500;
/// Default database path.
pub const DEFAULT_DB_PATH: &str = ".nlq/users.db";
/// Default HTTP bind address.
const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Configuration for the query agent.
#[derive(Clone)]
pub struct AgentConfig {
    /// Gemini API key, if configured.
    pub google_api_key: Option<String>,
    /// `OpenRouter` API key, if configured.
    pub openrouter_api_key: Option<String>,
    /// Gemini API base URL.
    pub google_base_url: String,
    /// `OpenRouter` API base URL.
    pub openrouter_base_url: String,
    /// Model used with the google provider.
    pub google_model: String,
    /// Model used with the openrouter provider.
    pub openrouter_model: String,
    /// Timeout for a single provider call.
    pub timeout: Duration,
    /// Deadline for a whole pipeline run.
    pub request_deadline: Duration,
    /// Delay before the one permitted provider retry.
    pub retry_delay: Duration,
    /// Limit applied when a request omits one.
    pub default_limit: usize,
    /// Largest accepted limit.
    pub max_limit: usize,
    /// Ceiling on predicates per filter.
    pub max_predicates: usize,
    /// Maximum query length in characters.
    pub max_query_chars: usize,
    /// Path to the `SQLite` users database.
    pub db_path: PathBuf,
    /// HTTP bind address for `serve`.
    pub bind: String,
    /// Directory containing prompt template overrides.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if a resolved value is out of range.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }

    /// Worst-case time spent on provider calls for one request.
    #[must_use]
    pub fn provider_budget(&self) -> Duration {
        provider_budget(self.timeout, self.retry_delay)
    }
}

/// Every attempt timing out plus the delay before each retry.
fn provider_budget(timeout: Duration, retry_delay: Duration) -> Duration {
    let attempts = u32::try_from(MAX_PROVIDER_ATTEMPTS).unwrap_or(u32::MAX);
    timeout
        .saturating_mul(attempts)
        .saturating_add(retry_delay.saturating_mul(attempts.saturating_sub(1)))
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("AgentConfig")
            .field("google_api_key", &redact(&self.google_api_key))
            .field("openrouter_api_key", &redact(&self.openrouter_api_key))
            .field("google_base_url", &self.google_base_url)
            .field("openrouter_base_url", &self.openrouter_base_url)
            .field("google_model", &self.google_model)
            .field("openrouter_model", &self.openrouter_model)
            .field("timeout", &self.timeout)
            .field("request_deadline", &self.request_deadline)
            .field("retry_delay", &self.retry_delay)
            .field("default_limit", &self.default_limit)
            .field("max_limit", &self.max_limit)
            .field("max_predicates", &self.max_predicates)
            .field("max_query_chars", &self.max_query_chars)
            .field("db_path", &self.db_path)
            .field("bind", &self.bind)
            .field("prompt_dir", &self.prompt_dir)
            .finish()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    google_api_key: Option<String>,
    openrouter_api_key: Option<String>,
    google_base_url: Option<String>,
    openrouter_base_url: Option<String>,
    google_model: Option<String>,
    openrouter_model: Option<String>,
    timeout: Option<Duration>,
    request_deadline: Option<Duration>,
    retry_delay: Option<Duration>,
    default_limit: Option<usize>,
    max_limit: Option<usize>,
    max_predicates: Option<usize>,
    max_query_chars: Option<usize>,
    db_path: Option<PathBuf>,
    bind: Option<String>,
    prompt_dir: Option<PathBuf>,
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.google_api_key.is_none() {
            self.google_api_key = env_nonempty("GOOGLE_API_KEY");
        }
        if self.openrouter_api_key.is_none() {
            self.openrouter_api_key = env_nonempty("OPENROUTER_API_KEY");
        }
        if self.google_base_url.is_none() {
            self.google_base_url = env_nonempty("GOOGLE_BASE_URL");
        }
        if self.openrouter_base_url.is_none() {
            self.openrouter_base_url = env_nonempty("OPENROUTER_BASE_URL");
        }
        if self.google_model.is_none() {
            self.google_model = env_nonempty("NLQ_GOOGLE_MODEL");
        }
        if self.openrouter_model.is_none() {
            self.openrouter_model = env_nonempty("NLQ_OPENROUTER_MODEL");
        }
        if self.timeout.is_none() {
            self.timeout = env_parse("NLQ_TIMEOUT_SECS").map(Duration::from_secs);
        }
        if self.request_deadline.is_none() {
            self.request_deadline = env_parse("NLQ_REQUEST_DEADLINE_SECS").map(Duration::from_secs);
        }
        if self.retry_delay.is_none() {
            self.retry_delay = env_parse("NLQ_RETRY_DELAY_MS").map(Duration::from_millis);
        }
        if self.default_limit.is_none() {
            self.default_limit = env_parse("NLQ_DEFAULT_LIMIT");
        }
        if self.max_limit.is_none() {
            self.max_limit = env_parse("NLQ_MAX_LIMIT");
        }
        if self.max_predicates.is_none() {
            self.max_predicates = env_parse("NLQ_MAX_PREDICATES");
        }
        if self.max_query_chars.is_none() {
            self.max_query_chars = env_parse("NLQ_MAX_QUERY_CHARS");
        }
        if self.db_path.is_none() {
            self.db_path = env_nonempty("NLQ_DB_PATH").map(PathBuf::from);
        }
        if self.bind.is_none() {
            self.bind = env_nonempty("NLQ_BIND");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = env_nonempty("NLQ_PROMPT_DIR").map(PathBuf::from);
        }
        self
    }

    /// Sets the Gemini API key.
    #[must_use]
    pub fn google_api_key(mut self, key: impl Into<String>) -> Self {
        self.google_api_key = Some(key.into());
        self
    }

    /// Sets the `OpenRouter` API key.
    #[must_use]
    pub fn openrouter_api_key(mut self, key: impl Into<String>) -> Self {
        self.openrouter_api_key = Some(key.into());
        self
    }

    /// Sets the Gemini API base URL.
    #[must_use]
    pub fn google_base_url(mut self, url: impl Into<String>) -> Self {
        self.google_base_url = Some(url.into());
        self
    }

    /// Sets the `OpenRouter` API base URL.
    #[must_use]
    pub fn openrouter_base_url(mut self, url: impl Into<String>) -> Self {
        self.openrouter_base_url = Some(url.into());
        self
    }

    /// Sets the Gemini model.
    #[must_use]
    pub fn google_model(mut self, model: impl Into<String>) -> Self {
        self.google_model = Some(model.into());
        self
    }

    /// Sets the `OpenRouter` model.
    #[must_use]
    pub fn openrouter_model(mut self, model: impl Into<String>) -> Self {
        self.openrouter_model = Some(model.into());
        self
    }

    /// Sets the provider call timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the overall request deadline.
    #[must_use]
    pub const fn request_deadline(mut self, duration: Duration) -> Self {
        self.request_deadline = Some(duration);
        self
    }

    /// Sets the delay before a provider retry.
    #[must_use]
    pub const fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Sets the default result limit.
    #[must_use]
    pub const fn default_limit(mut self, n: usize) -> Self {
        self.default_limit = Some(n);
        self
    }

    /// Sets the maximum result limit.
    #[must_use]
    pub const fn max_limit(mut self, n: usize) -> Self {
        self.max_limit = Some(n);
        self
    }

    /// Sets the predicate ceiling.
    #[must_use]
    pub const fn max_predicates(mut self, n: usize) -> Self {
        self.max_predicates = Some(n);
        self
    }

    /// Sets the maximum query length in characters.
    #[must_use]
    pub const fn max_query_chars(mut self, n: usize) -> Self {
        self.max_query_chars = Some(n);
        self
    }

    /// Sets the database path.
    #[must_use]
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// Sets the HTTP bind address.
    #[must_use]
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind = Some(addr.into());
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] when limits are inconsistent, a
    /// timeout is zero, or the request deadline cannot fit every provider
    /// attempt timing out.
    ///
    /// Without an explicit deadline, the default is raised as needed to
    /// cover the provider budget.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let max_limit = self.max_limit.unwrap_or(MAX_LIMIT);
        if max_limit == 0 || max_limit > MAX_LIMIT {
            return Err(AgentError::Config {
                message: format!("max_limit must be in [1, {MAX_LIMIT}], got {max_limit}"),
            });
        }

        let default_limit = self.default_limit.unwrap_or(DEFAULT_LIMIT);
        if default_limit == 0 || default_limit > max_limit {
            return Err(AgentError::Config {
                message: format!("default_limit must be in [1, {max_limit}], got {default_limit}"),
            });
        }

        let max_predicates = self.max_predicates.unwrap_or(DEFAULT_MAX_PREDICATES);
        if max_predicates == 0 {
            return Err(AgentError::Config {
                message: "max_predicates must be at least 1".to_string(),
            });
        }

        let max_query_chars = self.max_query_chars.unwrap_or(DEFAULT_MAX_QUERY_CHARS);
        if max_query_chars == 0 {
            return Err(AgentError::Config {
                message: "max_query_chars must be at least 1".to_string(),
            });
        }

        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let retry_delay = self
            .retry_delay
            .unwrap_or(Duration::from_millis(DEFAULT_RETRY_DELAY_MS));
        let budget = provider_budget(timeout, retry_delay);
        let request_deadline = self.request_deadline.unwrap_or_else(|| {
            Duration::from_secs(DEFAULT_REQUEST_DEADLINE_SECS)
                .max(budget.saturating_add(Duration::from_secs(DEADLINE_HEADROOM_SECS)))
        });
        if timeout.is_zero() || request_deadline.is_zero() {
            return Err(AgentError::Config {
                message: "timeout and request_deadline must be non-zero".to_string(),
            });
        }
        if request_deadline <= budget {
            return Err(AgentError::Config {
                message: format!(
                    "request_deadline ({}ms) must exceed {MAX_PROVIDER_ATTEMPTS} provider timeouts plus retry delay ({}ms)",
                    request_deadline.as_millis(),
                    budget.as_millis(),
                ),
            });
        }

        Ok(AgentConfig {
            google_api_key: self.google_api_key,
            openrouter_api_key: self.openrouter_api_key,
            google_base_url: self
                .google_base_url
                .unwrap_or_else(|| DEFAULT_GOOGLE_BASE_URL.to_string()),
            openrouter_base_url: self
                .openrouter_base_url
                .unwrap_or_else(|| DEFAULT_OPENROUTER_BASE_URL.to_string()),
            google_model: self
                .google_model
                .unwrap_or_else(|| DEFAULT_GOOGLE_MODEL.to_string()),
            openrouter_model: self
                .openrouter_model
                .unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.to_string()),
            timeout,
            request_deadline,
            retry_delay,
            default_limit,
            max_limit,
            max_predicates,
            max_query_chars,
            db_path: self
                .db_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            bind: self.bind.unwrap_or_else(|| DEFAULT_BIND.to_string()),
            prompt_dir: self.prompt_dir,
        })
    }
}
