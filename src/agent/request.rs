//! Incoming query requests and their pre-flight validation.

use serde::{Deserialize, Serialize};

use super::config::AgentConfig;
use crate::error::InputError;

/// Supported provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini (`generateContent`).
    Google,
    /// `OpenRouter` (chat completions).
    OpenRouter,
}

impl ProviderKind {
    /// Every supported provider.
    pub const ALL: [Self; 2] = [Self::Google, Self::OpenRouter];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::OpenRouter => "openrouter",
        }
    }

    /// Parses a wire name, ignoring case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::UnsupportedProvider`] for any other name.
    pub fn parse(name: &str) -> Result<Self, InputError> {
        let normalized = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| InputError::UnsupportedProvider {
                name: name.to_string(),
            })
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw query request as received from a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Natural-language query text.
    pub query: String,
    /// Provider name.
    #[serde(default)]
    pub provider: Option<String>,
    /// Maximum number of records.
    #[serde(default)]
    pub limit: Option<i64>,
}

impl QueryRequest {
    /// Creates a request with the default limit.
    #[must_use]
    pub fn new(query: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            provider: Some(provider.into()),
            limit: None,
        }
    }

    /// Sets the limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Checks the request against `config`.
    ///
    /// # Errors
    ///
    /// Returns the first [`InputError`] found, checking text, then
    /// provider, then limit.
    pub fn validate(&self, config: &AgentConfig) -> Result<ValidatedRequest, InputError> {
        let text = self.query.trim();
        if text.is_empty() {
            return Err(InputError::EmptyQuery);
        }
        let len = text.chars().count();
        if len > config.max_query_chars {
            return Err(InputError::QueryTooLong {
                len,
                max: config.max_query_chars,
            });
        }

        let provider = self
            .provider
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or(InputError::MissingProvider)
            .and_then(ProviderKind::parse)?;

        let limit = match self.limit {
            None => config.default_limit,
            Some(n) => usize::try_from(n)
                .ok()
                .filter(|n| (1..=config.max_limit).contains(n))
                .ok_or(InputError::LimitOutOfRange {
                    limit: n,
                    min: 1,
                    max: config.max_limit,
                })?,
        };

        Ok(ValidatedRequest {
            text: text.to_string(),
            provider,
            limit,
        })
    }
}

/// A request that passed pre-flight validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    /// Trimmed query text.
    pub text: String,
    /// Selected backend.
    pub provider: ProviderKind,
    /// Result cap in `[1, max_limit]`.
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn config() -> AgentConfig {
        AgentConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    #[test_case("google", ProviderKind::Google ; "google")]
    #[test_case("openrouter", ProviderKind::OpenRouter ; "openrouter")]
    #[test_case(" Google ", ProviderKind::Google ; "case and space")]
    fn test_provider_parse(name: &str, expected: ProviderKind) {
        assert_eq!(ProviderKind::parse(name), Ok(expected));
    }

    #[test]
    fn test_provider_parse_unknown() {
        assert_eq!(
            ProviderKind::parse("anthropic"),
            Err(InputError::UnsupportedProvider {
                name: "anthropic".to_string()
            })
        );
    }

    #[test]
    fn test_validate_defaults_limit() {
        let validated = QueryRequest::new("  find john  ", "google")
            .validate(&config())
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(validated.text, "find john");
        assert_eq!(validated.provider, ProviderKind::Google);
        assert_eq!(validated.limit, 20);
    }

    #[test_case(1 ; "lower bound")]
    #[test_case(100 ; "upper bound")]
    fn test_validate_limit_in_range(limit: i64) {
        let validated = QueryRequest::new("q", "openrouter")
            .with_limit(limit)
            .validate(&config());
        assert!(validated.is_ok());
    }

    #[test_case(0 ; "zero")]
    #[test_case(-1 ; "negative")]
    #[test_case(101 ; "above max")]
    fn test_validate_limit_out_of_range(limit: i64) {
        let err = QueryRequest::new("q", "google")
            .with_limit(limit)
            .validate(&config())
            .unwrap_err();
        assert_eq!(err.reason(), "limit_out_of_range");
    }

    #[test]
    fn test_validate_empty_text() {
        let err = QueryRequest::new("   ", "google")
            .validate(&config())
            .unwrap_err();
        assert_eq!(err, InputError::EmptyQuery);
    }

    #[test]
    fn test_validate_text_too_long() {
        let err = QueryRequest::new("x".repeat(501), "google")
            .validate(&config())
            .unwrap_err();
        assert_eq!(err, InputError::QueryTooLong { len: 501, max: 500 });
    }

    #[test]
    fn test_validate_missing_provider() {
        let request = QueryRequest {
            query: "q".to_string(),
            ..QueryRequest::default()
        };
        assert_eq!(request.validate(&config()), Err(InputError::MissingProvider));
    }

    #[test]
    fn test_request_deserializes_without_optional_fields() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"query": "all users"}"#).unwrap_or_default();
        assert_eq!(request.query, "all users");
        assert!(request.provider.is_none());
        assert!(request.limit.is_none());
    }
}
