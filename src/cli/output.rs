//! Output formatting for CLI commands.

use std::fmt::Write as _;

use serde::Serialize;

use crate::agent::QueryResult;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; anything unknown falls back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON with a trailing newline.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        let mut out = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("serialization failed: {e}") }).to_string()
        });
        out.push('\n');
        out
    }
}

/// Formats a query result.
///
/// JSON output is the bare record array, matching the HTTP response body.
#[must_use]
pub fn format_query_result(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format.to_json(&result.records),
        OutputFormat::Text => {
            let mut out = String::new();
            if result.records.is_empty() {
                out.push_str("No matching users.\n");
            } else {
                let _ = writeln!(
                    out,
                    "{:>6}  {:<20}  {:<32}  {:<24}  {:<6}  {}",
                    "ID", "USERNAME", "EMAIL", "NAME", "ACTIVE", "CREATED"
                );
                for r in &result.records {
                    let name = format!("{} {}", r.first_name, r.last_name);
                    let _ = writeln!(
                        out,
                        "{:>6}  {:<20}  {:<32}  {:<24}  {:<6}  {}",
                        r.id,
                        r.username,
                        r.email,
                        name.trim(),
                        if r.is_active { "yes" } else { "no" },
                        r.created_at.format("%Y-%m-%d"),
                    );
                }
            }
            let _ = writeln!(
                out,
                "\n---\n{} record(s) | Provider: {}/{} | Attempts: {} | Predicates: {} | Time: {:.1}s",
                result.records.len(),
                result.provider,
                result.model,
                result.provider_attempts,
                result.predicates,
                result.elapsed.as_secs_f64(),
            );
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ProviderKind;
    use crate::core::UserRecord;
    use chrono::{DateTime, Utc};
    use std::time::Duration;

    fn result(records: Vec<UserRecord>) -> QueryResult {
        QueryResult {
            records,
            provider: ProviderKind::Google,
            model: "gemini-2.0-flash".to_string(),
            provider_attempts: 1,
            predicates: 1,
            elapsed: Duration::from_millis(1_200),
        }
    }

    fn john() -> UserRecord {
        UserRecord {
            id: 1,
            email: "john@example.com".to_string(),
            username: "john".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            is_active: true,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("yaml"), OutputFormat::Text);
    }

    #[test]
    fn test_json_is_record_array() {
        let out = format_query_result(&result(vec![john()]), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(value[0]["email"], "john@example.com");
        assert!(value[0].get("password").is_none());
    }

    #[test]
    fn test_text_table_and_footer() {
        let out = format_query_result(&result(vec![john()]), OutputFormat::Text);
        assert!(out.contains("john@example.com"));
        assert!(out.contains("John Doe"));
        assert!(out.contains("Provider: google/gemini-2.0-flash"));
        assert!(out.contains("Time: 1.2s"));
    }

    #[test]
    fn test_text_empty() {
        let out = format_query_result(&result(Vec::new()), OutputFormat::Text);
        assert!(out.starts_with("No matching users."));
    }
}
