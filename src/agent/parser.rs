//! Strict extraction of a structured filter from raw model output.
//!
//! The contract is deliberately narrow: take the first balanced JSON object
//! in the text, require it to be exactly `{"predicates": [...]}`, and apply
//! only type-directed boolean coercion. Anything else fails with an
//! enumerable [`ParseError`].

use serde_json::Value;

use super::filter::Filter;
use crate::core::{FieldType, Whitelist};
use crate::error::{ParseError, excerpt};

/// Returns the first balanced `{...}` span in `text`.
///
/// Braces inside JSON string literals (including escaped quotes) do not
/// count. Scanning bytes is safe on UTF-8 input because the delimiters are
/// ASCII and never occur inside multi-byte sequences.
fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Coerces `"true"`/`"false"` strings to booleans on boolean-typed fields.
fn coerce_booleans(filter: &mut Filter, whitelist: &Whitelist) {
    for predicate in &mut filter.predicates {
        let is_boolean = whitelist
            .get(&predicate.field)
            .is_some_and(|spec| spec.kind == FieldType::Boolean);
        if !is_boolean {
            continue;
        }
        let coerced = match &predicate.value {
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        };
        if let Some(b) = coerced {
            predicate.value = Value::Bool(b);
        }
    }
}

/// Parses raw model output into a [`Filter`].
///
/// # Errors
///
/// Returns [`ParseError::NotJson`] when no balanced, well-formed JSON object
/// is present and [`ParseError::SchemaMismatch`] when the object does not
/// have the predicate-list shape.
pub fn parse(raw: &str) -> Result<Filter, ParseError> {
    let span = first_object_span(raw).ok_or_else(|| ParseError::NotJson {
        excerpt: excerpt(raw),
    })?;

    let value: Value = serde_json::from_str(span).map_err(|_| ParseError::NotJson {
        excerpt: excerpt(raw),
    })?;

    let mut filter: Filter =
        serde_json::from_value(value).map_err(|e| ParseError::SchemaMismatch {
            message: e.to_string(),
            excerpt: excerpt(raw),
        })?;

    for predicate in &mut filter.predicates {
        let field = predicate.field.trim();
        if field.len() != predicate.field.len() {
            predicate.field = field.to_string();
        }
        let operator = predicate.operator.trim();
        if operator.len() != predicate.operator.len() {
            predicate.operator = operator.to_string();
        }
    }
    coerce_booleans(&mut filter, Whitelist::users());

    Ok(filter)
}
