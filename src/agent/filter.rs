//! Structured filters and whitelist validation.
//!
//! A [`Filter`] is what the parser extracts from model output: untyped
//! field/operator names and JSON values. [`validate`] checks it against the
//! [`Whitelist`] and produces a typed [`ValidatedFilter`], failing closed on
//! the first bad predicate.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Field, FieldType, Operator, Whitelist};
use crate::error::ValidationError;

/// One field/operator/value condition as emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Predicate {
    /// Field name.
    pub field: String,
    /// Operator name.
    pub operator: String,
    /// Operand.
    pub value: Value,
}

/// AND-combined predicate list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Filter {
    /// Predicates in model order.
    pub predicates: Vec<Predicate>,
}

/// Typed scalar operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    /// Integer operand.
    Integer(i64),
    /// Text operand.
    Text(String),
    /// Boolean operand.
    Boolean(bool),
}

/// A validated, typed condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `field = value`
    Equals {
        /// Field.
        field: Field,
        /// Operand.
        value: Scalar,
    },
    /// `field != value`
    NotEquals {
        /// Field.
        field: Field,
        /// Operand.
        value: Scalar,
    },
    /// Substring match on a text field.
    Contains {
        /// Field.
        field: Field,
        /// Substring to look for.
        needle: String,
    },
    /// Inclusive timestamp range; at least one bound is set.
    DateRange {
        /// Field.
        field: Field,
        /// Lower bound.
        from: Option<DateTime<Utc>>,
        /// Upper bound.
        to: Option<DateTime<Utc>>,
    },
}

impl Condition {
    /// Field the condition applies to.
    #[must_use]
    pub const fn field(&self) -> Field {
        match self {
            Self::Equals { field, .. }
            | Self::NotEquals { field, .. }
            | Self::Contains { field, .. }
            | Self::DateRange { field, .. } => *field,
        }
    }
}

/// A filter that passed whitelist validation. Empty means "match all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedFilter {
    conditions: Vec<Condition>,
}

impl ValidatedFilter {
    /// Conditions in predicate order.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Whether the filter matches everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Parses a `date_range` bound. Date-only values cover the whole UTC day.
fn parse_bound(raw: &str, upper: bool) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if upper {
        NaiveTime::from_hms_opt(23, 59, 59)?
    } else {
        NaiveTime::MIN
    };
    Some(date.and_time(time).and_utc())
}

struct Check<'a> {
    index: usize,
    field: Field,
    operator: Operator,
    value: &'a Value,
}

impl Check<'_> {
    fn mismatch(&self, message: impl Into<String>) -> ValidationError {
        ValidationError::TypeMismatch {
            index: self.index,
            field: self.field.as_str().to_string(),
            operator: self.operator.as_str().to_string(),
            message: message.into(),
        }
    }

    fn scalar(&self, kind: FieldType) -> Result<Scalar, ValidationError> {
        match (kind, self.value) {
            (FieldType::Integer, Value::Number(n)) => n
                .as_i64()
                .map(Scalar::Integer)
                .ok_or_else(|| self.mismatch("expected an integer")),
            (FieldType::Integer, _) => Err(self.mismatch("expected an integer")),
            (FieldType::Text, Value::String(s)) => Ok(Scalar::Text(s.clone())),
            (FieldType::Text, _) => Err(self.mismatch("expected a string")),
            (FieldType::Boolean, Value::Bool(b)) => Ok(Scalar::Boolean(*b)),
            (FieldType::Boolean, _) => Err(self.mismatch("expected true or false")),
            (FieldType::DateTime, _) => Err(self.mismatch("datetime fields only support date_range")),
        }
    }

    fn range(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ValidationError> {
        let Value::Object(map) = self.value else {
            return Err(self.mismatch(r#"expected an object {"from", "to"}"#));
        };
        if let Some(key) = map.keys().find(|k| *k != "from" && *k != "to") {
            return Err(self.mismatch(format!("unexpected key '{key}' in date range")));
        }

        let bound = |key: &str, upper: bool| -> Result<Option<DateTime<Utc>>, ValidationError> {
            match map.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => parse_bound(s, upper).map(Some).ok_or_else(|| {
                    self.mismatch(format!("'{key}' is not an RFC 3339 timestamp or YYYY-MM-DD date"))
                }),
                Some(_) => Err(self.mismatch(format!("'{key}' must be a string"))),
            }
        };
        let from = bound("from", false)?;
        let to = bound("to", true)?;

        match (from, to) {
            (None, None) => Err(self.mismatch("date range needs 'from' or 'to'")),
            (Some(f), Some(t)) if f > t => Err(self.mismatch("'from' is after 'to'")),
            _ => Ok((from, to)),
        }
    }

    fn condition(&self, kind: FieldType) -> Result<Condition, ValidationError> {
        let field = self.field;
        match self.operator {
            Operator::Equals => Ok(Condition::Equals {
                field,
                value: self.scalar(kind)?,
            }),
            Operator::NotEquals => Ok(Condition::NotEquals {
                field,
                value: self.scalar(kind)?,
            }),
            Operator::Is => match self.value {
                Value::Bool(b) => Ok(Condition::Equals {
                    field,
                    value: Scalar::Boolean(*b),
                }),
                _ => Err(self.mismatch("expected true or false")),
            },
            Operator::Contains => match self.value {
                Value::String(s) if !s.is_empty() => Ok(Condition::Contains {
                    field,
                    needle: s.clone(),
                }),
                Value::String(_) => Err(self.mismatch("expected a non-empty string")),
                _ => Err(self.mismatch("expected a string")),
            },
            Operator::DateRange => {
                let (from, to) = self.range()?;
                Ok(Condition::DateRange { field, from, to })
            }
        }
    }
}

/// Validates `filter` against `whitelist`.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered: the predicate ceiling
/// is checked before any predicate, then each predicate in order for field,
/// operator and value type.
pub fn validate(
    filter: &Filter,
    whitelist: &Whitelist,
    max_predicates: usize,
) -> Result<ValidatedFilter, ValidationError> {
    if filter.predicates.len() > max_predicates {
        return Err(ValidationError::TooManyPredicates {
            count: filter.predicates.len(),
            max: max_predicates,
        });
    }

    let mut conditions = Vec::with_capacity(filter.predicates.len());
    for (index, predicate) in filter.predicates.iter().enumerate() {
        let spec = whitelist
            .get(&predicate.field)
            .ok_or_else(|| ValidationError::UnknownField {
                index,
                field: predicate.field.clone(),
            })?;

        let operator = Operator::parse(&predicate.operator)
            .filter(|op| spec.permits(*op))
            .ok_or_else(|| ValidationError::UnsupportedOperator {
                index,
                field: predicate.field.clone(),
                operator: predicate.operator.clone(),
            })?;

        let check = Check {
            index,
            field: spec.field,
            operator,
            value: &predicate.value,
        };
        conditions.push(check.condition(spec.kind)?);
    }

    Ok(ValidatedFilter { conditions })
}
