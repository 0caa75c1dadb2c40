//! The fixed set of queryable user fields and their permitted operators.
//!
//! The whitelist is a process-wide constant: every translated filter is
//! checked against it before any record store access, and the prompt
//! builder embeds it verbatim so the model only sees what it may use.

use serde::Serialize;

/// A queryable user field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Primary key.
    Id,
    /// Email address.
    Email,
    /// Login name.
    Username,
    /// Given name.
    FirstName,
    /// Family name.
    LastName,
    /// Whether the account is active.
    IsActive,
    /// Creation timestamp.
    CreatedAt,
    /// Last update timestamp.
    UpdatedAt,
}

impl Field {
    /// Wire name of the field (also its column name).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Email => "email",
            Self::Username => "username",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::IsActive => "is_active",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    /// Looks up a field by exact wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Whitelist::users()
            .fields()
            .iter()
            .map(|spec| spec.field)
            .find(|f| f.as_str() == name)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Signed 64-bit integer.
    Integer,
    /// UTF-8 text.
    Text,
    /// `true` / `false`.
    Boolean,
    /// UTC timestamp.
    DateTime,
}

impl FieldType {
    /// Name used in prompts and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
        }
    }
}

/// Filter operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Exact match.
    Equals,
    /// Exact mismatch.
    NotEquals,
    /// Substring match on text.
    Contains,
    /// Boolean test.
    Is,
    /// Inclusive timestamp range.
    DateRange,
}

impl Operator {
    /// Every operator, in prompt order.
    pub const ALL: [Self; 5] = [
        Self::Equals,
        Self::NotEquals,
        Self::Contains,
        Self::Is,
        Self::DateRange,
    ];

    /// Wire name of the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::Is => "is",
            Self::DateRange => "date_range",
        }
    }

    /// Looks up an operator by exact wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One whitelist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// The field.
    pub field: Field,
    /// Its declared type.
    pub kind: FieldType,
    /// Operators legal for it.
    pub operators: &'static [Operator],
}

impl FieldSpec {
    /// Whether `op` is permitted on this field.
    #[must_use]
    pub fn permits(&self, op: Operator) -> bool {
        self.operators.contains(&op)
    }
}

const TEXT_OPS: &[Operator] = &[Operator::Equals, Operator::NotEquals, Operator::Contains];
const INTEGER_OPS: &[Operator] = &[Operator::Equals, Operator::NotEquals];
const BOOLEAN_OPS: &[Operator] = &[Operator::Equals, Operator::NotEquals, Operator::Is];
const DATETIME_OPS: &[Operator] = &[Operator::DateRange];

static USERS: Whitelist = Whitelist {
    fields: &[
        FieldSpec {
            field: Field::Id,
            kind: FieldType::Integer,
            operators: INTEGER_OPS,
        },
        FieldSpec {
            field: Field::Email,
            kind: FieldType::Text,
            operators: TEXT_OPS,
        },
        FieldSpec {
            field: Field::Username,
            kind: FieldType::Text,
            operators: TEXT_OPS,
        },
        FieldSpec {
            field: Field::FirstName,
            kind: FieldType::Text,
            operators: TEXT_OPS,
        },
        FieldSpec {
            field: Field::LastName,
            kind: FieldType::Text,
            operators: TEXT_OPS,
        },
        FieldSpec {
            field: Field::IsActive,
            kind: FieldType::Boolean,
            operators: BOOLEAN_OPS,
        },
        FieldSpec {
            field: Field::CreatedAt,
            kind: FieldType::DateTime,
            operators: DATETIME_OPS,
        },
        FieldSpec {
            field: Field::UpdatedAt,
            kind: FieldType::DateTime,
            operators: DATETIME_OPS,
        },
    ],
};

/// Ordered, immutable set of queryable fields.
#[derive(Debug, PartialEq, Eq)]
pub struct Whitelist {
    fields: &'static [FieldSpec],
}

impl Whitelist {
    /// The users whitelist.
    #[must_use]
    pub fn users() -> &'static Self {
        &USERS
    }

    /// All entries in declaration order.
    #[must_use]
    pub const fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    /// Looks up an entry by wire name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.field.as_str() == name)
    }

    /// Looks up an entry by field.
    #[must_use]
    pub fn spec(&self, field: Field) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.field == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_whitelist_order() {
        let names: Vec<&str> = Whitelist::users()
            .fields()
            .iter()
            .map(|s| s.field.as_str())
            .collect();
        assert_eq!(
            names,
            [
                "id",
                "email",
                "username",
                "first_name",
                "last_name",
                "is_active",
                "created_at",
                "updated_at"
            ]
        );
    }

    #[test_case("email", Operator::Contains, true ; "text contains")]
    #[test_case("is_active", Operator::Is, true ; "boolean is")]
    #[test_case("is_active", Operator::Contains, false ; "boolean contains")]
    #[test_case("id", Operator::Contains, false ; "integer contains")]
    #[test_case("created_at", Operator::DateRange, true ; "datetime range")]
    #[test_case("created_at", Operator::Equals, false ; "datetime equals")]
    fn test_permits(field: &str, op: Operator, expected: bool) {
        let spec = Whitelist::users()
            .get(field)
            .unwrap_or_else(|| unreachable!());
        assert_eq!(spec.permits(op), expected);
    }

    #[test]
    fn test_field_parse() {
        assert_eq!(Field::parse("first_name"), Some(Field::FirstName));
        assert_eq!(Field::parse("password"), None);
        assert_eq!(Field::parse("Email"), None);
    }

    #[test]
    fn test_operator_parse() {
        for op in Operator::ALL {
            assert_eq!(Operator::parse(op.as_str()), Some(op));
        }
        assert_eq!(Operator::parse("like"), None);
    }
}
