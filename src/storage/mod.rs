//! Read-only record store abstraction.
//!
//! The pipeline only ever hands the store a list of AND-combined
//! [`Clause`]s and a row cap. Columns are [`Field`]s, so nothing outside
//! the whitelist can reach generated SQL.

mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

pub use sqlite::SqliteStore;

use crate::core::{Field, UserRecord};
use crate::error::StoreError;

/// Comparison applied by a [`Clause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `LIKE` with `\` as escape character.
    Like,
    /// `>=`
    Gte,
    /// `<=`
    Lte,
}

impl ClauseOp {
    /// SQL operator text.
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Like => "LIKE",
            Self::Gte => ">=",
            Self::Lte => "<=",
        }
    }
}

/// Bound value of a [`Clause`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClauseValue {
    /// Integer.
    Integer(i64),
    /// Text or `LIKE` pattern.
    Text(String),
    /// Boolean.
    Boolean(bool),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
}

/// One store-native condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// Column to test.
    pub column: Field,
    /// Comparison.
    pub op: ClauseOp,
    /// Operand.
    pub value: ClauseValue,
}

impl Clause {
    /// Creates a clause.
    #[must_use]
    pub const fn new(column: Field, op: ClauseOp, value: ClauseValue) -> Self {
        Self { column, op, value }
    }
}

/// Canonical text form of stored timestamps.
///
/// Fixed width with a `Z` suffix, so lexicographic order equals time order.
#[must_use]
pub fn timestamp_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Read-only access to user records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns records matching every clause, ordered by the store, at most
    /// `cap` of them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    async fn find(&self, clauses: &[Clause], cap: usize) -> Result<Vec<UserRecord>, StoreError>;

    /// Checks that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_text_is_sortable() {
        let early = Utc.with_ymd_and_hms(2024, 1, 9, 23, 0, 0).single();
        let late = Utc.with_ymd_and_hms(2024, 1, 10, 1, 0, 0).single();
        let (Some(early), Some(late)) = (early, late) else {
            unreachable!()
        };
        assert_eq!(timestamp_text(early), "2024-01-09T23:00:00Z");
        assert!(timestamp_text(early) < timestamp_text(late));
    }
}
