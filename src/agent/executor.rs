//! Query executor that turns a validated filter into a bounded store call.
//!
//! Conditions map one-to-one (or one-to-two for date ranges) onto store
//! [`Clause`]s. The row cap is passed to the store and enforced again on the
//! way out, so a misbehaving store can never exceed the requested limit.

use std::sync::Arc;

use tracing::debug;

use super::filter::{Condition, Scalar, ValidatedFilter};
use crate::core::UserRecord;
use crate::error::StoreError;
use crate::storage::{Clause, ClauseOp, ClauseValue, RecordStore};

/// Escapes `LIKE` wildcards so `needle` matches literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn clause_value(value: &Scalar) -> ClauseValue {
    match value {
        Scalar::Integer(n) => ClauseValue::Integer(*n),
        Scalar::Text(s) => ClauseValue::Text(s.clone()),
        Scalar::Boolean(b) => ClauseValue::Boolean(*b),
    }
}

/// Translates validated conditions into store clauses.
#[must_use]
pub fn to_clauses(filter: &ValidatedFilter) -> Vec<Clause> {
    let mut clauses = Vec::with_capacity(filter.conditions().len());
    for condition in filter.conditions() {
        match condition {
            Condition::Equals { field, value } => {
                clauses.push(Clause::new(*field, ClauseOp::Eq, clause_value(value)));
            }
            Condition::NotEquals { field, value } => {
                clauses.push(Clause::new(*field, ClauseOp::Ne, clause_value(value)));
            }
            Condition::Contains { field, needle } => clauses.push(Clause::new(
                *field,
                ClauseOp::Like,
                ClauseValue::Text(format!("%{}%", escape_like(needle))),
            )),
            Condition::DateRange { field, from, to } => {
                if let Some(from) = from {
                    clauses.push(Clause::new(*field, ClauseOp::Gte, ClauseValue::Timestamp(*from)));
                }
                if let Some(to) = to {
                    clauses.push(Clause::new(*field, ClauseOp::Lte, ClauseValue::Timestamp(*to)));
                }
            }
        }
    }
    clauses
}

/// Executes validated filters against a [`RecordStore`].
#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn RecordStore>,
}

impl QueryExecutor {
    /// Creates an executor over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Runs `filter` with a row cap of `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store fails; never retried.
    pub async fn execute(
        &self,
        filter: &ValidatedFilter,
        limit: usize,
    ) -> Result<Vec<UserRecord>, StoreError> {
        let clauses = to_clauses(filter);
        let mut rows = self.store.find(&clauses, limit).await?;
        if rows.len() > limit {
            debug!(returned = rows.len(), limit, "store exceeded row cap, truncating");
            rows.truncate(limit);
        }
        Ok(rows)
    }

    /// Checks that the underlying store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if it is not.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("store", &"<dyn RecordStore>")
            .finish()
    }
}
