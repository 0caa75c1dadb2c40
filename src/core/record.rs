//! User record as returned by query results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user row restricted to whitelisted fields.
///
/// The store's password column is never selected, so it cannot leak
/// through a query result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Primary key.
    pub id: i64,
    /// Email address.
    pub email: String,
    /// Login name.
    pub username: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Whether the account is active.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A user to insert into the store (fixtures and seeding).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    /// Email address.
    pub email: String,
    /// Login name.
    pub username: String,
    /// Password (stored, never returned).
    pub password: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Whether the account is active.
    pub is_active: bool,
    /// Creation timestamp; defaults to now on insert.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewUser {
    /// Active user with placeholder names derived from `username`.
    #[must_use]
    pub fn new(email: impl Into<String>, username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            email: email.into(),
            first_name: username.clone(),
            last_name: "User".to_string(),
            password: "changeme".to_string(),
            username,
            is_active: true,
            created_at: None,
        }
    }

    /// Sets the active flag.
    #[must_use]
    pub const fn active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Sets the given and family names.
    #[must_use]
    pub fn named(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub const fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}
