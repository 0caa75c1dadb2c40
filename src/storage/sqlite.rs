//! `SQLite` users store.
//!
//! Every operation opens its own connection on the blocking pool, so the
//! store is cheap to clone and holds no state besides the database path.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, params, params_from_iter};
use tracing::debug;

use super::{Clause, ClauseOp, ClauseValue, RecordStore, timestamp_text};
use crate::core::{NewUser, UserRecord};
use crate::error::StoreError;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    email       TEXT    NOT NULL UNIQUE,
    username    TEXT    NOT NULL UNIQUE,
    password    TEXT    NOT NULL,
    first_name  TEXT    NOT NULL DEFAULT '',
    last_name   TEXT    NOT NULL DEFAULT '',
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT    NOT NULL,
    updated_at  TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at);
CREATE INDEX IF NOT EXISTS idx_users_is_active ON users(is_active);
";

/// Columns returned by queries. `password` is never selected.
const SELECT_COLUMNS: &str =
    "id, email, username, first_name, last_name, is_active, created_at, updated_at";

/// `SQLite`-backed [`RecordStore`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Creates a store for the database at `path`. Nothing is opened yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` on a fresh connection on the blocking thread pool.
    async fn interact<F, R>(&self, read_only: bool, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&Connection) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let flags = if read_only {
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
            } else {
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX
            };
            let conn = Connection::open_with_flags(&path, flags)?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task {
            message: e.to_string(),
        })?
    }

    /// Creates the database file and the users schema if missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory or schema cannot be created.
    pub async fn init(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.interact(false, |conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;
        debug!(path = %self.path.display(), "users schema ready");
        Ok(())
    }

    /// Inserts a user and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on constraint violations or I/O failures.
    pub async fn insert(&self, user: NewUser) -> Result<i64, StoreError> {
        self.interact(false, move |conn| {
            let created = timestamp_text(user.created_at.unwrap_or_else(Utc::now));
            conn.execute(
                "INSERT INTO users (email, username, password, first_name, last_name, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    user.email,
                    user.username,
                    user.password,
                    user.first_name,
                    user.last_name,
                    user.is_active,
                    created,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }
}

fn sql_value(value: &ClauseValue) -> SqlValue {
    match value {
        ClauseValue::Integer(n) => SqlValue::Integer(*n),
        ClauseValue::Text(s) => SqlValue::Text(s.clone()),
        ClauseValue::Boolean(b) => SqlValue::Integer(i64::from(*b)),
        ClauseValue::Timestamp(at) => SqlValue::Text(timestamp_text(*at)),
    }
}

/// Builds the parameterized `SELECT` for `clauses`.
///
/// Column names come from the whitelist and operators from a closed enum;
/// every operand is a bound parameter.
fn build_select(clauses: &[Clause], cap: usize) -> (String, Vec<SqlValue>) {
    let mut sql = format!("SELECT {SELECT_COLUMNS} FROM users");
    let mut values = Vec::with_capacity(clauses.len() + 1);

    for (i, clause) in clauses.iter().enumerate() {
        sql.push_str(if i == 0 { " WHERE " } else { " AND " });
        let _ = write!(sql, "{} {} ?", clause.column.as_str(), clause.op.sql());
        if clause.op == ClauseOp::Like {
            sql.push_str(r" ESCAPE '\'");
        }
        values.push(sql_value(&clause.value));
    }

    sql.push_str(" ORDER BY id ASC LIMIT ?");
    values.push(SqlValue::Integer(i64::try_from(cap).unwrap_or(i64::MAX)));
    (sql, values)
}

type RawRow = (i64, String, String, String, String, bool, String, String);

fn parse_timestamp(raw: &str, column: &str, id: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow {
            message: format!("user {id}: bad {column} '{raw}': {e}"),
        })
}

fn into_record(row: RawRow) -> Result<UserRecord, StoreError> {
    let (id, email, username, first_name, last_name, is_active, created_at, updated_at) = row;
    Ok(UserRecord {
        id,
        email,
        username,
        first_name,
        last_name,
        is_active,
        created_at: parse_timestamp(&created_at, "created_at", id)?,
        updated_at: parse_timestamp(&updated_at, "updated_at", id)?,
    })
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn find(&self, clauses: &[Clause], cap: usize) -> Result<Vec<UserRecord>, StoreError> {
        let (sql, values) = build_select(clauses, cap);
        debug!(%sql, params = values.len(), "users select");

        self.interact(true, move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values), |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                    ))
                })?
                .collect::<Result<Vec<RawRow>, _>>()?;
            rows.into_iter().map(into_record).collect()
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.interact(true, |conn| {
            conn.prepare("SELECT 1 FROM users LIMIT 1")?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Field;
    use chrono::TimeZone;

    async fn seeded() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let store = SqliteStore::new(dir.path().join("nested/users.db"));
        store.init().await.unwrap_or_else(|e| unreachable!("{e}"));

        let jan = Utc
            .with_ymd_and_hms(2024, 1, 15, 12, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!());
        let users = [
            NewUser::new("john@example.com", "john").named("John", "Doe"),
            NewUser::new("jane@example.com", "jane_100%")
                .named("Jane", "Smith")
                .active(false)
                .created_at(jan),
            NewUser::new("bob@example.org", "bob").named("Bob", "Smith").active(false),
        ];
        for user in users {
            store.insert(user).await.unwrap_or_else(|e| unreachable!("{e}"));
        }
        (dir, store)
    }

    #[test]
    fn test_build_select_shape() {
        let clauses = [
            Clause::new(Field::IsActive, ClauseOp::Eq, ClauseValue::Boolean(false)),
            Clause::new(Field::Email, ClauseOp::Like, ClauseValue::Text("%x%".into())),
        ];
        let (sql, values) = build_select(&clauses, 5);
        assert_eq!(
            sql,
            format!(
                r"SELECT {SELECT_COLUMNS} FROM users WHERE is_active = ? AND email LIKE ? ESCAPE '\' ORDER BY id ASC LIMIT ?"
            )
        );
        assert_eq!(values.len(), 3);
        assert!(!sql.contains("password"));
    }

    #[tokio::test]
    async fn test_find_all_ordered_and_capped() {
        let (_dir, store) = seeded().await;
        let all = store.find(&[], 10).await.unwrap_or_default();
        let ids: Vec<i64> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, [1, 2, 3]);

        let capped = store.find(&[], 2).await.unwrap_or_default();
        assert_eq!(capped.len(), 2);
    }

    #[tokio::test]
    async fn test_find_with_clauses() {
        let (_dir, store) = seeded().await;
        let clauses = [
            Clause::new(Field::IsActive, ClauseOp::Eq, ClauseValue::Boolean(false)),
            Clause::new(Field::LastName, ClauseOp::Eq, ClauseValue::Text("Smith".into())),
        ];
        let rows = store.find(&clauses, 10).await.unwrap_or_default();
        let names: Vec<&str> = rows.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, ["jane_100%", "bob"]);
    }

    #[tokio::test]
    async fn test_find_like_escapes_wildcards() {
        let (_dir, store) = seeded().await;
        let literal = [Clause::new(
            Field::Username,
            ClauseOp::Like,
            ClauseValue::Text(r"%100\%%".into()),
        )];
        let rows = store.find(&literal, 10).await.unwrap_or_default();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].email, "jane@example.com");
    }

    #[tokio::test]
    async fn test_find_timestamp_bounds() {
        let (_dir, store) = seeded().await;
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single();
        let to = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).single();
        let (Some(from), Some(to)) = (from, to) else {
            unreachable!()
        };
        let clauses = [
            Clause::new(Field::CreatedAt, ClauseOp::Gte, ClauseValue::Timestamp(from)),
            Clause::new(Field::CreatedAt, ClauseOp::Lte, ClauseValue::Timestamp(to)),
        ];
        let rows = store.find(&clauses, 10).await.unwrap_or_default();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].username, "jane_100%");
        assert!(!rows[0].is_active);
    }

    #[tokio::test]
    async fn test_ping() {
        let (_dir, store) = seeded().await;
        assert!(store.ping().await.is_ok());

        let missing = SqliteStore::new("/nonexistent/dir/users.db");
        assert!(missing.ping().await.is_err());
    }

    #[tokio::test]
    async fn test_find_on_missing_database_fails() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let store = SqliteStore::new(dir.path().join("absent.db"));
        assert!(matches!(
            store.find(&[], 1).await,
            Err(StoreError::Sqlite(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (_dir, store) = seeded().await;
        let result = store.insert(NewUser::new("john@example.com", "other")).await;
        assert!(result.is_err());
    }
}
