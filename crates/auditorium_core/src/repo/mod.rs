//! Repository layer: SQLite row sources for the reservation core.
//!
//! # Responsibility
//! - Implement the pagination, overlap and persistence contracts over SQLite.
//! - Keep every SQL detail inside this module.
//!
//! # Invariants
//! - Caller values (filters, cursor boundaries, limits) are bound parameters;
//!   the only text spliced into SQL is static column names and keywords.
//! - Writes validate the domain record before touching storage.
//! - Soft-deleted rows are invisible to every read path.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::ValidationError;
use crate::pagination::KeysetWindow;
use rusqlite::types::Value;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod conference_repo;
pub mod feedback_repo;
mod overlap;
pub mod registration_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every row source.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Validation(ValidationError),
    NotFound { entity: &'static str, id: Uuid },
    /// A uniqueness rule on `what` rejected the write.
    Duplicate(&'static str),
    /// The write references a `what` row that does not exist.
    MissingReference(&'static str),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Duplicate(what) => write!(f, "{what} already exists"),
            Self::MissingReference(what) => write!(f, "referenced {what} does not exist"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Serializes a check-then-act sequence against other writers.
///
/// Everything `work` reads and writes through repositories sharing the same
/// connection happens inside one exclusive write section; an `Err` from
/// `work` rolls every write back.
pub trait WriteSerializer {
    fn serialized<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>;
}

/// Runs `work` inside `BEGIN IMMEDIATE ... COMMIT` on `conn`.
pub(crate) fn run_immediate<T, E, F>(conn: &Connection, work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<RepoError>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(RepoError::from)?;
    // Dropping `tx` on the error path rolls back.
    let value = work()?;
    tx.commit().map_err(RepoError::from)?;
    Ok(value)
}

/// Static column pair a keyset ordering sorts on.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KeyColumns {
    pub primary: &'static str,
    pub tie_break: &'static str,
}

/// Appends boundary predicate, `ORDER BY` and `LIMIT` for `window`.
///
/// `sql` must already end inside a `WHERE` clause.
pub(crate) fn push_keyset_window(
    sql: &mut String,
    bind_values: &mut Vec<Value>,
    window: &KeysetWindow,
    columns: KeyColumns,
) {
    if let Some(boundary) = window.boundary {
        sql.push_str(&format!(
            " AND ({}, {}) {} (?, ?)",
            columns.primary,
            columns.tie_break,
            boundary.comparison.as_sql()
        ));
        bind_values.push(Value::Integer(boundary.key.primary));
        bind_values.push(Value::Text(boundary.key.tie_break.to_string()));
    }

    let direction = window.fetch_direction.as_sql();
    sql.push_str(&format!(
        " ORDER BY {} {direction}, {} {direction} LIMIT ?",
        columns.primary, columns.tie_break
    ));
    bind_values.push(Value::Integer(i64::from(window.fetch_limit)));
}

/// Rejects connections whose schema is not fully migrated.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

/// Maps constraint failures of a write to semantic errors.
pub(crate) fn classify_write_error(
    err: rusqlite::Error,
    duplicate: &'static str,
    reference: &'static str,
) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        match failure.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return RepoError::Duplicate(duplicate);
            }
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                return RepoError::MissingReference(reference);
            }
            _ => {}
        }
    }
    RepoError::from(err)
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_count(value: i64, column: &str) -> RepoResult<u32> {
    u32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid count `{value}` in {column}")))
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
