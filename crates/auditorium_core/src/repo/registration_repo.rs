//! Registration repository contracts and SQLite implementation.
//!
//! # Invariants
//! - One registration per `(conference_id, user_id)`; the primary key rejects repeats.
//! - Registered users list in insertion order `(registrations.created_at, user_id)`.
//! - Registered conferences list in temporal order `(starts_at, conference id)`.
//! - Registrations of soft-deleted users are neither listed nor counted.

use super::conference_repo::{conference_key_columns, query_conferences, CONFERENCE_SELECT_SQL};
use super::{
    classify_write_error, ensure_connection_ready, overlap, parse_count, parse_uuid,
    push_keyset_window, run_immediate, KeyColumns, RepoError, RepoResult, WriteSerializer,
};
use crate::model::conference::{Conference, ConferenceId};
use crate::model::interval::Interval;
use crate::model::registration::{RegisteredUser, Registration};
use crate::model::user::UserId;
use crate::pagination::{KeysetWindow, RowSource};
use crate::schedule::{ConflictScope, OverlapSource, ScheduledEntity};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const REGISTERED_USER_SELECT_SQL: &str = "SELECT
    r.user_id AS user_id,
    u.name AS name,
    r.created_at AS registered_at
FROM registrations r
INNER JOIN users u ON u.id = r.user_id AND u.deleted_at IS NULL";

/// Attendees of one conference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisteredUsersFilter {
    pub conference_id: ConferenceId,
}

/// Conferences one user registered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisteredConferencesFilter {
    pub user_id: UserId,
    /// Keeps only conferences with `ends_at` strictly after this instant.
    pub ends_after: Option<i64>,
}

/// Repository interface for conference registrations.
pub trait RegistrationRepository:
    RowSource<RegisteredUser, Filter = RegisteredUsersFilter>
    + RowSource<Conference, Filter = RegisteredConferencesFilter>
    + OverlapSource
    + WriteSerializer
{
    fn create_registration(&self, registration: &Registration) -> RepoResult<()>;
    fn is_registered(&self, conference_id: ConferenceId, user_id: UserId) -> RepoResult<bool>;
    fn count_registrations(&self, conference_id: ConferenceId) -> RepoResult<u32>;
    /// `false` for unknown and soft-deleted users.
    fn is_active_user(&self, user_id: UserId) -> RepoResult<bool>;
}

/// SQLite-backed registration repository.
pub struct SqliteRegistrationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRegistrationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl RegistrationRepository for SqliteRegistrationRepository<'_> {
    fn create_registration(&self, registration: &Registration) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO registrations (conference_id, user_id, created_at)
                 VALUES (?1, ?2, ?3);",
                params![
                    registration.conference_id.to_string(),
                    registration.user_id.to_string(),
                    registration.created_at,
                ],
            )
            .map_err(|err| classify_write_error(err, "registration", "conference or user"))?;
        Ok(())
    }

    fn is_registered(&self, conference_id: ConferenceId, user_id: UserId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM registrations WHERE conference_id = ?1 AND user_id = ?2
             );",
            params![conference_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn count_registrations(&self, conference_id: ConferenceId) -> RepoResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM registrations r
             INNER JOIN users u ON u.id = r.user_id AND u.deleted_at IS NULL
             WHERE r.conference_id = ?1;",
            [conference_id.to_string()],
            |row| row.get(0),
        )?;
        parse_count(count, "registrations")
    }

    fn is_active_user(&self, user_id: UserId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1 AND deleted_at IS NULL);",
            [user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

impl RowSource<RegisteredUser> for SqliteRegistrationRepository<'_> {
    type Filter = RegisteredUsersFilter;

    fn query_page(
        &self,
        filter: &RegisteredUsersFilter,
        window: &KeysetWindow,
    ) -> RepoResult<Vec<RegisteredUser>> {
        let mut sql = format!("{REGISTERED_USER_SELECT_SQL} WHERE r.conference_id = ?");
        let mut bind_values = vec![Value::Text(filter.conference_id.to_string())];
        push_keyset_window(
            &mut sql,
            &mut bind_values,
            window,
            KeyColumns {
                primary: "r.created_at",
                tie_break: "r.user_id",
            },
        );
        sql.push(';');

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_registered_user_row(row)?);
        }
        Ok(users)
    }
}

impl RowSource<Conference> for SqliteRegistrationRepository<'_> {
    type Filter = RegisteredConferencesFilter;

    fn query_page(
        &self,
        filter: &RegisteredConferencesFilter,
        window: &KeysetWindow,
    ) -> RepoResult<Vec<Conference>> {
        let mut sql = format!(
            "{CONFERENCE_SELECT_SQL}
INNER JOIN registrations r ON r.conference_id = c.id
WHERE c.deleted_at IS NULL AND r.user_id = ?"
        );
        let mut bind_values = vec![Value::Text(filter.user_id.to_string())];
        if let Some(ends_after) = filter.ends_after {
            sql.push_str(" AND c.ends_at > ?");
            bind_values.push(Value::Integer(ends_after));
        }
        push_keyset_window(
            &mut sql,
            &mut bind_values,
            window,
            conference_key_columns(window.order_by),
        );
        sql.push(';');

        query_conferences(self.conn, &sql, bind_values)
    }
}

impl OverlapSource for SqliteRegistrationRepository<'_> {
    fn query_overlaps(
        &self,
        scope: &ConflictScope,
        candidate: &Interval,
        exclude_id: Option<Uuid>,
        cap: u32,
    ) -> RepoResult<Vec<ScheduledEntity>> {
        overlap::query_overlaps(self.conn, scope, candidate, exclude_id, cap)
    }
}

impl WriteSerializer for SqliteRegistrationRepository<'_> {
    fn serialized<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>,
    {
        run_immediate(self.conn, work)
    }
}

fn parse_registered_user_row(row: &Row<'_>) -> RepoResult<RegisteredUser> {
    let user_text: String = row.get("user_id")?;
    Ok(RegisteredUser {
        user_id: parse_uuid(&user_text, "registrations.user_id")?,
        name: row.get("name")?,
        registered_at: row.get("registered_at")?,
    })
}
