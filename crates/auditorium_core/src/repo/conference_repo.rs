//! Conference repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist conferences and serve keyset pages and venue overlap queries.
//!
//! # Invariants
//! - Write paths call `Conference::validate()` before SQL mutations.
//! - `host_name` and `registration_count` are derived on read, never stored.
//! - Listing order is `(primary, id)` with `primary` chosen by [`OrderBy`].

use super::{
    classify_write_error, ensure_connection_ready, escape_like, overlap, parse_count, parse_uuid,
    push_keyset_window, run_immediate, KeyColumns, RepoError, RepoResult, WriteSerializer,
};
use crate::model::conference::{Conference, ConferenceId, ConferenceStatus};
use crate::model::interval::Interval;
use crate::model::now_epoch_ms;
use crate::model::user::UserId;
use crate::pagination::{KeysetWindow, OrderBy, RowSource};
use crate::schedule::{ConflictScope, OverlapSource, ScheduledEntity};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

pub(super) const CONFERENCE_SELECT_SQL: &str = "SELECT
    c.id AS id,
    c.title AS title,
    c.description AS description,
    c.speaker_name AS speaker_name,
    c.speaker_title AS speaker_title,
    c.target_audience AS target_audience,
    c.prerequisites AS prerequisites,
    c.seats AS seats,
    c.starts_at AS starts_at,
    c.ends_at AS ends_at,
    c.host_id AS host_id,
    u.name AS host_name,
    c.status AS status,
    (SELECT COUNT(*)
        FROM registrations r_count
        INNER JOIN users u_count
            ON u_count.id = r_count.user_id AND u_count.deleted_at IS NULL
        WHERE r_count.conference_id = c.id) AS registration_count,
    c.created_at AS created_at,
    c.updated_at AS updated_at
FROM conferences c
INNER JOIN users u ON u.id = c.host_id";

/// Row filter for conference listings. Every field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConferenceFilter {
    pub status: Option<ConferenceStatus>,
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    pub host_id: Option<UserId>,
    /// Exclusive lower bound on `starts_at`.
    pub starts_after: Option<i64>,
    /// Exclusive upper bound on `starts_at`.
    pub starts_before: Option<i64>,
    /// Keeps only conferences with `ends_at` strictly after this instant.
    pub ends_after: Option<i64>,
}

/// Repository interface for conference storage.
pub trait ConferenceRepository:
    RowSource<Conference, Filter = ConferenceFilter> + OverlapSource + WriteSerializer
{
    fn create_conference(&self, conference: &Conference) -> RepoResult<ConferenceId>;
    fn get_conference(&self, id: ConferenceId) -> RepoResult<Option<Conference>>;
    /// Persists descriptive fields, seats, interval, status and `updated_at`.
    fn update_conference(&self, conference: &Conference) -> RepoResult<()>;
    fn soft_delete_conference(&self, id: ConferenceId) -> RepoResult<()>;
}

/// SQLite-backed conference repository.
pub struct SqliteConferenceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteConferenceRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ConferenceRepository for SqliteConferenceRepository<'_> {
    fn create_conference(&self, conference: &Conference) -> RepoResult<ConferenceId> {
        conference.validate()?;

        self.conn
            .execute(
                "INSERT INTO conferences (
                    id, title, description, speaker_name, speaker_title, target_audience,
                    prerequisites, seats, starts_at, ends_at, host_id, status,
                    created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
                params![
                    conference.id.to_string(),
                    conference.title,
                    conference.description,
                    conference.speaker_name,
                    conference.speaker_title,
                    conference.target_audience,
                    conference.prerequisites,
                    i64::from(conference.seats),
                    conference.interval.start(),
                    conference.interval.end(),
                    conference.host_id.to_string(),
                    conference.status.as_str(),
                    conference.created_at,
                    conference.updated_at,
                ],
            )
            .map_err(|err| classify_write_error(err, "conference", "host user"))?;

        Ok(conference.id)
    }

    fn get_conference(&self, id: ConferenceId) -> RepoResult<Option<Conference>> {
        let sql = format!("{CONFERENCE_SELECT_SQL} WHERE c.id = ?1 AND c.deleted_at IS NULL;");
        let row = self
            .conn
            .query_row(&sql, [id.to_string()], |row| Ok(parse_conference_row(row)))
            .optional()?;
        row.transpose()
    }

    fn update_conference(&self, conference: &Conference) -> RepoResult<()> {
        conference.validate()?;

        let changed = self.conn.execute(
            "UPDATE conferences
             SET
                title = ?1,
                description = ?2,
                speaker_name = ?3,
                speaker_title = ?4,
                target_audience = ?5,
                prerequisites = ?6,
                seats = ?7,
                starts_at = ?8,
                ends_at = ?9,
                status = ?10,
                updated_at = ?11
             WHERE id = ?12 AND deleted_at IS NULL;",
            params![
                conference.title,
                conference.description,
                conference.speaker_name,
                conference.speaker_title,
                conference.target_audience,
                conference.prerequisites,
                i64::from(conference.seats),
                conference.interval.start(),
                conference.interval.end(),
                conference.status.as_str(),
                conference.updated_at,
                conference.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "conference",
                id: conference.id,
            });
        }
        Ok(())
    }

    fn soft_delete_conference(&self, id: ConferenceId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE conferences
             SET deleted_at = ?1, updated_at = ?1
             WHERE id = ?2 AND deleted_at IS NULL;",
            params![now_epoch_ms(), id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "conference",
                id,
            });
        }
        Ok(())
    }
}

impl RowSource<Conference> for SqliteConferenceRepository<'_> {
    type Filter = ConferenceFilter;

    fn query_page(
        &self,
        filter: &ConferenceFilter,
        window: &KeysetWindow,
    ) -> RepoResult<Vec<Conference>> {
        let mut sql = format!("{CONFERENCE_SELECT_SQL} WHERE c.deleted_at IS NULL");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(status) = filter.status {
            sql.push_str(" AND c.status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(title) = filter.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            // LIKE folds ASCII case only.
            sql.push_str(" AND c.title LIKE ? ESCAPE '\\'");
            bind_values.push(Value::Text(format!("%{}%", escape_like(title))));
        }
        if let Some(host_id) = filter.host_id {
            sql.push_str(" AND c.host_id = ?");
            bind_values.push(Value::Text(host_id.to_string()));
        }
        if let Some(starts_after) = filter.starts_after {
            sql.push_str(" AND c.starts_at > ?");
            bind_values.push(Value::Integer(starts_after));
        }
        if let Some(starts_before) = filter.starts_before {
            sql.push_str(" AND c.starts_at < ?");
            bind_values.push(Value::Integer(starts_before));
        }
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

impl OverlapSource for SqliteConferenceRepository<'_> {
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

impl WriteSerializer for SqliteConferenceRepository<'_> {
    fn serialized<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>,
    {
        run_immediate(self.conn, work)
    }
}

pub(super) fn conference_key_columns(order_by: OrderBy) -> KeyColumns {
    match order_by {
        OrderBy::StartsAt => KeyColumns {
            primary: "c.starts_at",
            tie_break: "c.id",
        },
        OrderBy::CreatedAt => KeyColumns {
            primary: "c.created_at",
            tie_break: "c.id",
        },
    }
}

pub(super) fn query_conferences(
    conn: &Connection,
    sql: &str,
    bind_values: Vec<Value>,
) -> RepoResult<Vec<Conference>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut conferences = Vec::new();
    while let Some(row) = rows.next()? {
        conferences.push(parse_conference_row(row)?);
    }
    Ok(conferences)
}

fn parse_conference_row(row: &Row<'_>) -> RepoResult<Conference> {
    let id_text: String = row.get("id")?;
    let host_text: String = row.get("host_id")?;

    let status_text: String = row.get("status")?;
    let status = ConferenceStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in conferences.status"))
    })?;

    let seats = parse_count(row.get("seats")?, "conferences.seats")?;
    let registration_count = parse_count(row.get("registration_count")?, "registration_count")?;

    let conference = Conference {
        id: parse_uuid(&id_text, "conferences.id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        speaker_name: row.get("speaker_name")?,
        speaker_title: row.get("speaker_title")?,
        target_audience: row.get("target_audience")?,
        prerequisites: row.get("prerequisites")?,
        seats,
        interval: Interval::new(row.get("starts_at")?, row.get("ends_at")?)?,
        host_id: parse_uuid(&host_text, "conferences.host_id")?,
        host_name: row.get("host_name")?,
        status,
        registration_count,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    conference.validate()?;
    Ok(conference)
}
