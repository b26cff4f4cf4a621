//! Overlap queries backing [`OverlapSource`] for SQLite repositories.
//!
//! [`OverlapSource`]: crate::schedule::OverlapSource

use super::{parse_uuid, RepoError, RepoResult};
use crate::model::conference::ConferenceStatus;
use crate::model::interval::Interval;
use crate::schedule::{ConflictScope, ScheduledEntity};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use uuid::Uuid;

const VENUE_OVERLAP_SQL: &str = "SELECT
    c.id AS id,
    c.title AS title,
    c.starts_at AS starts_at,
    c.ends_at AS ends_at,
    c.status AS status
FROM conferences c
WHERE c.deleted_at IS NULL
  AND c.status = 'approved'
  AND c.starts_at < ?
  AND ? < c.ends_at";

const ATTENDEE_OVERLAP_SQL: &str = "SELECT
    c.id AS id,
    c.title AS title,
    c.starts_at AS starts_at,
    c.ends_at AS ends_at,
    NULL AS status
FROM registrations r
INNER JOIN conferences c ON c.id = r.conference_id
WHERE c.deleted_at IS NULL
  AND r.user_id = ?
  AND c.starts_at < ?
  AND ? < c.ends_at";

/// Fetches at most `cap` entities in `scope` overlapping `candidate`.
pub(crate) fn query_overlaps(
    conn: &Connection,
    scope: &ConflictScope,
    candidate: &Interval,
    exclude_id: Option<Uuid>,
    cap: u32,
) -> RepoResult<Vec<ScheduledEntity>> {
    let mut bind_values: Vec<Value> = Vec::new();
    let mut sql = match scope {
        ConflictScope::Venue => VENUE_OVERLAP_SQL.to_string(),
        ConflictScope::Attendee(user_id) => {
            bind_values.push(Value::Text(user_id.to_string()));
            ATTENDEE_OVERLAP_SQL.to_string()
        }
    };
    bind_values.push(Value::Integer(candidate.end()));
    bind_values.push(Value::Integer(candidate.start()));

    if let Some(id) = exclude_id {
        sql.push_str(" AND c.id <> ?");
        bind_values.push(Value::Text(id.to_string()));
    }

    sql.push_str(" ORDER BY c.starts_at ASC, c.id ASC LIMIT ?;");
    bind_values.push(Value::Integer(i64::from(cap)));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut entities = Vec::new();
    while let Some(row) = rows.next()? {
        entities.push(parse_scheduled_row(row)?);
    }
    Ok(entities)
}

fn parse_scheduled_row(row: &Row<'_>) -> RepoResult<ScheduledEntity> {
    let id_text: String = row.get("id")?;
    let status = match row.get::<_, Option<String>>("status")? {
        Some(value) => Some(ConferenceStatus::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid status `{value}` in conferences.status"))
        })?),
        None => None,
    };

    Ok(ScheduledEntity {
        id: parse_uuid(&id_text, "conferences.id")?,
        title: row.get("title")?,
        interval: Interval::new(row.get("starts_at")?, row.get("ends_at")?)?,
        status,
    })
}
