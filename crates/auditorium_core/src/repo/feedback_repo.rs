//! Feedback repository contracts and SQLite implementation.
//!
//! # Invariants
//! - At most one active feedback per `(conference_id, user_id)`.
//! - Listing order is insertion order `(created_at, id)`.

use super::{
    classify_write_error, ensure_connection_ready, parse_uuid, push_keyset_window, KeyColumns,
    RepoError, RepoResult,
};
use crate::model::conference::ConferenceId;
use crate::model::feedback::{Feedback, FeedbackId};
use crate::model::now_epoch_ms;
use crate::pagination::{KeysetWindow, RowSource};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const FEEDBACK_SELECT_SQL: &str = "SELECT
    f.id AS id,
    f.conference_id AS conference_id,
    f.user_id AS user_id,
    u.name AS user_name,
    f.comment AS comment,
    f.created_at AS created_at
FROM feedbacks f
INNER JOIN users u ON u.id = f.user_id";

/// Feedback left on one conference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackFilter {
    pub conference_id: ConferenceId,
}

/// Repository interface for conference feedback.
pub trait FeedbackRepository: RowSource<Feedback, Filter = FeedbackFilter> {
    fn create_feedback(&self, feedback: &Feedback) -> RepoResult<FeedbackId>;
    fn get_feedback(&self, id: FeedbackId) -> RepoResult<Option<Feedback>>;
    fn soft_delete_feedback(&self, id: FeedbackId) -> RepoResult<()>;
}

/// SQLite-backed feedback repository.
pub struct SqliteFeedbackRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFeedbackRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl FeedbackRepository for SqliteFeedbackRepository<'_> {
    fn create_feedback(&self, feedback: &Feedback) -> RepoResult<FeedbackId> {
        feedback.validate()?;

        self.conn
            .execute(
                "INSERT INTO feedbacks (id, conference_id, user_id, comment, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    feedback.id.to_string(),
                    feedback.conference_id.to_string(),
                    feedback.user_id.to_string(),
                    feedback.comment,
                    feedback.created_at,
                ],
            )
            .map_err(|err| classify_write_error(err, "feedback", "conference or user"))?;

        Ok(feedback.id)
    }

    fn get_feedback(&self, id: FeedbackId) -> RepoResult<Option<Feedback>> {
        let sql = format!("{FEEDBACK_SELECT_SQL} WHERE f.id = ?1 AND f.deleted_at IS NULL;");
        let row = self
            .conn
            .query_row(&sql, [id.to_string()], |row| Ok(parse_feedback_row(row)))
            .optional()?;
        row.transpose()
    }

    fn soft_delete_feedback(&self, id: FeedbackId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE feedbacks SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL;",
            params![now_epoch_ms(), id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "feedback",
                id,
            });
        }
        Ok(())
    }
}

impl RowSource<Feedback> for SqliteFeedbackRepository<'_> {
    type Filter = FeedbackFilter;

    fn query_page(
        &self,
        filter: &FeedbackFilter,
        window: &KeysetWindow,
    ) -> RepoResult<Vec<Feedback>> {
        let mut sql =
            format!("{FEEDBACK_SELECT_SQL} WHERE f.deleted_at IS NULL AND f.conference_id = ?");
        let mut bind_values = vec![Value::Text(filter.conference_id.to_string())];
        push_keyset_window(
            &mut sql,
            &mut bind_values,
            window,
            KeyColumns {
                primary: "f.created_at",
                tie_break: "f.id",
            },
        );
        sql.push(';');

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut feedbacks = Vec::new();
        while let Some(row) = rows.next()? {
            feedbacks.push(parse_feedback_row(row)?);
        }
        Ok(feedbacks)
    }
}

fn parse_feedback_row(row: &Row<'_>) -> RepoResult<Feedback> {
    let id_text: String = row.get("id")?;
    let conference_text: String = row.get("conference_id")?;
    let user_text: String = row.get("user_id")?;

    let feedback = Feedback {
        id: parse_uuid(&id_text, "feedbacks.id")?,
        conference_id: parse_uuid(&conference_text, "feedbacks.conference_id")?,
        user_id: parse_uuid(&user_text, "feedbacks.user_id")?,
        user_name: row.get("user_name")?,
        comment: row.get("comment")?,
        created_at: row.get("created_at")?,
    };
    feedback.validate()?;
    Ok(feedback)
}
