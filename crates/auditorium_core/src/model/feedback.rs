//! Attendee feedback on a conference.

use super::conference::ConferenceId;
use super::user::UserId;
use super::{require_text, ValidationError};
use crate::pagination::{Keyed, OrderBy, OrderingKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type FeedbackId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub conference_id: ConferenceId,
    pub user_id: UserId,
    /// Read-only projection joined from `users`.
    pub user_name: String,
    pub comment: String,
    pub created_at: i64,
}

impl Feedback {
    pub fn new(
        conference_id: ConferenceId,
        user_id: UserId,
        comment: impl Into<String>,
        now_ms: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conference_id,
            user_id,
            user_name: String::new(),
            comment: comment.into().trim().to_string(),
            created_at: now_ms,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("comment", &self.comment)
    }
}

impl Keyed for Feedback {
    fn supports(order_by: OrderBy) -> bool {
        order_by == OrderBy::CreatedAt
    }

    fn ordering_key(&self, _order_by: OrderBy) -> OrderingKey {
        OrderingKey::new(self.created_at, self.id)
    }
}
