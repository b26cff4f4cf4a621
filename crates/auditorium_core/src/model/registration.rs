//! Registration link between an attendee and a conference.
//!
//! A registration has no lifecycle of its own: while the row exists the
//! attendee holds a seat and the conference's interval blocks their schedule.

use super::conference::ConferenceId;
use super::user::UserId;
use crate::pagination::{Keyed, OrderBy, OrderingKey};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub conference_id: ConferenceId,
    pub user_id: UserId,
    pub created_at: i64,
}

/// Attendee row listed under one conference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub user_id: UserId,
    pub name: String,
    /// Registration timestamp; the insertion-order key.
    pub registered_at: i64,
}

impl Keyed for RegisteredUser {
    fn supports(order_by: OrderBy) -> bool {
        order_by == OrderBy::CreatedAt
    }

    fn ordering_key(&self, _order_by: OrderBy) -> OrderingKey {
        OrderingKey::new(self.registered_at, self.user_id)
    }
}
