//! Conference domain model and lifecycle.
//!
//! # Invariants
//! - `interval.start < interval.end` by construction of [`Interval`].
//! - Only `Approved` conferences occupy the venue for conflict checks.
//! - Lifecycle edges: `pending -> approved | rejected`, `approved -> cancelled`.

use super::interval::Interval;
use super::user::UserId;
use super::{require_text, ValidationError};
use crate::pagination::{Keyed, OrderBy, OrderingKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ConferenceId = Uuid;

/// Review lifecycle of a conference proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConferenceStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl ConferenceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns whether `self -> next` is a lifecycle edge.
    pub fn can_transition_to(self, next: ConferenceStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Cancelled)
        )
    }

    /// Whether a conference in this state occupies the venue.
    pub fn occupies_venue(self) -> bool {
        self == Self::Approved
    }
}

/// Conference read/write model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
    pub id: ConferenceId,
    pub title: String,
    pub description: String,
    pub speaker_name: String,
    pub speaker_title: String,
    pub target_audience: String,
    pub prerequisites: Option<String>,
    pub seats: u32,
    pub interval: Interval,
    pub host_id: UserId,
    /// Read-only projection joined from `users`; ignored on writes.
    pub host_name: String,
    pub status: ConferenceStatus,
    /// Read-only projection counted from `registrations`; ignored on writes.
    pub registration_count: u32,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Caller input for a new conference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceDraft {
    pub title: String,
    pub description: String,
    pub speaker_name: String,
    pub speaker_title: String,
    pub target_audience: String,
    pub prerequisites: Option<String>,
    pub seats: u32,
    pub starts_at: i64,
    pub ends_at: i64,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConferencePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub speaker_name: Option<String>,
    pub speaker_title: Option<String>,
    pub target_audience: Option<String>,
    pub prerequisites: Option<Option<String>>,
    pub seats: Option<u32>,
    pub starts_at: Option<i64>,
    pub ends_at: Option<i64>,
}

impl Conference {
    /// Builds a pending conference from a draft.
    pub fn from_draft(
        draft: ConferenceDraft,
        host_id: UserId,
        now_ms: i64,
    ) -> Result<Self, ValidationError> {
        let interval = Interval::new(draft.starts_at, draft.ends_at)?;
        let conference = Self {
            id: Uuid::new_v4(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            speaker_name: draft.speaker_name,
            speaker_title: draft.speaker_title,
            target_audience: draft.target_audience,
            prerequisites: draft.prerequisites,
            seats: draft.seats,
            interval,
            host_id,
            host_name: String::new(),
            status: ConferenceStatus::Pending,
            registration_count: 0,
            created_at: now_ms,
            updated_at: now_ms,
        };
        conference.validate()?;
        Ok(conference)
    }

    /// Checks field invariants not already enforced by types.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("speaker_name", &self.speaker_name)?;
        if self.seats == 0 {
            return Err(ValidationError::ZeroSeats);
        }
        Ok(())
    }

    /// Applies `patch` in place and re-validates.
    ///
    /// Returns whether the scheduled interval changed.
    pub fn apply_patch(&mut self, patch: ConferencePatch) -> Result<bool, ValidationError> {
        let starts_at = patch.starts_at.unwrap_or(self.interval.start());
        let ends_at = patch.ends_at.unwrap_or(self.interval.end());
        let interval = Interval::new(starts_at, ends_at)?;
        let rescheduled = interval != self.interval;

        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(speaker_name) = patch.speaker_name {
            self.speaker_name = speaker_name;
        }
        if let Some(speaker_title) = patch.speaker_title {
            self.speaker_title = speaker_title;
        }
        if let Some(target_audience) = patch.target_audience {
            self.target_audience = target_audience;
        }
        if let Some(prerequisites) = patch.prerequisites {
            self.prerequisites = prerequisites;
        }
        if let Some(seats) = patch.seats {
            self.seats = seats;
        }
        self.interval = interval;
        self.validate()?;
        Ok(rescheduled)
    }

    /// Whether the conference is over at `now_ms`.
    pub fn has_ended(&self, now_ms: i64) -> bool {
        self.interval.end() <= now_ms
    }

    pub fn is_full(&self) -> bool {
        self.registration_count >= self.seats
    }
}

impl Keyed for Conference {
    fn supports(order_by: OrderBy) -> bool {
        matches!(order_by, OrderBy::StartsAt | OrderBy::CreatedAt)
    }

    fn ordering_key(&self, order_by: OrderBy) -> OrderingKey {
        match order_by {
            OrderBy::StartsAt => OrderingKey::new(self.interval.start(), self.id),
            OrderBy::CreatedAt => OrderingKey::new(self.created_at, self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ConferenceDraft {
        ConferenceDraft {
            title: "  Rust in Production ".to_string(),
            description: "war stories".to_string(),
            speaker_name: "Sam".to_string(),
            speaker_title: "Engineer".to_string(),
            target_audience: "backend".to_string(),
            prerequisites: None,
            seats: 30,
            starts_at: 1_000,
            ends_at: 2_000,
        }
    }

    #[test]
    fn from_draft_starts_pending_with_trimmed_title() {
        let conference = Conference::from_draft(draft(), Uuid::new_v4(), 5).unwrap();
        assert_eq!(conference.status, ConferenceStatus::Pending);
        assert_eq!(conference.title, "Rust in Production");
        assert_eq!(conference.created_at, 5);
    }

    #[test]
    fn from_draft_rejects_bad_fields() {
        let mut zero_seats = draft();
        zero_seats.seats = 0;
        assert_eq!(
            Conference::from_draft(zero_seats, Uuid::new_v4(), 0).unwrap_err(),
            ValidationError::ZeroSeats
        );

        let mut inverted = draft();
        inverted.ends_at = 500;
        assert!(matches!(
            Conference::from_draft(inverted, Uuid::new_v4(), 0).unwrap_err(),
            ValidationError::InvalidInterval { .. }
        ));
    }

    #[test]
    fn lifecycle_edges() {
        use ConferenceStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Cancelled));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Cancelled.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(Cancelled));
    }

    #[test]
    fn apply_patch_reports_reschedule() {
        let mut conference = Conference::from_draft(draft(), Uuid::new_v4(), 0).unwrap();
        let moved = conference
            .apply_patch(ConferencePatch {
                title: Some("Renamed".to_string()),
                ..ConferencePatch::default()
            })
            .unwrap();
        assert!(!moved);
        assert_eq!(conference.title, "Renamed");

        let moved = conference
            .apply_patch(ConferencePatch {
                ends_at: Some(3_000),
                ..ConferencePatch::default()
            })
            .unwrap();
        assert!(moved);
        assert_eq!(conference.interval.end(), 3_000);
    }
}
