//! Scheduling policy for conference and registration writes.
//!
//! # Responsibility
//! - Reject a create/update/approval that would double-book the venue.
//! - Reject a registration that would double-book the attendee.
//!
//! # Invariants
//! - The policy only reads; callers persist after an `Ok`.
//! - Atomicity of check-then-insert is the caller's job (see
//!   [`crate::repo::WriteSerializer`]); the policy alone is a pre-check.

use super::conflict::{find_conflicts, ConflictScope, OverlapSource, ScheduledEntity};
use crate::model::conference::ConferenceId;
use crate::model::interval::Interval;
use crate::model::user::UserId;
use crate::repo::RepoError;
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEFAULT_CONFLICT_CAP: u32 = 10;

/// Proposed venue booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConferenceProposal {
    /// Set when rescheduling or approving an existing conference.
    pub conference_id: Option<ConferenceId>,
    pub host_id: UserId,
    pub interval: Interval,
}

/// Overlap found for a proposed booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulingConflict {
    pub scope: ConflictScope,
    pub candidate: Interval,
    pub conflicts: Vec<ScheduledEntity>,
}

impl Display for SchedulingConflict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let subject = match self.scope {
            ConflictScope::Venue => "venue is already booked",
            ConflictScope::Attendee(_) => "attendee is already registered elsewhere",
        };
        write!(f, "{subject} during {}:", self.candidate)?;
        for entity in &self.conflicts {
            write!(f, " `{}` {}", entity.title, entity.interval)?;
        }
        Ok(())
    }
}

impl Error for SchedulingConflict {}

#[derive(Debug)]
pub enum PolicyError {
    Conflict(SchedulingConflict),
    RowSource(RepoError),
}

impl Display for PolicyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict(conflict) => write!(f, "{conflict}"),
            Self::RowSource(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PolicyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Conflict(conflict) => Some(conflict),
            Self::RowSource(err) => Some(err),
        }
    }
}

impl From<RepoError> for PolicyError {
    fn from(value: RepoError) -> Self {
        Self::RowSource(value)
    }
}

/// Composes the conflict detector with write decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingPolicy {
    conflict_cap: u32,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CONFLICT_CAP)
    }
}

impl SchedulingPolicy {
    /// `conflict_cap` bounds how many conflicting entities are reported.
    pub fn new(conflict_cap: u32) -> Self {
        Self {
            conflict_cap: conflict_cap.max(1),
        }
    }

    pub fn conflict_cap(&self) -> u32 {
        self.conflict_cap
    }

    /// Accepts a venue booking unless it overlaps another approved conference.
    pub fn propose_conference<S: OverlapSource + ?Sized>(
        &self,
        source: &S,
        proposal: &ConferenceProposal,
    ) -> Result<(), PolicyError> {
        let scope = ConflictScope::Venue;
        let conflicts = find_conflicts(
            source,
            &proposal.interval,
            &scope,
            proposal.conference_id,
            self.conflict_cap,
        )?;
        if conflicts.is_empty() {
            return Ok(());
        }

        info!(
            "event=schedule_conflict module=schedule status=rejected scope={} host_id={} starts_at={} ends_at={} conflicts={}",
            scope.as_str(),
            proposal.host_id,
            proposal.interval.start(),
            proposal.interval.end(),
            conflicts.len()
        );
        Err(PolicyError::Conflict(SchedulingConflict {
            scope,
            candidate: proposal.interval,
            conflicts,
        }))
    }

    /// Accepts a registration unless the attendee already holds an overlapping one.
    ///
    /// Seat capacity is a separate counter check owned by the caller.
    pub fn propose_registration<S: OverlapSource + ?Sized>(
        &self,
        source: &S,
        target: &Interval,
        user_id: UserId,
    ) -> Result<(), PolicyError> {
        let scope = ConflictScope::Attendee(user_id);
        let conflicts = find_conflicts(source, target, &scope, None, self.conflict_cap)?;
        if conflicts.is_empty() {
            return Ok(());
        }

        info!(
            "event=schedule_conflict module=schedule status=rejected scope={} user_id={} starts_at={} ends_at={} conflicts={}",
            scope.as_str(),
            user_id,
            target.start(),
            target.end(),
            conflicts.len()
        );
        Err(PolicyError::Conflict(SchedulingConflict {
            scope,
            candidate: *target,
            conflicts,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::conference::ConferenceStatus;
    use uuid::Uuid;

    const HOUR: i64 = 3_600_000;

    fn at(hour: i64, minute: i64) -> i64 {
        hour * HOUR + minute * 60_000
    }

    fn venue() -> Vec<ScheduledEntity> {
        vec![ScheduledEntity {
            id: Uuid::from_u128(7),
            title: "X".to_string(),
            interval: Interval::new(at(10, 0), at(11, 0)).unwrap(),
            status: Some(ConferenceStatus::Approved),
        }]
    }

    fn proposal(start: i64, end: i64) -> ConferenceProposal {
        ConferenceProposal {
            conference_id: None,
            host_id: Uuid::from_u128(1),
            interval: Interval::new(start, end).unwrap(),
        }
    }

    #[test]
    fn overlapping_proposal_is_rejected_naming_the_conflict() {
        let policy = SchedulingPolicy::default();
        let err = policy
            .propose_conference(venue().as_slice(), &proposal(at(10, 30), at(11, 30)))
            .unwrap_err();
        match err {
            PolicyError::Conflict(conflict) => {
                assert_eq!(conflict.conflicts.len(), 1);
                assert_eq!(conflict.conflicts[0].id, Uuid::from_u128(7));
                assert!(conflict.to_string().contains("`X`"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn touching_proposal_is_accepted() {
        let policy = SchedulingPolicy::default();
        policy
            .propose_conference(venue().as_slice(), &proposal(at(11, 0), at(12, 0)))
            .unwrap();
    }

    #[test]
    fn rescheduling_ignores_own_slot() {
        let policy = SchedulingPolicy::default();
        let mut own = proposal(at(10, 15), at(10, 45));
        own.conference_id = Some(Uuid::from_u128(7));
        policy.propose_conference(venue().as_slice(), &own).unwrap();
    }
}
