//! Temporal conflict detection over scheduled entities.
//!
//! Two intervals conflict when `a.start < b.end && b.start < a.end`.
//! Touching intervals (one ends exactly when the other starts) never conflict.

use crate::model::conference::{Conference, ConferenceId, ConferenceStatus};
use crate::model::interval::Interval;
use crate::model::user::UserId;
use crate::repo::RepoResult;
use serde::Serialize;
use uuid::Uuid;

/// Subset of scheduled entities a conflict query considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum ConflictScope {
    /// Every approved conference booked in the venue.
    Venue,
    /// Conferences one attendee is registered to.
    Attendee(UserId),
}

impl ConflictScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Venue => "venue",
            Self::Attendee(_) => "attendee",
        }
    }
}

/// Anything holding a time slot: an approved conference or a registration's conference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledEntity {
    pub id: ConferenceId,
    pub title: String,
    pub interval: Interval,
    /// `None` for registrations, which carry no lifecycle.
    pub status: Option<ConferenceStatus>,
}

impl From<&Conference> for ScheduledEntity {
    fn from(value: &Conference) -> Self {
        Self {
            id: value.id,
            title: value.title.clone(),
            interval: value.interval,
            status: Some(value.status),
        }
    }
}

/// Overlap query capability of a row source.
///
/// Implementations return entities in `scope` whose interval intersects
/// `candidate`, excluding `exclude_id`, ordered by start, at most `cap` rows.
pub trait OverlapSource {
    fn query_overlaps(
        &self,
        scope: &ConflictScope,
        candidate: &Interval,
        exclude_id: Option<Uuid>,
        cap: u32,
    ) -> RepoResult<Vec<ScheduledEntity>>;
}

/// Returns up to `cap` entities in `scope` overlapping `candidate`.
///
/// Pure read. Source rows are re-checked against the half-open predicate and
/// scope rules, so a loose source cannot produce false conflicts.
pub fn find_conflicts<S: OverlapSource + ?Sized>(
    source: &S,
    candidate: &Interval,
    scope: &ConflictScope,
    exclude_id: Option<Uuid>,
    cap: u32,
) -> RepoResult<Vec<ScheduledEntity>> {
    if cap == 0 {
        return Ok(Vec::new());
    }

    let mut conflicts = source.query_overlaps(scope, candidate, exclude_id, cap)?;
    conflicts.retain(|entity| {
        Some(entity.id) != exclude_id
            && entity.interval.overlaps(candidate)
            && match scope {
                ConflictScope::Venue => {
                    entity.status.map_or(false, ConferenceStatus::occupies_venue)
                }
                ConflictScope::Attendee(_) => true,
            }
    });
    conflicts.sort_by_key(|entity| (entity.interval.start(), entity.id));
    conflicts.truncate(cap as usize);
    Ok(conflicts)
}

/// In-memory overlap source over a fixed venue schedule.
impl OverlapSource for [ScheduledEntity] {
    fn query_overlaps(
        &self,
        _scope: &ConflictScope,
        candidate: &Interval,
        exclude_id: Option<Uuid>,
        _cap: u32,
    ) -> RepoResult<Vec<ScheduledEntity>> {
        Ok(self
            .iter()
            .filter(|entity| Some(entity.id) != exclude_id && entity.interval.overlaps(candidate))
            .cloned()
            .collect())
    }
}
