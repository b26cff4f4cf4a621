//! Conference use-case service.
//!
//! # Responsibility
//! - Create, reschedule, transition and list conferences.
//! - Keep the venue free of overlapping approved conferences.
//!
//! # Invariants
//! - Every write that can change venue occupancy runs the venue proposal check
//!   and the write inside one serialized section.
//! - Lifecycle moves only along `pending -> approved|rejected` and `approved -> cancelled`.
//! - Listings default to approved, not-yet-ended conferences in temporal order.

use super::{page_error_class, repo_error_class, ErrorClass};
use crate::config::CoreConfig;
use crate::model::conference::{
    Conference, ConferenceDraft, ConferenceId, ConferencePatch, ConferenceStatus,
};
use crate::model::user::UserId;
use crate::model::{now_epoch_ms, ValidationError};
use crate::pagination::{
    page, OrderBy, PageError, PageLimits, PageQuery, PageResult, SortDirection,
};
use crate::repo::conference_repo::{ConferenceFilter, ConferenceRepository};
use crate::repo::RepoError;
use crate::schedule::{ConferenceProposal, PolicyError, SchedulingConflict, SchedulingPolicy};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ConferenceServiceError {
    Validation(ValidationError),
    ConferenceNotFound(ConferenceId),
    InvalidTransition {
        from: ConferenceStatus,
        to: ConferenceStatus,
    },
    /// Seats cannot drop below the number of registered attendees.
    SeatsBelowRegistrations { seats: u32, registered: u32 },
    SchedulingConflict(SchedulingConflict),
    Page(PageError),
    Repo(RepoError),
    /// Write succeeded but the read-back did not return the row.
    InconsistentState(&'static str),
}

impl ConferenceServiceError {
    pub fn error_class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) | Self::SeatsBelowRegistrations { .. } => ErrorClass::Client,
            Self::ConferenceNotFound(_) => ErrorClass::NotFound,
            Self::InvalidTransition { .. } | Self::SchedulingConflict(_) => ErrorClass::Conflict,
            Self::Page(err) => page_error_class(err),
            Self::Repo(err) => repo_error_class(err),
            Self::InconsistentState(_) => ErrorClass::Server,
        }
    }
}

impl Display for ConferenceServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ConferenceNotFound(id) => write!(f, "conference not found: {id}"),
            Self::InvalidTransition { from, to } => write!(
                f,
                "conference cannot move from `{}` to `{}`",
                from.as_str(),
                to.as_str()
            ),
            Self::SeatsBelowRegistrations { seats, registered } => write!(
                f,
                "seats ({seats}) cannot be fewer than registered attendees ({registered})"
            ),
            Self::SchedulingConflict(conflict) => write!(f, "{conflict}"),
            Self::Page(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent conference state: {details}")
            }
        }
    }
}

impl Error for ConferenceServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::SchedulingConflict(conflict) => Some(conflict),
            Self::Page(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ConferenceServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ConferenceServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "conference",
                id,
            } => Self::ConferenceNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<PolicyError> for ConferenceServiceError {
    fn from(value: PolicyError) -> Self {
        match value {
            PolicyError::Conflict(conflict) => Self::SchedulingConflict(conflict),
            PolicyError::RowSource(err) => Self::from(err),
        }
    }
}

impl From<PageError> for ConferenceServiceError {
    fn from(value: PageError) -> Self {
        Self::Page(value)
    }
}

/// Caller parameters of [`ConferenceService::list_conferences`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceListQuery {
    pub title: Option<String>,
    pub host_id: Option<UserId>,
    /// `None` lists approved conferences.
    pub status: Option<ConferenceStatus>,
    pub starts_after: Option<i64>,
    pub starts_before: Option<i64>,
    /// Also list conferences that have already ended.
    pub include_past: bool,
    pub order_by: OrderBy,
    pub direction: SortDirection,
    pub page: PageQuery,
}

impl Default for ConferenceListQuery {
    fn default() -> Self {
        Self {
            title: None,
            host_id: None,
            status: None,
            starts_after: None,
            starts_before: None,
            include_past: false,
            order_by: OrderBy::StartsAt,
            direction: SortDirection::Asc,
            page: PageQuery::default(),
        }
    }
}

/// Conference service facade over a repository implementation.
pub struct ConferenceService<R: ConferenceRepository> {
    repo: R,
    policy: SchedulingPolicy,
    limits: PageLimits,
}

impl<R: ConferenceRepository> ConferenceService<R> {
    pub fn new(repo: R, policy: SchedulingPolicy, limits: PageLimits) -> Self {
        Self {
            repo,
            policy,
            limits,
        }
    }

    pub fn with_config(repo: R, config: &CoreConfig) -> Self {
        Self::new(repo, config.scheduling_policy(), config.page_limits())
    }

    /// Proposes a new conference. It is stored `pending`.
    ///
    /// # Errors
    /// - `Validation` for blank fields, zero seats or an inverted interval.
    /// - `SchedulingConflict` when the slot overlaps an approved conference.
    pub fn create_conference(
        &self,
        host_id: UserId,
        draft: ConferenceDraft,
    ) -> Result<Conference, ConferenceServiceError> {
        let conference = Conference::from_draft(draft, host_id, now_epoch_ms())?;
        let proposal = ConferenceProposal {
            conference_id: None,
            host_id,
            interval: conference.interval,
        };

        self.repo
            .serialized(|| -> Result<(), ConferenceServiceError> {
                self.policy.propose_conference(&self.repo, &proposal)?;
                self.repo.create_conference(&conference)?;
                Ok(())
            })?;

        info!(
            "event=conference_create module=service status=ok conference_id={} host_id={}",
            conference.id, host_id
        );
        self.read_back(conference.id, "created conference not found in read-back")
    }

    pub fn get_conference(&self, id: ConferenceId) -> Result<Conference, ConferenceServiceError> {
        self.repo
            .get_conference(id)?
            .ok_or(ConferenceServiceError::ConferenceNotFound(id))
    }

    pub fn list_conferences(
        &self,
        query: &ConferenceListQuery,
    ) -> Result<PageResult<Conference>, ConferenceServiceError> {
        let request = self
            .limits
            .request(&query.page, query.order_by, query.direction)?;
        let filter = ConferenceFilter {
            status: Some(query.status.unwrap_or(ConferenceStatus::Approved)),
            title: query.title.clone(),
            host_id: query.host_id,
            starts_after: query.starts_after,
            starts_before: query.starts_before,
            ends_after: (!query.include_past).then(now_epoch_ms),
        };
        Ok(page::<Conference, _>(&self.repo, &filter, &request)?)
    }

    /// Applies `patch`. A changed interval is re-proposed against the venue,
    /// ignoring the conference's own slot.
    pub fn update_conference(
        &self,
        id: ConferenceId,
        patch: ConferencePatch,
    ) -> Result<Conference, ConferenceServiceError> {
        self.repo
            .serialized(|| -> Result<(), ConferenceServiceError> {
                let mut conference = self.get_conference(id)?;
                let rescheduled = conference.apply_patch(patch)?;
                if conference.seats < conference.registration_count {
                    return Err(ConferenceServiceError::SeatsBelowRegistrations {
                        seats: conference.seats,
                        registered: conference.registration_count,
                    });
                }
                if rescheduled {
                    self.policy.propose_conference(
                        &self.repo,
                        &ConferenceProposal {
                            conference_id: Some(id),
                            host_id: conference.host_id,
                            interval: conference.interval,
                        },
                    )?;
                }
                conference.updated_at = now_epoch_ms();
                self.repo.update_conference(&conference)?;
                Ok(())
            })?;

        info!("event=conference_update module=service status=ok conference_id={id}");
        self.read_back(id, "updated conference not found in read-back")
    }

    /// Moves a conference along its lifecycle. Approval claims the venue slot.
    pub fn update_status(
        &self,
        id: ConferenceId,
        next: ConferenceStatus,
    ) -> Result<Conference, ConferenceServiceError> {
        let previous = self
            .repo
            .serialized(|| -> Result<ConferenceStatus, ConferenceServiceError> {
                let mut conference = self.get_conference(id)?;
                let previous = conference.status;
                if !previous.can_transition_to(next) {
                    return Err(ConferenceServiceError::InvalidTransition {
                        from: previous,
                        to: next,
                    });
                }
                if next.occupies_venue() {
                    self.policy.propose_conference(
                        &self.repo,
                        &ConferenceProposal {
                            conference_id: Some(id),
                            host_id: conference.host_id,
                            interval: conference.interval,
                        },
                    )?;
                }
                conference.status = next;
                conference.updated_at = now_epoch_ms();
                self.repo.update_conference(&conference)?;
                Ok(previous)
            })?;

        info!(
            "event=conference_status module=service status=ok conference_id={} from={} to={}",
            id,
            previous.as_str(),
            next.as_str()
        );
        self.read_back(id, "transitioned conference not found in read-back")
    }

    pub fn delete_conference(&self, id: ConferenceId) -> Result<(), ConferenceServiceError> {
        self.repo.soft_delete_conference(id)?;
        info!("event=conference_delete module=service status=ok conference_id={id}");
        Ok(())
    }

    fn read_back(
        &self,
        id: ConferenceId,
        details: &'static str,
    ) -> Result<Conference, ConferenceServiceError> {
        self.repo
            .get_conference(id)?
            .ok_or(ConferenceServiceError::InconsistentState(details))
    }
}
