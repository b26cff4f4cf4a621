//! Registration use-case service.
//!
//! # Responsibility
//! - Register attendees to approved conferences without double-booking them.
//! - List attendees of a conference and conferences of an attendee.
//!
//! # Invariants
//! - Eligibility, attendee conflict, seat capacity and the insert share one
//!   serialized section: two concurrent registrations cannot both take the
//!   last seat or both pass the conflict check.
//! - Both repositories must share one connection so the section covers them.

use super::{page_error_class, repo_error_class, ErrorClass};
use crate::config::CoreConfig;
use crate::model::conference::{Conference, ConferenceId, ConferenceStatus};
use crate::model::now_epoch_ms;
use crate::model::registration::{RegisteredUser, Registration};
use crate::model::user::UserId;
use crate::pagination::{
    page, OrderBy, PageError, PageLimits, PageQuery, PageResult, SortDirection,
};
use crate::repo::conference_repo::ConferenceRepository;
use crate::repo::registration_repo::{
    RegisteredConferencesFilter, RegisteredUsersFilter, RegistrationRepository,
};
use crate::repo::RepoError;
use crate::schedule::{PolicyError, SchedulingConflict, SchedulingPolicy};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum RegistrationServiceError {
    ConferenceNotFound(ConferenceId),
    UserNotFound(UserId),
    /// Only approved conferences accept registrations.
    ConferenceNotOpen {
        conference_id: ConferenceId,
        status: ConferenceStatus,
    },
    ConferenceEnded(ConferenceId),
    HostCannotRegister(ConferenceId),
    AlreadyRegistered {
        conference_id: ConferenceId,
        user_id: UserId,
    },
    ConferenceFull {
        conference_id: ConferenceId,
        seats: u32,
    },
    SchedulingConflict(SchedulingConflict),
    Page(PageError),
    Repo(RepoError),
}

impl RegistrationServiceError {
    pub fn error_class(&self) -> ErrorClass {
        match self {
            Self::ConferenceNotFound(_) | Self::UserNotFound(_) => ErrorClass::NotFound,
            Self::HostCannotRegister(_) => ErrorClass::Client,
            Self::ConferenceNotOpen { .. }
            | Self::ConferenceEnded(_)
            | Self::AlreadyRegistered { .. }
            | Self::ConferenceFull { .. }
            | Self::SchedulingConflict(_) => ErrorClass::Conflict,
            Self::Page(err) => page_error_class(err),
            Self::Repo(err) => repo_error_class(err),
        }
    }
}

impl Display for RegistrationServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConferenceNotFound(id) => write!(f, "conference not found: {id}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::ConferenceNotOpen {
                conference_id,
                status,
            } => write!(
                f,
                "conference {conference_id} is `{}` and does not accept registrations",
                status.as_str()
            ),
            Self::ConferenceEnded(id) => write!(f, "conference {id} has already ended"),
            Self::HostCannotRegister(id) => {
                write!(f, "host cannot register to their own conference {id}")
            }
            Self::AlreadyRegistered {
                conference_id,
                user_id,
            } => write!(f, "user {user_id} is already registered to {conference_id}"),
            Self::ConferenceFull {
                conference_id,
                seats,
            } => write!(f, "conference {conference_id} is full ({seats} seats)"),
            Self::SchedulingConflict(conflict) => write!(f, "{conflict}"),
            Self::Page(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistrationServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SchedulingConflict(conflict) => Some(conflict),
            Self::Page(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RegistrationServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "conference",
                id,
            } => Self::ConferenceNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<PolicyError> for RegistrationServiceError {
    fn from(value: PolicyError) -> Self {
        match value {
            PolicyError::Conflict(conflict) => Self::SchedulingConflict(conflict),
            PolicyError::RowSource(err) => Self::from(err),
        }
    }
}

impl From<PageError> for RegistrationServiceError {
    fn from(value: PageError) -> Self {
        Self::Page(value)
    }
}

/// Registration service facade over conference and registration repositories.
pub struct RegistrationService<C: ConferenceRepository, R: RegistrationRepository> {
    conferences: C,
    registrations: R,
    policy: SchedulingPolicy,
    limits: PageLimits,
}

impl<C: ConferenceRepository, R: RegistrationRepository> RegistrationService<C, R> {
    pub fn new(
        conferences: C,
        registrations: R,
        policy: SchedulingPolicy,
        limits: PageLimits,
    ) -> Self {
        Self {
            conferences,
            registrations,
            policy,
            limits,
        }
    }

    pub fn with_config(conferences: C, registrations: R, config: &CoreConfig) -> Self {
        Self::new(
            conferences,
            registrations,
            config.scheduling_policy(),
            config.page_limits(),
        )
    }

    /// Registers `user_id` to `conference_id`.
    ///
    /// # Errors
    /// - `ConferenceNotFound` / `UserNotFound` for unknown ids.
    /// - `ConferenceNotOpen`, `ConferenceEnded`, `HostCannotRegister` when the
    ///   conference cannot take this attendee.
    /// - `AlreadyRegistered` on a repeat registration.
    /// - `SchedulingConflict` when the attendee holds an overlapping registration.
    /// - `ConferenceFull` when no seat is left.
    pub fn register(
        &self,
        conference_id: ConferenceId,
        user_id: UserId,
    ) -> Result<Registration, RegistrationServiceError> {
        let now = now_epoch_ms();
        let registration = self
            .registrations
            .serialized(|| -> Result<Registration, RegistrationServiceError> {
                let conference = self.open_conference(conference_id, now)?;
                if !self.registrations.is_active_user(user_id)? {
                    return Err(RegistrationServiceError::UserNotFound(user_id));
                }
                if conference.host_id == user_id {
                    return Err(RegistrationServiceError::HostCannotRegister(conference_id));
                }
                if self.registrations.is_registered(conference_id, user_id)? {
                    return Err(RegistrationServiceError::AlreadyRegistered {
                        conference_id,
                        user_id,
                    });
                }
                self.policy
                    .propose_registration(&self.registrations, &conference.interval, user_id)?;
                if conference.is_full() {
                    return Err(RegistrationServiceError::ConferenceFull {
                        conference_id,
                        seats: conference.seats,
                    });
                }

                let registration = Registration {
                    conference_id,
                    user_id,
                    created_at: now,
                };
                self.registrations
                    .create_registration(&registration)
                    .map_err(|err| match err {
                        RepoError::Duplicate(_) => RegistrationServiceError::AlreadyRegistered {
                            conference_id,
                            user_id,
                        },
                        RepoError::MissingReference(_) => {
                            RegistrationServiceError::UserNotFound(user_id)
                        }
                        other => RegistrationServiceError::from(other),
                    })?;
                Ok(registration)
            })?;

        info!(
            "event=registration_create module=service status=ok conference_id={} user_id={}",
            conference_id, user_id
        );
        Ok(registration)
    }

    /// Attendees of a conference in registration order.
    pub fn list_registered_users(
        &self,
        conference_id: ConferenceId,
        query: &PageQuery,
    ) -> Result<PageResult<RegisteredUser>, RegistrationServiceError> {
        self.require_conference(conference_id)?;
        let request = self
            .limits
            .request(query, OrderBy::CreatedAt, SortDirection::Asc)?;
        let filter = RegisteredUsersFilter { conference_id };
        Ok(page::<RegisteredUser, _>(&self.registrations, &filter, &request)?)
    }

    /// Conferences `user_id` registered to, in temporal order.
    pub fn list_registered_conferences(
        &self,
        user_id: UserId,
        include_past: bool,
        query: &PageQuery,
    ) -> Result<PageResult<Conference>, RegistrationServiceError> {
        let request = self
            .limits
            .request(query, OrderBy::StartsAt, SortDirection::Asc)?;
        let filter = RegisteredConferencesFilter {
            user_id,
            ends_after: (!include_past).then(now_epoch_ms),
        };
        Ok(page::<Conference, _>(&self.registrations, &filter, &request)?)
    }

    pub fn is_registered(
        &self,
        conference_id: ConferenceId,
        user_id: UserId,
    ) -> Result<bool, RegistrationServiceError> {
        Ok(self.registrations.is_registered(conference_id, user_id)?)
    }

    pub fn count_registrations(
        &self,
        conference_id: ConferenceId,
    ) -> Result<u32, RegistrationServiceError> {
        self.require_conference(conference_id)?;
        Ok(self.registrations.count_registrations(conference_id)?)
    }

    fn require_conference(
        &self,
        conference_id: ConferenceId,
    ) -> Result<Conference, RegistrationServiceError> {
        self.conferences
            .get_conference(conference_id)?
            .ok_or(RegistrationServiceError::ConferenceNotFound(conference_id))
    }

    fn open_conference(
        &self,
        conference_id: ConferenceId,
        now: i64,
    ) -> Result<Conference, RegistrationServiceError> {
        let conference = self.require_conference(conference_id)?;
        if conference.status != ConferenceStatus::Approved {
            return Err(RegistrationServiceError::ConferenceNotOpen {
                conference_id,
                status: conference.status,
            });
        }
        if conference.has_ended(now) {
            return Err(RegistrationServiceError::ConferenceEnded(conference_id));
        }
        Ok(conference)
    }
}
