//! Feedback use-case service.
//!
//! # Invariants
//! - Only registered attendees leave feedback, once per conference.
//! - Feedback lists in insertion order.

use super::{page_error_class, repo_error_class, ErrorClass};
use crate::config::CoreConfig;
use crate::model::conference::ConferenceId;
use crate::model::feedback::{Feedback, FeedbackId};
use crate::model::user::UserId;
use crate::model::{now_epoch_ms, ValidationError};
use crate::pagination::{
    page, OrderBy, PageError, PageLimits, PageQuery, PageResult, SortDirection,
};
use crate::repo::conference_repo::ConferenceRepository;
use crate::repo::feedback_repo::{FeedbackFilter, FeedbackRepository};
use crate::repo::registration_repo::RegistrationRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum FeedbackServiceError {
    Validation(ValidationError),
    ConferenceNotFound(ConferenceId),
    FeedbackNotFound(FeedbackId),
    NotRegistered {
        conference_id: ConferenceId,
        user_id: UserId,
    },
    AlreadySubmitted {
        conference_id: ConferenceId,
        user_id: UserId,
    },
    Page(PageError),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl FeedbackServiceError {
    pub fn error_class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) => ErrorClass::Client,
            Self::ConferenceNotFound(_) | Self::FeedbackNotFound(_) => ErrorClass::NotFound,
            Self::NotRegistered { .. } | Self::AlreadySubmitted { .. } => ErrorClass::Conflict,
            Self::Page(err) => page_error_class(err),
            Self::Repo(err) => repo_error_class(err),
            Self::InconsistentState(_) => ErrorClass::Server,
        }
    }
}

impl Display for FeedbackServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ConferenceNotFound(id) => write!(f, "conference not found: {id}"),
            Self::FeedbackNotFound(id) => write!(f, "feedback not found: {id}"),
            Self::NotRegistered {
                conference_id,
                user_id,
            } => write!(f, "user {user_id} is not registered to {conference_id}"),
            Self::AlreadySubmitted {
                conference_id,
                user_id,
            } => write!(f, "user {user_id} already left feedback on {conference_id}"),
            Self::Page(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent feedback state: {details}"),
        }
    }
}

impl Error for FeedbackServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Page(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for FeedbackServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "feedback",
                id,
            } => Self::FeedbackNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<PageError> for FeedbackServiceError {
    fn from(value: PageError) -> Self {
        Self::Page(value)
    }
}

pub struct FeedbackService<F, C, R>
where
    F: FeedbackRepository,
    C: ConferenceRepository,
    R: RegistrationRepository,
{
    feedbacks: F,
    conferences: C,
    registrations: R,
    limits: PageLimits,
}

impl<F, C, R> FeedbackService<F, C, R>
where
    F: FeedbackRepository,
    C: ConferenceRepository,
    R: RegistrationRepository,
{
    pub fn new(feedbacks: F, conferences: C, registrations: R, limits: PageLimits) -> Self {
        Self {
            feedbacks,
            conferences,
            registrations,
            limits,
        }
    }

    pub fn with_config(
        feedbacks: F,
        conferences: C,
        registrations: R,
        config: &CoreConfig,
    ) -> Self {
        Self::new(feedbacks, conferences, registrations, config.page_limits())
    }

    pub fn create_feedback(
        &self,
        conference_id: ConferenceId,
        user_id: UserId,
        comment: impl Into<String>,
    ) -> Result<Feedback, FeedbackServiceError> {
        let feedback = Feedback::new(conference_id, user_id, comment, now_epoch_ms());
        feedback.validate().map_err(FeedbackServiceError::Validation)?;
        self.require_conference(conference_id)?;
        if !self.registrations.is_registered(conference_id, user_id)? {
            return Err(FeedbackServiceError::NotRegistered {
                conference_id,
                user_id,
            });
        }

        self.feedbacks
            .create_feedback(&feedback)
            .map_err(|err| match err {
                RepoError::Duplicate(_) => FeedbackServiceError::AlreadySubmitted {
                    conference_id,
                    user_id,
                },
                other => FeedbackServiceError::from(other),
            })?;

        info!(
            "event=feedback_create module=service status=ok feedback_id={} conference_id={}",
            feedback.id, conference_id
        );
        self.feedbacks
            .get_feedback(feedback.id)?
            .ok_or(FeedbackServiceError::InconsistentState(
                "created feedback not found in read-back",
            ))
    }

    pub fn list_feedbacks(
        &self,
        conference_id: ConferenceId,
        query: &PageQuery,
    ) -> Result<PageResult<Feedback>, FeedbackServiceError> {
        self.require_conference(conference_id)?;
        let request = self
            .limits
            .request(query, OrderBy::CreatedAt, SortDirection::Asc)?;
        Ok(page::<Feedback, _>(
            &self.feedbacks,
            &FeedbackFilter { conference_id },
            &request,
        )?)
    }

    pub fn delete_feedback(&self, id: FeedbackId) -> Result<(), FeedbackServiceError> {
        self.feedbacks.soft_delete_feedback(id)?;
        info!("event=feedback_delete module=service status=ok feedback_id={id}");
        Ok(())
    }

    fn require_conference(&self, conference_id: ConferenceId) -> Result<(), FeedbackServiceError> {
        match self.conferences.get_conference(conference_id)? {
            Some(_) => Ok(()),
            None => Err(FeedbackServiceError::ConferenceNotFound(conference_id)),
        }
    }
}
