//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls, scheduling policy and pagination into
//!   use-case level APIs.
//! - Classify every failure so an outer transport can map it to a status.
//!
//! # Invariants
//! - Services receive configuration at construction and hold no global state.
//! - Check-then-act writes run inside the repository's [`WriteSerializer`].
//!
//! [`WriteSerializer`]: crate::repo::WriteSerializer

use crate::pagination::PageError;
use crate::repo::RepoError;
use serde::Serialize;

pub mod conference_service;
pub mod feedback_service;
pub mod registration_service;
pub mod user_service;

/// Coarse failure class of a service error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Caller input is unacceptable as sent.
    Client,
    NotFound,
    /// Request is valid but collides with current state.
    Conflict,
    Server,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Server => "server",
        }
    }
}

pub(crate) fn repo_error_class(err: &RepoError) -> ErrorClass {
    match err {
        RepoError::Validation(_) => ErrorClass::Client,
        RepoError::NotFound { .. } | RepoError::MissingReference(_) => ErrorClass::NotFound,
        RepoError::Duplicate(_) => ErrorClass::Conflict,
        RepoError::Db(_)
        | RepoError::UninitializedConnection { .. }
        | RepoError::InvalidData(_) => ErrorClass::Server,
    }
}

pub(crate) fn page_error_class(err: &PageError) -> ErrorClass {
    match err {
        PageError::RowSource(_) => ErrorClass::Server,
        PageError::InvalidPageSize
        | PageError::ConflictingCursorArguments
        | PageError::MalformedCursor(_)
        | PageError::UnsupportedOrdering(_) => ErrorClass::Client,
    }
}
