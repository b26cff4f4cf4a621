//! Core of the auditorium reservation backend.
//!
//! Owns the scheduling invariants (no overlapping approved conferences, no
//! double-booked attendees) and the keyset pagination shared by every listing.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod pagination;
pub mod repo;
pub mod schedule;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, open_target, DbError, DbTarget};
pub use logging::{default_log_level, init_from_settings, init_logging, logging_status};
pub use model::conference::{
    Conference, ConferenceDraft, ConferenceId, ConferencePatch, ConferenceStatus,
};
pub use model::feedback::{Feedback, FeedbackId};
pub use model::interval::Interval;
pub use model::registration::{RegisteredUser, Registration};
pub use model::user::{User, UserId, UserRole};
pub use model::ValidationError;
pub use pagination::{
    page, Cursor, OrderBy, PageError, PageLimits, PageQuery, PageRequest, PageResult,
    SortDirection,
};
pub use repo::conference_repo::{
    ConferenceFilter, ConferenceRepository, SqliteConferenceRepository,
};
pub use repo::feedback_repo::{FeedbackRepository, SqliteFeedbackRepository};
pub use repo::registration_repo::{RegistrationRepository, SqliteRegistrationRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use schedule::{find_conflicts, ConflictScope, SchedulingConflict, SchedulingPolicy};
pub use service::conference_service::{
    ConferenceListQuery, ConferenceService, ConferenceServiceError,
};
pub use service::feedback_service::{FeedbackService, FeedbackServiceError};
pub use service::registration_service::{RegistrationService, RegistrationServiceError};
pub use service::user_service::{UserPatch, UserService, UserServiceError};
pub use service::ErrorClass;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
