//! Double-booking prevention.
//!
//! # Responsibility
//! - Detect interval overlaps within a scope (venue or attendee).
//! - Turn detected overlaps into accept/reject decisions for write paths.
//!
//! # Invariants
//! - Overlap is the single half-open predicate of [`crate::model::interval::Interval::overlaps`].
//! - Only approved conferences occupy the venue; every registration blocks its attendee.

pub mod conflict;
pub mod policy;

pub use conflict::{find_conflicts, ConflictScope, OverlapSource, ScheduledEntity};
pub use policy::{ConferenceProposal, PolicyError, SchedulingConflict, SchedulingPolicy};
