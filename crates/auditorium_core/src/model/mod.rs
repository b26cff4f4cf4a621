//! Reservation domain model.
//!
//! # Responsibility
//! - Define the records shared by repositories, services and the scheduling core.
//! - Own field-level validation that must hold before any persistence.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID that is never reused.
//! - Timestamps are Unix epoch milliseconds.
//! - Deletion is a soft-delete tombstone at storage level, never a hard delete.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod conference;
pub mod feedback;
pub mod interval;
pub mod registration;
pub mod user;

/// Field-level validation failure for domain records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty after trim.
    BlankField(&'static str),
    /// Conference capacity must be at least one seat.
    ZeroSeats,
    /// Interval start is not strictly before its end.
    InvalidInterval { start: i64, end: i64 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "`{field}` must not be blank"),
            Self::ZeroSeats => write!(f, "seats must be greater than zero"),
            Self::InvalidInterval { start, end } => write!(
                f,
                "interval start ({start}) must be strictly before its end ({end})"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Returns current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}
