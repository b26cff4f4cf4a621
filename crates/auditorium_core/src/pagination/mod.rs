//! Bidirectional keyset pagination shared by every listing.
//!
//! # Responsibility
//! - Encode/decode opaque cursors over `(primary, tie_break)` ordering keys.
//! - Drive one bounded fetch per page against any [`RowSource`].
//!
//! # Invariants
//! - Cursor boundaries reach row sources as typed values and are bound as SQL
//!   parameters, never spliced into query text.
//! - The engine keeps no state between calls.

use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod cursor;
pub mod engine;

pub use cursor::{
    Boundary, Cursor, CursorDirection, CursorError, KeyComparison, OrderBy, OrderingKey,
    SortDirection,
};
pub use engine::{
    page, KeysetWindow, Keyed, PageLimits, PageQuery, PageRequest, PageResult, RowSource,
};

/// Pagination failure taxonomy.
#[derive(Debug)]
pub enum PageError {
    /// `limit` must be at least one.
    InvalidPageSize,
    /// `after` and `before` cursors were both supplied.
    ConflictingCursorArguments,
    /// Cursor token is undecodable or issued for another ordering/slot.
    MalformedCursor(CursorError),
    /// Entity family cannot be listed in the requested ordering.
    UnsupportedOrdering(OrderBy),
    /// Row source failed; relayed unchanged.
    RowSource(RepoError),
}

impl Display for PageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPageSize => write!(f, "page size must be greater than zero"),
            Self::ConflictingCursorArguments => {
                write!(f, "`after` and `before` cursors are mutually exclusive")
            }
            Self::MalformedCursor(err) => write!(f, "malformed cursor: {err}"),
            Self::UnsupportedOrdering(order_by) => {
                write!(f, "ordering `{}` is not supported here", order_by.as_str())
            }
            Self::RowSource(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MalformedCursor(err) => Some(err),
            Self::RowSource(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CursorError> for PageError {
    fn from(value: CursorError) -> Self {
        Self::MalformedCursor(value)
    }
}

impl From<RepoError> for PageError {
    fn from(value: RepoError) -> Self {
        Self::RowSource(value)
    }
}
