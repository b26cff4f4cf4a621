//! Keyset pagination engine.
//!
//! # Responsibility
//! - Turn a page request into one bounded keyset window for a row source.
//! - Trim the look-ahead row, restore display order and emit boundary cursors.
//!
//! # Invariants
//! - Exactly one row-source call per page; `limit + 1` rows detect `has_more`.
//! - The look-ahead row is dropped from the end farthest from the boundary,
//!   before backward pages are reversed into display order.
//! - Empty pages carry no cursors and `has_more = false`.

use super::cursor::{Boundary, Cursor, CursorDirection, OrderBy, OrderingKey, SortDirection};
use super::PageError;
use crate::repo::RepoResult;
use log::debug;
use serde::Serialize;

/// Entity that can be positioned in a keyset ordering.
pub trait Keyed {
    /// Returns whether this entity family can be listed in `order_by`.
    fn supports(order_by: OrderBy) -> bool;
    /// Composite key of this item under `order_by`.
    fn ordering_key(&self, order_by: OrderBy) -> OrderingKey;
}

/// Ordered-row capability consumed by the engine.
///
/// Implementations must AND the window boundary with `filter` and their own
/// base conditions, order by `(primary, tie_break)` in `window.fetch_direction`,
/// and return at most `window.fetch_limit` rows.
pub trait RowSource<T> {
    type Filter;

    fn query_page(&self, filter: &Self::Filter, window: &KeysetWindow) -> RepoResult<Vec<T>>;
}

/// Fully resolved page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub order_by: OrderBy,
    pub direction: SortDirection,
    pub after_cursor: Option<String>,
    pub before_cursor: Option<String>,
    pub limit: u32,
}

impl PageRequest {
    /// Request for the first page in display order.
    pub fn first(order_by: OrderBy, direction: SortDirection, limit: u32) -> Self {
        Self {
            order_by,
            direction,
            after_cursor: None,
            before_cursor: None,
            limit,
        }
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after_cursor = Some(cursor.into());
        self
    }

    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before_cursor = Some(cursor.into());
        self
    }
}

/// Caller-facing page parameters before limit normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub after: Option<String>,
    pub before: Option<String>,
    /// `None` selects the configured default.
    pub limit: Option<u32>,
}

/// Default and maximum page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 50,
        }
    }
}

impl PageLimits {
    /// Resolves the effective limit: default when absent, clamped to max.
    ///
    /// An explicit zero is rejected rather than replaced.
    pub fn resolve(&self, limit: Option<u32>) -> Result<u32, PageError> {
        match limit {
            None => Ok(self.default_limit),
            Some(0) => Err(PageError::InvalidPageSize),
            Some(value) => Ok(value.min(self.max_limit)),
        }
    }

    /// Builds a [`PageRequest`] from caller parameters.
    pub fn request(
        &self,
        query: &PageQuery,
        order_by: OrderBy,
        direction: SortDirection,
    ) -> Result<PageRequest, PageError> {
        Ok(PageRequest {
            order_by,
            direction,
            after_cursor: query.after.clone(),
            before_cursor: query.before.clone(),
            limit: self.resolve(query.limit)?,
        })
    }
}

/// One bounded ordered fetch handed to a row source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeysetWindow {
    pub order_by: OrderBy,
    /// Order rows are fetched in; the reverse of display order for backward pages.
    pub fetch_direction: SortDirection,
    pub boundary: Option<Boundary>,
    /// Page size plus one look-ahead row.
    pub fetch_limit: u32,
}

impl KeysetWindow {
    /// Applies the window to in-memory items: boundary, fetch order, limit.
    pub fn select<T: Keyed + Clone>(&self, items: &[T]) -> Vec<T> {
        let mut selected: Vec<(OrderingKey, T)> = items
            .iter()
            .map(|item| (item.ordering_key(self.order_by), item))
            .filter(|(key, _)| self.boundary.map_or(true, |boundary| boundary.admits(key)))
            .map(|(key, item)| (key, item.clone()))
            .collect();
        selected.sort_by(|(a, _), (b, _)| match self.fetch_direction {
            SortDirection::Asc => a.cmp(b),
            SortDirection::Desc => b.cmp(a),
        });
        selected
            .into_iter()
            .take(self.fetch_limit as usize)
            .map(|(_, item)| item)
            .collect()
    }
}

/// One page of items in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    /// More rows exist past this page in the traversal direction.
    pub has_more: bool,
    /// `before` cursor for the first item.
    pub first_cursor: Option<String>,
    /// `after` cursor for the last item.
    pub last_cursor: Option<String>,
}

impl<T> PageResult<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_more: false,
            first_cursor: None,
            last_cursor: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Traversal {
    Forward,
    Backward,
}

impl Traversal {
    fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }
}

/// Validates `request` and derives the keyset window plus traversal it needs.
fn plan<T: Keyed>(request: &PageRequest) -> Result<(KeysetWindow, Traversal), PageError> {
    if request.limit == 0 {
        return Err(PageError::InvalidPageSize);
    }
    if request.after_cursor.is_some() && request.before_cursor.is_some() {
        return Err(PageError::ConflictingCursorArguments);
    }
    if !T::supports(request.order_by) {
        return Err(PageError::UnsupportedOrdering(request.order_by));
    }

    let (traversal, boundary) = match (&request.after_cursor, &request.before_cursor) {
        (Some(token), None) => {
            let cursor = Cursor::decode_for(token, request.order_by, CursorDirection::After)?;
            let boundary =
                Boundary::for_traversal(cursor.key, CursorDirection::After, request.direction);
            (Traversal::Forward, Some(boundary))
        }
        (None, Some(token)) => {
            let cursor = Cursor::decode_for(token, request.order_by, CursorDirection::Before)?;
            let boundary =
                Boundary::for_traversal(cursor.key, CursorDirection::Before, request.direction);
            (Traversal::Backward, Some(boundary))
        }
        _ => (Traversal::Forward, None),
    };

    let fetch_direction = match traversal {
        Traversal::Forward => request.direction,
        Traversal::Backward => request.direction.reversed(),
    };

    Ok((
        KeysetWindow {
            order_by: request.order_by,
            fetch_direction,
            boundary,
            fetch_limit: request.limit.saturating_add(1),
        },
        traversal,
    ))
}

/// Fetches one page from `source`.
///
/// # Errors
/// - `InvalidPageSize` when `limit == 0`.
/// - `ConflictingCursorArguments` when both cursors are set.
/// - `MalformedCursor` when a cursor cannot be decoded or was issued for
///   another ordering or slot.
/// - `RowSource` when the source query fails; never retried here.
pub fn page<T, S>(
    source: &S,
    filter: &S::Filter,
    request: &PageRequest,
) -> Result<PageResult<T>, PageError>
where
    T: Keyed,
    S: RowSource<T> + ?Sized,
{
    let (window, traversal) = plan::<T>(request)?;
    let rows = source.query_page(filter, &window)?;
    let result = assemble(rows, request, traversal);

    debug!(
        "event=page module=pagination status=ok order_by={} direction={} traversal={} limit={} returned={} has_more={}",
        request.order_by.as_str(),
        request.direction.as_sql(),
        traversal.as_str(),
        request.limit,
        result.items.len(),
        result.has_more
    );

    Ok(result)
}

fn assemble<T: Keyed>(
    mut rows: Vec<T>,
    request: &PageRequest,
    traversal: Traversal,
) -> PageResult<T> {
    let limit = request.limit as usize;
    let has_more = rows.len() > limit;
    // Rows are in fetch order, so the look-ahead row is always the tail.
    rows.truncate(limit);
    if traversal == Traversal::Backward {
        rows.reverse();
    }

    if rows.is_empty() {
        return PageResult::empty();
    }

    let first_cursor = rows.first().map(|item| {
        Cursor::new(
            request.order_by,
            CursorDirection::Before,
            item.ordering_key(request.order_by),
        )
        .encode()
    });
    let last_cursor = rows.last().map(|item| {
        Cursor::new(
            request.order_by,
            CursorDirection::After,
            item.ordering_key(request.order_by),
        )
        .encode()
    });

    PageResult {
        items: rows,
        has_more,
        first_cursor,
        last_cursor,
    }
}

impl<T: Keyed + Clone> RowSource<T> for [T] {
    type Filter = ();

    fn query_page(&self, _filter: &(), window: &KeysetWindow) -> RepoResult<Vec<T>> {
        Ok(window.select(self))
    }
}

impl<T: Keyed + Clone> RowSource<T> for Vec<T> {
    type Filter = ();

    fn query_page(&self, _filter: &(), window: &KeysetWindow) -> RepoResult<Vec<T>> {
        Ok(window.select(self))
    }
}
