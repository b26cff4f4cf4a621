//! Opaque cursor codec and keyset boundary comparison.
//!
//! # Responsibility
//! - Map an ordering key plus traversal direction to an opaque URL-safe token and back.
//! - Define the composite `(primary, tie_break)` comparison shared by every row source.
//!
//! # Invariants
//! - `decode(encode(c)) == c` for every cursor.
//! - The identifier portion is parsed as a UUID, never passed through unchecked.
//! - Comparison is lexicographic on `(primary, tie_break)`; primaries alone are never used.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Sort key a paginated listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    /// Temporal order on the scheduled start.
    StartsAt,
    /// Insertion order on the creation timestamp.
    CreatedAt,
}

impl OrderBy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartsAt => "starts_at",
            Self::CreatedAt => "created_at",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "starts_at" => Some(Self::StartsAt),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

/// Display order requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// SQL keyword for this direction. Never derived from caller text.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Total order key: primary timestamp plus unique identifier tie-break.
///
/// Field order matters: the derived `Ord` is the lexicographic composite order.
/// `Uuid` orders bytewise, which matches the ordering of its lowercase
/// hyphenated text form stored in SQLite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderingKey {
    pub primary: i64,
    pub tie_break: Uuid,
}

impl OrderingKey {
    pub fn new(primary: i64, tie_break: Uuid) -> Self {
        Self { primary, tie_break }
    }
}

/// Which side of the boundary item the next page lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorDirection {
    After,
    Before,
}

impl CursorDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::After => "after",
            Self::Before => "before",
        }
    }
}

/// Decoded position marker.
///
/// Cursors are pure positions: the referenced row may have been deleted since
/// the cursor was issued and the cursor stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub order_by: OrderBy,
    pub direction: CursorDirection,
    pub key: OrderingKey,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CursorPayload {
    #[serde(rename = "o")]
    order_by: OrderBy,
    #[serde(rename = "d")]
    direction: CursorDirection,
    #[serde(rename = "p")]
    primary: i64,
    #[serde(rename = "i")]
    id: String,
}

/// Reasons a cursor token cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    /// Token is not base64url text.
    InvalidEncoding,
    /// Decoded bytes are not a cursor payload.
    InvalidPayload(String),
    /// Identifier portion is not a UUID.
    InvalidIdentifier(String),
    /// Cursor was issued for another ordering.
    OrderingMismatch { expected: OrderBy, actual: OrderBy },
    /// Cursor was issued for the opposite traversal slot.
    DirectionMismatch {
        expected: CursorDirection,
        actual: CursorDirection,
    },
}

impl Display for CursorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEncoding => write!(f, "cursor is not valid base64url"),
            Self::InvalidPayload(message) => write!(f, "cursor payload is invalid: {message}"),
            Self::InvalidIdentifier(value) => {
                write!(f, "cursor identifier `{value}` is not a valid id")
            }
            Self::OrderingMismatch { expected, actual } => write!(
                f,
                "cursor was issued for ordering `{}`, request uses `{}`",
                actual.as_str(),
                expected.as_str()
            ),
            Self::DirectionMismatch { expected, actual } => write!(
                f,
                "cursor was issued as `{}` cursor, supplied as `{}`",
                actual.as_str(),
                expected.as_str()
            ),
        }
    }
}

impl Error for CursorError {}

impl Cursor {
    pub fn new(order_by: OrderBy, direction: CursorDirection, key: OrderingKey) -> Self {
        Self {
            order_by,
            direction,
            key,
        }
    }

    /// Encodes the cursor as an opaque base64url token.
    pub fn encode(&self) -> String {
        let payload = CursorPayload {
            order_by: self.order_by,
            direction: self.direction,
            primary: self.key.primary,
            id: self.key.tie_break.to_string(),
        };
        // Serializing a struct of enums, integers and strings cannot fail.
        let bytes = serde_json::to_vec(&payload).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Decodes an opaque token produced by [`Cursor::encode`].
    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| CursorError::InvalidEncoding)?;
        let payload: CursorPayload = serde_json::from_slice(&bytes)
            .map_err(|err| CursorError::InvalidPayload(err.to_string()))?;
        let tie_break = Uuid::parse_str(&payload.id)
            .map_err(|_| CursorError::InvalidIdentifier(payload.id.clone()))?;

        Ok(Self {
            order_by: payload.order_by,
            direction: payload.direction,
            key: OrderingKey::new(payload.primary, tie_break),
        })
    }

    /// Decodes and checks the token against the slot and ordering it is used with.
    pub fn decode_for(
        token: &str,
        order_by: OrderBy,
        direction: CursorDirection,
    ) -> Result<Self, CursorError> {
        let cursor = Self::decode(token)?;
        if cursor.order_by != order_by {
            return Err(CursorError::OrderingMismatch {
                expected: order_by,
                actual: cursor.order_by,
            });
        }
        if cursor.direction != direction {
            return Err(CursorError::DirectionMismatch {
                expected: direction,
                actual: cursor.direction,
            });
        }
        Ok(cursor)
    }
}

/// Strict comparison an item key must satisfy against the boundary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyComparison {
    Greater,
    Less,
}

impl KeyComparison {
    /// SQL operator for a row-value comparison.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::Less => "<",
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Greater => ordering == Ordering::Greater,
            Self::Less => ordering == Ordering::Less,
        }
    }
}

/// Keyset predicate derived from a cursor: `item_key <op> key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub key: OrderingKey,
    pub comparison: KeyComparison,
}

impl Boundary {
    /// Builds the predicate for traversing from `key` in `direction` under `sort`.
    ///
    /// Ascending: `after` selects larger keys, `before` smaller ones.
    /// Descending inverts both.
    pub fn for_traversal(
        key: OrderingKey,
        direction: CursorDirection,
        sort: SortDirection,
    ) -> Self {
        let comparison = match (direction, sort) {
            (CursorDirection::After, SortDirection::Asc) => KeyComparison::Greater,
            (CursorDirection::After, SortDirection::Desc) => KeyComparison::Less,
            (CursorDirection::Before, SortDirection::Asc) => KeyComparison::Less,
            (CursorDirection::Before, SortDirection::Desc) => KeyComparison::Greater,
        };
        Self { key, comparison }
    }

    /// Returns whether an item with `item_key` lies past this boundary.
    pub fn admits(&self, item_key: &OrderingKey) -> bool {
        self.comparison.holds(item_key.cmp(&self.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(primary: i64, id: u128) -> OrderingKey {
        OrderingKey::new(primary, Uuid::from_u128(id))
    }

    #[test]
    fn ordering_and_direction_parse_their_wire_names() {
        assert_eq!(OrderBy::parse("created_at"), Some(OrderBy::CreatedAt));
        assert_eq!(OrderBy::parse(OrderBy::StartsAt.as_str()), Some(OrderBy::StartsAt));
        assert_eq!(OrderBy::parse("title"), None);
        assert_eq!(SortDirection::parse(" DESC "), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse("sideways"), None);
    }

    #[test]
    fn encode_decode_round_trip() {
        let cursor = Cursor::new(OrderBy::StartsAt, CursorDirection::Before, key(1_700, 42));
        let token = cursor.encode();
        assert!(!token.contains('='));
        assert_eq!(Cursor::decode(&token).unwrap(), cursor);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(
            Cursor::decode("not base64 !!").unwrap_err(),
            CursorError::InvalidEncoding
        );
        let not_json = URL_SAFE_NO_PAD.encode(b"hello");
        assert!(matches!(
            Cursor::decode(&not_json).unwrap_err(),
            CursorError::InvalidPayload(_)
        ));
    }

    #[test]
    fn decode_validates_identifier() {
        let raw =
            URL_SAFE_NO_PAD.encode(br#"{"o":"starts_at","d":"after","p":1,"i":"1' OR 1=1"}"#);
        assert_eq!(
            Cursor::decode(&raw).unwrap_err(),
            CursorError::InvalidIdentifier("1' OR 1=1".to_string())
        );
    }

    #[test]
    fn decode_for_checks_slot_and_ordering() {
        let token = Cursor::new(OrderBy::CreatedAt, CursorDirection::After, key(5, 1)).encode();
        assert!(Cursor::decode_for(&token, OrderBy::CreatedAt, CursorDirection::After).is_ok());
        assert!(matches!(
            Cursor::decode_for(&token, OrderBy::StartsAt, CursorDirection::After),
            Err(CursorError::OrderingMismatch { .. })
        ));
        assert!(matches!(
            Cursor::decode_for(&token, OrderBy::CreatedAt, CursorDirection::Before),
            Err(CursorError::DirectionMismatch { .. })
        ));
    }

    #[test]
    fn boundary_uses_tie_break_when_primaries_collide() {
        let boundary =
            Boundary::for_traversal(key(10, 5), CursorDirection::After, SortDirection::Asc);
        assert!(boundary.admits(&key(10, 6)));
        assert!(!boundary.admits(&key(10, 5)));
        assert!(!boundary.admits(&key(10, 4)));
        assert!(boundary.admits(&key(11, 0)));
    }

    #[test]
    fn descending_inverts_comparisons() {
        let after =
            Boundary::for_traversal(key(10, 5), CursorDirection::After, SortDirection::Desc);
        assert_eq!(after.comparison, KeyComparison::Less);
        assert!(after.admits(&key(10, 4)));

        let before =
            Boundary::for_traversal(key(10, 5), CursorDirection::Before, SortDirection::Desc);
        assert_eq!(before.comparison, KeyComparison::Greater);
        assert!(before.admits(&key(12, 0)));
    }
}
