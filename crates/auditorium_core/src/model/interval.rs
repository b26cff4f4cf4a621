//! Half-open time interval value type.
//!
//! # Invariants
//! - `start < end` for every constructed value.
//! - Intervals include `start` and exclude `end`, so touching ranges do not overlap.

use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Time range `[start, end)` in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct Interval {
    start: i64,
    end: i64,
}

#[derive(Deserialize)]
struct RawInterval {
    start: i64,
    end: i64,
}

impl TryFrom<RawInterval> for Interval {
    type Error = ValidationError;

    fn try_from(value: RawInterval) -> Result<Self, Self::Error> {
        Self::new(value.start, value.end)
    }
}

impl Interval {
    /// Creates an interval, rejecting empty or inverted ranges.
    pub fn new(start: i64, end: i64) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Inclusive start in epoch milliseconds.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Exclusive end in epoch milliseconds.
    pub fn end(&self) -> i64 {
        self.end
    }

    /// Returns whether both intervals share any instant.
    ///
    /// Subsumes the "point inside", "interval inside" and "interval covers"
    /// cases with one comparison pair.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns whether `instant` falls in `[start, end)`.
    pub fn contains_point(&self, instant: i64) -> bool {
        self.start <= instant && instant < self.end
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::Interval;
    use crate::model::ValidationError;

    fn iv(start: i64, end: i64) -> Interval {
        Interval::new(start, end).expect("valid interval")
    }

    #[test]
    fn new_rejects_empty_and_inverted_ranges() {
        assert_eq!(
            Interval::new(5, 5).unwrap_err(),
            ValidationError::InvalidInterval { start: 5, end: 5 }
        );
        assert!(Interval::new(9, 3).is_err());
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        assert!(!iv(10, 20).overlaps(&iv(20, 30)));
        assert!(!iv(20, 30).overlaps(&iv(10, 20)));
    }

    #[test]
    fn containment_and_partial_overlap_both_count() {
        assert!(iv(10, 40).overlaps(&iv(20, 30)));
        assert!(iv(20, 30).overlaps(&iv(10, 40)));
        assert!(iv(10, 30).overlaps(&iv(29, 50)));
    }

    #[test]
    fn contains_point_is_half_open() {
        let range = iv(100, 200);
        assert!(range.contains_point(100));
        assert!(range.contains_point(199));
        assert!(!range.contains_point(200));
    }

    #[test]
    fn deserialize_enforces_invariant() {
        let err = serde_json::from_str::<Interval>(r#"{"start":50,"end":10}"#);
        assert!(err.is_err());
        let ok: Interval = serde_json::from_str(r#"{"start":10,"end":50}"#).unwrap();
        assert_eq!(ok, iv(10, 50));
    }
}
