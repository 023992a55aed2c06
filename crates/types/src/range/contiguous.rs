//! Closed intervals of `i64` values.

use super::{Range, RangeIter, SparseRange};
use crate::RangeError;
use sbor::prelude::*;
use std::cmp::Ordering;
use std::fmt;

/// The closed interval `[from, to]`.
///
/// A range with `from > to` is empty. Every empty range is normalised to
/// [`ContiguousRange::EMPTY`] on construction, so all empty ranges compare
/// equal regardless of the bounds they were built from.
///
/// Ordering is partial: two ranges can only be ordered when they are equal or
/// do not intersect. See [`ContiguousRange::try_cmp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BasicSbor)]
pub struct ContiguousRange {
    from: i64,
    to: i64,
}

impl ContiguousRange {
    /// The canonical empty range.
    pub const EMPTY: Self = Self { from: 0, to: -1 };

    /// Every representable value.
    pub const FULL: Self = Self {
        from: i64::MIN,
        to: i64::MAX,
    };

    /// Create `[from, to]`, or [`Self::EMPTY`] if `from > to`.
    pub const fn new(from: i64, to: i64) -> Self {
        if from > to {
            Self::EMPTY
        } else {
            Self { from, to }
        }
    }

    /// Create the range holding exactly `value`.
    pub const fn singleton(value: i64) -> Self {
        Self {
            from: value,
            to: value,
        }
    }

    /// Lowest value in the range.
    pub fn from(&self) -> i64 {
        self.from
    }

    /// Highest value in the range.
    pub fn to(&self) -> i64 {
        self.to
    }

    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }

    /// Number of values in the range, saturating at `u64::MAX`.
    pub fn size(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.to.abs_diff(self.from).saturating_add(1)
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.from <= value && value <= self.to
    }

    /// Check whether every value of `other` is also in this range.
    pub fn contains_range(&self, other: &ContiguousRange) -> bool {
        other.is_empty() || (self.from <= other.from && other.to <= self.to)
    }

    /// Check whether the two ranges share at least one value.
    ///
    /// An empty operand intersects everything.
    pub fn intersects(&self, other: &ContiguousRange) -> bool {
        if self.is_empty() || other.is_empty() {
            return true;
        }
        self.from <= other.to && other.from <= self.to
    }

    /// Check whether the two ranges touch with no gap between them.
    ///
    /// An empty operand is adjacent to everything.
    pub fn is_adjacent(&self, other: &ContiguousRange) -> bool {
        if self.is_empty() || other.is_empty() {
            return true;
        }
        other.to.checked_add(1) == Some(self.from) || self.to.checked_add(1) == Some(other.from)
    }

    /// Order two ranges that are either equal or disjoint.
    ///
    /// Disjoint ranges order by their lower bound. Overlapping ranges that are
    /// not equal have no meaningful order and yield
    /// [`RangeError::NotComparable`].
    pub fn try_cmp(&self, other: &ContiguousRange) -> Result<Ordering, RangeError> {
        if self == other {
            return Ok(Ordering::Equal);
        }
        if self.intersects(other) {
            return Err(RangeError::NotComparable {
                left: *self,
                right: *other,
            });
        }
        Ok(self.from.cmp(&other.from))
    }

    /// Return a range that also holds `value`.
    pub fn add(&self, value: i64) -> Range {
        if self.contains(value) {
            return Range::Contiguous(*self);
        }
        self.union(&Self::singleton(value))
    }

    /// Return a range without `value`, splitting in two if `value` is interior.
    pub fn remove(&self, value: i64) -> Range {
        if !self.contains(value) {
            return Range::Contiguous(*self);
        }

        if self.from == self.to {
            Range::EMPTY
        } else if value == self.from {
            Range::Contiguous(Self::new(value + 1, self.to))
        } else if value == self.to {
            Range::Contiguous(Self::new(self.from, value - 1))
        } else {
            Range::Sparse(SparseRange::from_canonical(vec![
                Self::new(self.from, value - 1),
                Self::new(value + 1, self.to),
            ]))
        }
    }

    /// Smallest range holding the values of both operands.
    pub fn union(&self, other: &ContiguousRange) -> Range {
        if self.is_empty() {
            return Range::Contiguous(*other);
        }
        if other.is_empty() {
            return Range::Contiguous(*self);
        }

        if self.intersects(other) || self.is_adjacent(other) {
            Range::Contiguous(self.span(other))
        } else if self.from < other.from {
            Range::Sparse(SparseRange::from_canonical(vec![*self, *other]))
        } else {
            Range::Sparse(SparseRange::from_canonical(vec![*other, *self]))
        }
    }

    /// Iterate the values from lowest to highest.
    pub fn iter(&self) -> RangeIter<'_> {
        RangeIter::new(std::slice::from_ref(self))
    }

    /// The range from the lower of both lower bounds to the higher of both
    /// upper bounds.
    pub(crate) fn span(&self, other: &ContiguousRange) -> ContiguousRange {
        Self {
            from: self.from.min(other.from),
            to: self.to.max(other.to),
        }
    }
}

impl PartialOrd for ContiguousRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.try_cmp(other).ok()
    }
}

impl<'a> IntoIterator for &'a ContiguousRange {
    type Item = i64;
    type IntoIter = RangeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ContiguousRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "[]")
        } else {
            write!(f, "[{}..{}]", self.from, self.to)
        }
    }
}
