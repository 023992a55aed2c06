//! Immutable sets of `i64` values.
//!
//! A [`Range`] is one of three shapes:
//!
//! - [`Range::Contiguous`] - a single closed interval, possibly empty
//! - [`Range::Sparse`] - two or more disjoint, non-adjacent intervals
//! - [`Range::Infinite`] - every `i64` value
//!
//! All operations return a new range and leave the receiver untouched.
//! Finite results are always canonical: a set that is one block is
//! contiguous and a set with gaps is sparse, so among finite ranges
//! structural equality is set equality.
//!
//! [`Range::Infinite`] is only ever produced from [`Range::INFINITE`]. The
//! interval `[i64::MIN, i64::MAX]` holds the same values but stays a
//! contiguous range: it can be iterated and have values removed, which the
//! infinite range cannot, so the two compare unequal.
//!
//! # Conventions
//!
//! An empty or infinite operand intersects and is adjacent to everything.
//! Union relies on this at its boundaries, so it is kept even where it looks
//! surprising.

mod contiguous;
mod iter;
mod sparse;

pub use contiguous::ContiguousRange;
pub use iter::RangeIter;
pub use sparse::SparseRange;

use crate::RangeError;
use sbor::prelude::*;
use std::fmt;

/// An immutable, ordered set of `i64` values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, BasicSbor)]
pub enum Range {
    Contiguous(ContiguousRange),
    Sparse(SparseRange),
    Infinite,
}

impl Range {
    /// The range with no values.
    pub const EMPTY: Range = Range::Contiguous(ContiguousRange::EMPTY);

    /// The range with every value.
    pub const INFINITE: Range = Range::Infinite;

    /// Create `[from, to]`, empty if `from > to`.
    pub const fn new(from: i64, to: i64) -> Range {
        Range::Contiguous(ContiguousRange::new(from, to))
    }

    /// Create the range holding exactly `value`.
    pub const fn singleton(value: i64) -> Range {
        Range::Contiguous(ContiguousRange::singleton(value))
    }

    /// Fold canonical sub-ranges into the matching shape.
    pub(crate) fn from_canonical(mut ranges: Vec<ContiguousRange>) -> Range {
        match ranges.len() {
            0 => Range::EMPTY,
            1 => Range::Contiguous(ranges.remove(0)),
            _ => Range::Sparse(SparseRange::from_canonical(ranges)),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Range::Contiguous(range) => range.is_empty(),
            Range::Sparse(_) | Range::Infinite => false,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Range::Infinite)
    }

    /// Number of values, saturating at `u64::MAX`.
    pub fn size(&self) -> u64 {
        match self {
            Range::Contiguous(range) => range.size(),
            Range::Sparse(range) => range.size(),
            Range::Infinite => u64::MAX,
        }
    }

    /// Lowest value in the range.
    pub fn from(&self) -> i64 {
        match self {
            Range::Contiguous(range) => range.from(),
            Range::Sparse(range) => range.from(),
            Range::Infinite => i64::MIN,
        }
    }

    /// Highest value in the range.
    pub fn to(&self) -> i64 {
        match self {
            Range::Contiguous(range) => range.to(),
            Range::Sparse(range) => range.to(),
            Range::Infinite => i64::MAX,
        }
    }

    /// The disjoint intervals making up the range, lowest first.
    ///
    /// Empty for the empty range; a single full interval for the infinite one.
    pub fn sub_ranges(&self) -> &[ContiguousRange] {
        match self {
            Range::Contiguous(range) if range.is_empty() => &[],
            Range::Contiguous(range) => std::slice::from_ref(range),
            Range::Sparse(range) => range.sub_ranges(),
            Range::Infinite => std::slice::from_ref(&ContiguousRange::FULL),
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        match self {
            Range::Contiguous(range) => range.contains(value),
            Range::Sparse(range) => range.contains(value),
            Range::Infinite => true,
        }
    }

    /// Check whether every value of `other` is also in this range.
    pub fn contains_range(&self, other: &Range) -> bool {
        if other.is_empty() || self.is_infinite() {
            return true;
        }
        let ranges = self.sub_ranges();
        other.sub_ranges().iter().all(|needle| {
            let index = ranges.partition_point(|range| range.to() < needle.from());
            ranges
                .get(index)
                .is_some_and(|range| range.contains_range(needle))
        })
    }

    /// Return a range that also holds `value`.
    ///
    /// Returns an equal range when `value` is already present.
    pub fn add(&self, value: i64) -> Range {
        match self {
            Range::Contiguous(range) => range.add(value),
            Range::Sparse(range) => range.add(value),
            Range::Infinite => Range::Infinite,
        }
    }

    /// Return a range without `value`.
    ///
    /// The infinite range cannot have a hole punched in it and yields
    /// [`RangeError::Unsupported`].
    pub fn remove(&self, value: i64) -> Result<Range, RangeError> {
        match self {
            Range::Contiguous(range) => Ok(range.remove(value)),
            Range::Sparse(range) => Ok(range.remove(value)),
            Range::Infinite => Err(RangeError::Unsupported(
                "cannot remove a value from the infinite range",
            )),
        }
    }

    /// Smallest range holding the values of both operands.
    pub fn union(&self, other: &Range) -> Range {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }

        match (self, other) {
            (Range::Infinite, _) | (_, Range::Infinite) => Range::Infinite,
            (Range::Contiguous(left), Range::Contiguous(right)) => left.union(right),
            _ => Self::merge(self.sub_ranges(), other.sub_ranges()),
        }
    }

    /// Check whether the ranges share at least one value.
    pub fn intersects(&self, other: &Range) -> bool {
        if self.is_empty() || other.is_empty() || self.is_infinite() || other.is_infinite() {
            return true;
        }

        let (left, right) = (self.sub_ranges(), other.sub_ranges());
        let (mut i, mut j) = (0, 0);
        while i < left.len() && j < right.len() {
            if left[i].intersects(&right[j]) {
                return true;
            }
            if left[i].to() < right[j].to() {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    /// Check whether the ranges touch end to end with no gap between them.
    pub fn is_adjacent(&self, other: &Range) -> bool {
        if self.is_empty() || other.is_empty() || self.is_infinite() || other.is_infinite() {
            return true;
        }
        other.to().checked_add(1) == Some(self.from())
            || self.to().checked_add(1) == Some(other.from())
    }

    /// Iterate the values from lowest to highest.
    ///
    /// The infinite range cannot be enumerated and yields
    /// [`RangeError::Unsupported`].
    pub fn iter(&self) -> Result<RangeIter<'_>, RangeError> {
        if self.is_infinite() {
            return Err(RangeError::Unsupported(
                "cannot iterate the infinite range",
            ));
        }
        Ok(RangeIter::new(self.sub_ranges()))
    }

    /// Merge two sorted lists of disjoint intervals in a single sweep,
    /// coalescing runs that intersect or touch.
    fn merge(left: &[ContiguousRange], right: &[ContiguousRange]) -> Range {
        let mut merged: Vec<ContiguousRange> = Vec::with_capacity(left.len() + right.len());
        let mut current: Option<ContiguousRange> = None;
        let (mut left, mut right) = (left.iter().peekable(), right.iter().peekable());

        loop {
            let next = match (left.peek(), right.peek()) {
                (Some(l), Some(r)) if l.from() <= r.from() => left.next(),
                (Some(_), Some(_)) => right.next(),
                (Some(_), None) => left.next(),
                (None, Some(_)) => right.next(),
                (None, None) => break,
            };
            let Some(&next) = next else { break };
            if next.is_empty() {
                continue;
            }

            current = Some(match current {
                Some(acc) if acc.intersects(&next) || acc.is_adjacent(&next) => acc.span(&next),
                Some(acc) => {
                    merged.push(acc);
                    next
                }
                None => next,
            });
        }

        merged.extend(current);
        Self::from_canonical(merged)
    }
}

impl Default for Range {
    fn default() -> Self {
        Range::EMPTY
    }
}

impl From<ContiguousRange> for Range {
    fn from(range: ContiguousRange) -> Self {
        Range::Contiguous(range)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Range::Contiguous(range) => fmt::Display::fmt(range, f),
            Range::Sparse(range) => fmt::Display::fmt(range, f),
            Range::Infinite => write!(f, "[-inf..+inf]"),
        }
    }
}
