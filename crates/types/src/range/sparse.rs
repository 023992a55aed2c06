//! Ranges made of several disjoint intervals.

use super::{ContiguousRange, Range, RangeIter};
use sbor::prelude::*;
use std::fmt;

/// A set of values that is not a single contiguous block.
///
/// Holds at least two non-empty sub-ranges, sorted by lower bound, that
/// neither intersect nor touch. Operations that would leave a single
/// sub-range fold back into [`Range::Contiguous`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, BasicSbor)]
pub struct SparseRange {
    ranges: Vec<ContiguousRange>,
}

impl SparseRange {
    /// Wrap sub-ranges that are already sorted, disjoint and non-adjacent.
    pub(crate) fn from_canonical(ranges: Vec<ContiguousRange>) -> Self {
        debug_assert!(ranges.len() >= 2, "sparse range needs two sub-ranges");
        debug_assert!(
            ranges.windows(2).all(|pair| pair[0]
                .to()
                .checked_add(1)
                .is_some_and(|gap_start| gap_start < pair[1].from())),
            "sub-ranges must be sorted with gaps between them"
        );
        Self { ranges }
    }

    /// The disjoint sub-ranges, lowest first.
    pub fn sub_ranges(&self) -> &[ContiguousRange] {
        &self.ranges
    }

    pub fn from(&self) -> i64 {
        self.ranges
            .first()
            .map_or(ContiguousRange::EMPTY.from(), |range| range.from())
    }

    pub fn to(&self) -> i64 {
        self.ranges
            .last()
            .map_or(ContiguousRange::EMPTY.to(), |range| range.to())
    }

    /// Total number of values across all sub-ranges, saturating at `u64::MAX`.
    pub fn size(&self) -> u64 {
        self.ranges
            .iter()
            .fold(0u64, |total, range| total.saturating_add(range.size()))
    }

    pub fn contains(&self, value: i64) -> bool {
        self.position_of(value).is_some()
    }

    /// Return a range that also holds `value`.
    pub fn add(&self, value: i64) -> Range {
        if self.contains(value) {
            return Range::Sparse(self.clone());
        }
        Range::merge(&self.ranges, &[ContiguousRange::singleton(value)])
    }

    /// Return a range without `value`.
    pub fn remove(&self, value: i64) -> Range {
        let Some(index) = self.position_of(value) else {
            return Range::Sparse(self.clone());
        };

        let mut ranges = Vec::with_capacity(self.ranges.len() + 1);
        ranges.extend_from_slice(&self.ranges[..index]);
        ranges.extend_from_slice(self.ranges[index].remove(value).sub_ranges());
        ranges.extend_from_slice(&self.ranges[index + 1..]);
        Range::from_canonical(ranges)
    }

    /// Iterate the values from lowest to highest.
    pub fn iter(&self) -> RangeIter<'_> {
        RangeIter::new(&self.ranges)
    }

    /// Index of the sub-range holding `value`.
    fn position_of(&self, value: i64) -> Option<usize> {
        let index = self.ranges.partition_point(|range| range.to() < value);
        self.ranges
            .get(index)
            .filter(|range| range.contains(value))
            .map(|_| index)
    }
}

impl<'a> IntoIterator for &'a SparseRange {
    type Item = i64;
    type IntoIter = RangeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for SparseRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}..{}", range.from(), range.to())?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sparse(bounds: &[(i64, i64)]) -> SparseRange {
        SparseRange::from_canonical(
            bounds
                .iter()
                .map(|&(from, to)| ContiguousRange::new(from, to))
                .collect(),
        )
    }

    #[test]
    fn test_bounds_and_size() {
        let range = sparse(&[(1, 3), (5, 7), (10, 10)]);
        assert_eq!(range.from(), 1);
        assert_eq!(range.to(), 10);
        assert_eq!(range.size(), 7);
    }

    #[test]
    fn test_contains() {
        let range = sparse(&[(1, 3), (5, 7)]);
        assert!(range.contains(1));
        assert!(range.contains(3));
        assert!(!range.contains(4));
        assert!(range.contains(6));
        assert!(!range.contains(8));
        assert!(!range.contains(-1));
    }

    #[test]
    fn test_add_fills_gap_and_collapses() {
        let range = sparse(&[(1, 3), (5, 7)]);
        assert_eq!(range.add(4), Range::new(1, 7));
        assert_eq!(range.add(2), Range::Sparse(range.clone()));

        let extended = range.add(8);
        assert_eq!(extended, Range::Sparse(sparse(&[(1, 3), (5, 8)])));

        let added = range.add(20);
        assert_eq!(added, Range::Sparse(sparse(&[(1, 3), (5, 7), (20, 20)])));
    }

    #[test]
    fn test_remove_folds_to_contiguous() {
        let range = sparse(&[(1, 3), (5, 5)]);
        assert_eq!(range.remove(5), Range::new(1, 3));
        assert_eq!(range.remove(4), Range::Sparse(range.clone()));

        let split = range.remove(2);
        assert_eq!(split, Range::Sparse(sparse(&[(1, 1), (3, 3), (5, 5)])));
    }

    #[test]
    fn test_iteration_crosses_sub_ranges() {
        let range = sparse(&[(1, 2), (5, 6), (9, 9)]);
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![1, 2, 5, 6, 9]);
        // A second pass starts over
        assert_eq!(range.iter().next(), Some(1));
    }

    #[test]
    fn test_display() {
        assert_eq!(sparse(&[(1, 3), (5, 7)]).to_string(), "[1..3, 5..7]");
    }
}
