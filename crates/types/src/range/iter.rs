//! Iteration over finite ranges.

use super::ContiguousRange;

/// Lazy iterator over the values of a finite range, lowest first.
///
/// Borrows the range's sub-ranges; every call to `iter()` starts a fresh
/// pass.
#[derive(Debug, Clone)]
pub struct RangeIter<'a> {
    ranges: std::slice::Iter<'a, ContiguousRange>,
    /// Next value to yield and the upper bound of the sub-range it is in.
    current: Option<(i64, i64)>,
}

impl<'a> RangeIter<'a> {
    pub(crate) fn new(ranges: &'a [ContiguousRange]) -> Self {
        Self {
            ranges: ranges.iter(),
            current: None,
        }
    }
}

impl Iterator for RangeIter<'_> {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        loop {
            if let Some((next, to)) = self.current {
                self.current = (next < to).then(|| (next + 1, to));
                return Some(next);
            }

            let range = self.ranges.next()?;
            if !range.is_empty() {
                self.current = Some((range.from(), range.to()));
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let current = self
            .current
            .map_or(0, |(next, to)| to.abs_diff(next).saturating_add(1));
        let remaining = self
            .ranges
            .as_slice()
            .iter()
            .fold(current, |total, range| total.saturating_add(range.size()));

        match usize::try_from(remaining) {
            Ok(n) if remaining < u64::MAX => (n, Some(n)),
            _ => (usize::MAX, None),
        }
    }
}

impl std::iter::FusedIterator for RangeIter<'_> {}
