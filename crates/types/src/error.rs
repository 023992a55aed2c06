//! Errors raised by the value types.

use crate::ContiguousRange;
use thiserror::Error;

/// Errors produced by range arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// Two overlapping but unequal ranges were ordered against each other.
    ///
    /// Sub-ranges of a sparse range never overlap, so reaching this means an
    /// invariant was broken upstream.
    #[error("ranges {left} and {right} overlap and cannot be ordered")]
    NotComparable {
        left: ContiguousRange,
        right: ContiguousRange,
    },

    /// The operation is not defined for this kind of range.
    #[error("unsupported range operation: {0}")]
    Unsupported(&'static str),
}
