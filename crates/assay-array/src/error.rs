//! Array-specific error types.

use std::error::Error;
use std::fmt;

/// Errors raised while building a view or wrapping existing data.
///
/// Every variant describes a malformed range or shape; none of them is
/// transient, so callers report them as definition errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArrayError {
    /// The number of ranges does not match the array's dimensionality.
    WrongRangeCount {
        /// Dimensionality of the array being viewed.
        expected: usize,
        /// Number of ranges supplied.
        got: usize,
    },
    /// A negative begin/end was still negative after adding the extent.
    NegativeIndex {
        /// Dimension the range applies to.
        dim: usize,
        /// The index as supplied by the caller.
        index: i64,
        /// Extent of that dimension.
        extent: usize,
    },
    /// `begin == end` with a nonzero step selects nothing.
    EqualBounds {
        /// Dimension the range applies to.
        dim: usize,
    },
    /// The resolved begin lies outside the dimension.
    BeginOutOfBounds {
        /// Dimension the range applies to.
        dim: usize,
        /// Resolved begin index.
        begin: i64,
        /// Extent of that dimension.
        extent: usize,
    },
    /// The resolved end lies outside the dimension.
    EndOutOfBounds {
        /// Dimension the range applies to.
        dim: usize,
        /// Resolved end index.
        end: i64,
        /// Extent of that dimension.
        extent: usize,
    },
    /// The step points away from `end`.
    StepMismatch {
        /// Dimension the range applies to.
        dim: usize,
        /// Resolved begin index.
        begin: i64,
        /// Resolved end index.
        end: i64,
        /// The offending step.
        step: i64,
    },
    /// A single-index range (step 0) whose end differs from its begin.
    SingleIndexMismatch {
        /// Dimension the range applies to.
        dim: usize,
        /// Resolved begin index.
        begin: i64,
        /// Resolved end index.
        end: i64,
    },
    /// Data supplied for a new array does not fill its shape exactly.
    DataLength {
        /// Element count implied by the shape.
        expected: usize,
        /// Number of elements supplied.
        got: usize,
    },
}

impl fmt::Display for ArrayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongRangeCount { expected, got } => {
                write!(
                    f,
                    "the number of ranges ({got}) does not match the array dimensionality ({expected})"
                )
            }
            Self::NegativeIndex { dim, index, extent } => {
                write!(
                    f,
                    "index {index} in dimension {dim} is before the start of an extent of {extent}"
                )
            }
            Self::EqualBounds { dim } => {
                write!(
                    f,
                    "range in dimension {dim} has equal begin and end with a nonzero step"
                )
            }
            Self::BeginOutOfBounds { dim, begin, extent } => {
                write!(
                    f,
                    "range begin {begin} in dimension {dim} exceeds the extent {extent}"
                )
            }
            Self::EndOutOfBounds { dim, end, extent } => {
                write!(
                    f,
                    "range end {end} in dimension {dim} exceeds the extent {extent}"
                )
            }
            Self::StepMismatch {
                dim,
                begin,
                end,
                step,
            } => {
                write!(
                    f,
                    "step {step} in dimension {dim} cannot reach {end} from {begin}"
                )
            }
            Self::SingleIndexMismatch { dim, begin, end } => {
                write!(
                    f,
                    "single-index range in dimension {dim} has begin {begin} but end {end}"
                )
            }
            Self::DataLength { expected, got } => {
                write!(f, "expected {expected} elements for this shape, got {got}")
            }
        }
    }
}

impl Error for ArrayError {}
