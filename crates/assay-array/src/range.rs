//! Range specifications used to carve views out of an [`NdArray`](crate::NdArray).

use crate::error::ArrayError;

/// Sentinel meaning "the natural boundary of the dimension".
///
/// As a `begin` it means the first element in the direction of travel
/// (the last element for a negative step). As an `end` it means one past
/// the last element in the direction of travel.
pub const END: i64 = i64::MAX;

/// A half-open `[begin, end)` selection along one dimension.
///
/// Negative `begin`/`end` values count back from the extent. A step of
/// zero selects the single index `begin` and removes the dimension from
/// the resulting view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    /// First index selected (or [`END`]).
    pub begin: i64,
    /// Distance between selected indices; negative walks backwards.
    pub step: i64,
    /// One past the last index selected (or [`END`]).
    pub end: i64,
}

impl Range {
    /// `[begin, end)` with step 1.
    pub const fn new(begin: i64, end: i64) -> Self {
        Self {
            begin,
            step: 1,
            end,
        }
    }

    /// `[begin, end)` with an explicit step.
    pub const fn stepped(begin: i64, step: i64, end: i64) -> Self {
        Self { begin, step, end }
    }

    /// A single index. The dimension is dropped from the view.
    pub const fn single(index: i64) -> Self {
        Self {
            begin: index,
            step: 0,
            end: index,
        }
    }

    /// The whole dimension, front to back.
    pub const fn all() -> Self {
        Self {
            begin: END,
            step: 1,
            end: END,
        }
    }

    /// The whole dimension, back to front.
    pub const fn reversed() -> Self {
        Self {
            begin: END,
            step: -1,
            end: END,
        }
    }

    /// Resolve this range against a concrete extent.
    ///
    /// `dim` is only used to label errors.
    pub(crate) fn resolve(&self, dim: usize, extent: usize) -> Result<Resolved, ArrayError> {
        let ext = extent as i64;
        let step = self.step;

        let begin = if self.begin == END {
            if step < 0 {
                ext - 1
            } else {
                0
            }
        } else if self.begin < 0 {
            let wrapped = self.begin + ext;
            if wrapped < 0 {
                return Err(ArrayError::NegativeIndex {
                    dim,
                    index: self.begin,
                    extent,
                });
            }
            wrapped
        } else {
            self.begin
        };

        let end = if self.end == END {
            // -1 is the only negative end allowed; it means "through index 0".
            if step < 0 {
                -1
            } else if step == 0 {
                begin
            } else {
                ext
            }
        } else if self.end < 0 {
            let wrapped = self.end + ext;
            if wrapped < 0 && !(step < 0 && wrapped == -1) {
                return Err(ArrayError::NegativeIndex {
                    dim,
                    index: self.end,
                    extent,
                });
            }
            wrapped
        } else {
            self.end
        };

        if step == 0 {
            if begin >= ext {
                return Err(ArrayError::BeginOutOfBounds { dim, begin, extent });
            }
            if end != begin {
                return Err(ArrayError::SingleIndexMismatch { dim, begin, end });
            }
            return Ok(Resolved {
                begin,
                step,
                extent: None,
            });
        }

        if begin == end {
            return Err(ArrayError::EqualBounds { dim });
        }
        if begin > ext || (step < 0 && begin >= ext) {
            return Err(ArrayError::BeginOutOfBounds { dim, begin, extent });
        }
        if end > ext {
            return Err(ArrayError::EndOutOfBounds { dim, end, extent });
        }
        if (end - begin).signum() != step.signum() {
            return Err(ArrayError::StepMismatch {
                dim,
                begin,
                end,
                step,
            });
        }

        let span = (end - begin).unsigned_abs();
        let stride = step.unsigned_abs();
        Ok(Resolved {
            begin,
            step,
            extent: Some(span.div_ceil(stride) as usize),
        })
    }
}

/// A range after sentinel and negative-index resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Resolved {
    pub(crate) begin: i64,
    pub(crate) step: i64,
    /// `None` when the dimension is removed (single index).
    pub(crate) extent: Option<usize>,
}
