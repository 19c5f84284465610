//! Shape, stride and index-vector helpers.

use smallvec::SmallVec;

/// Extents of an array, outermost dimension first.
pub type Shape = SmallVec<[usize; 4]>;

/// Per-dimension distance between consecutive elements, in elements.
///
/// Signed because views with a negative step walk storage backwards.
pub type Strides = SmallVec<[isize; 4]>;

/// A position within an array, one entry per dimension.
pub type Indices = SmallVec<[usize; 4]>;

/// Number of elements held by an array of the given extents.
///
/// A 0-dimensional shape holds exactly one element.
pub fn num_elements(extents: &[usize]) -> usize {
    extents.iter().product()
}

/// Row-major strides for a freshly allocated array.
///
/// `stride[last] = 1` and `stride[i] = extent[i + 1] * stride[i + 1]`.
pub fn row_major_strides(extents: &[usize]) -> Strides {
    let mut strides: Strides = SmallVec::from_elem(0, extents.len());
    let mut stride = 1isize;
    for dim in (0..extents.len()).rev() {
        strides[dim] = stride;
        stride *= extents[dim] as isize;
    }
    strides
}

/// Advance `indices` odometer-style within `extents`.
///
/// The last dimension varies fastest. A dimension that reaches its extent
/// wraps to zero and carries into the previous one. Returns `false` once
/// the whole index vector has wrapped back to all zeros.
pub fn increment_indices(indices: &mut [usize], extents: &[usize]) -> bool {
    debug_assert_eq!(indices.len(), extents.len());
    for dim in (0..indices.len()).rev() {
        indices[dim] += 1;
        if indices[dim] < extents[dim] {
            return true;
        }
        indices[dim] = 0;
    }
    false
}
