//! The shared n-dimensional array.
//!
//! An [`NdArray`] is a handle. Cloning it yields an alias of the same array
//! (same storage, same shape); resizing through one alias is seen by all of
//! them. A view made with [`NdArray::view`] shares the parent's storage but
//! carries its own offset, shape and strides, so element writes through the
//! view land in the parent. [`NdArray::copy`] is the only operation that
//! allocates independent storage from existing data.
//!
//! Element access takes `&self`: mutation goes through interior cells, in
//! the same way as [`std::cell::Cell::set`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::error::ArrayError;
use crate::index::{increment_indices, num_elements, row_major_strides, Indices, Shape, Strides};
use crate::range::Range;

// ── Layout ──────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct Layout {
    shape: Shape,
    strides: Strides,
    offset: usize,
}

impl Layout {
    fn contiguous(extents: &[usize]) -> Self {
        Self {
            shape: SmallVec::from_slice(extents),
            strides: row_major_strides(extents),
            offset: 0,
        }
    }

    /// Storage position of `indices`.
    ///
    /// Panics if the dimensionality is wrong or an index is out of bounds.
    fn position(&self, indices: &[usize]) -> usize {
        assert_eq!(
            indices.len(),
            self.shape.len(),
            "index dimensionality {} does not match array dimensionality {}",
            indices.len(),
            self.shape.len()
        );
        let mut pos = self.offset as isize;
        for (dim, (&i, &extent)) in indices.iter().zip(self.shape.iter()).enumerate() {
            assert!(
                i < extent,
                "index {i} out of bounds for dimension {dim} of extent {extent}"
            );
            pos += i as isize * self.strides[dim];
        }
        debug_assert!(pos >= 0);
        pos as usize
    }

    /// Storage positions of every element in row-major order.
    fn positions(&self) -> Vec<usize> {
        let n = num_elements(&self.shape);
        let mut out = Vec::with_capacity(n);
        let mut idx: Indices = SmallVec::from_elem(0, self.shape.len());
        for _ in 0..n {
            out.push(self.position(&idx));
            increment_indices(&mut idx, &self.shape);
        }
        out
    }
}

// ── NdArray ─────────────────────────────────────────────────────

struct Inner<T> {
    storage: Rc<RefCell<Vec<T>>>,
    layout: Layout,
}

/// A reference-counted, strided n-dimensional array.
///
/// See the [module documentation](self) for the aliasing rules.
pub struct NdArray<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for NdArray<T> {
    /// Returns an alias, not a copy.
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> NdArray<T> {
    fn from_parts(storage: Rc<RefCell<Vec<T>>>, layout: Layout) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner { storage, layout })),
        }
    }

    /// Wrap row-major `data` in an array of the given extents.
    pub fn from_vec(extents: &[usize], data: Vec<T>) -> Result<Self, ArrayError> {
        let expected = num_elements(extents);
        if data.len() != expected {
            return Err(ArrayError::DataLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self::from_parts(
            Rc::new(RefCell::new(data)),
            Layout::contiguous(extents),
        ))
    }

    /// A 0-dimensional array holding one value.
    pub fn from_scalar(value: T) -> Self {
        Self::from_parts(Rc::new(RefCell::new(vec![value])), Layout::contiguous(&[]))
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.inner.borrow().layout.shape.len()
    }

    /// Extents, outermost first.
    pub fn shape(&self) -> Shape {
        self.inner.borrow().layout.shape.clone()
    }

    /// Element strides of this array (or view) into its storage.
    pub fn strides(&self) -> Strides {
        self.inner.borrow().layout.strides.clone()
    }

    /// Total number of elements (1 for a 0-dimensional array).
    pub fn num_elements(&self) -> usize {
        num_elements(&self.inner.borrow().layout.shape)
    }

    /// True if any extent is zero.
    pub fn is_empty(&self) -> bool {
        self.num_elements() == 0
    }

    /// True if both arrays read and write the same storage.
    pub fn aliases(&self, other: &NdArray<T>) -> bool {
        Rc::ptr_eq(&self.inner.borrow().storage, &other.inner.borrow().storage)
    }

    /// A zeroed index vector of matching dimensionality.
    pub fn indices(&self) -> Indices {
        SmallVec::from_elem(0, self.ndim())
    }

    /// Overwrite one element.
    pub fn set(&self, indices: &[usize], value: T) {
        let inner = self.inner.borrow();
        let pos = inner.layout.position(indices);
        inner.storage.borrow_mut()[pos] = value;
    }

    /// Create a view selecting `ranges`, one per dimension.
    ///
    /// Ranged dimensions keep their place with extent
    /// `ceil((end - begin) / step)`; single-index ranges remove theirs.
    pub fn view(&self, ranges: &[Range]) -> Result<NdArray<T>, ArrayError> {
        let inner = self.inner.borrow();
        let layout = &inner.layout;
        if ranges.len() != layout.shape.len() {
            return Err(ArrayError::WrongRangeCount {
                expected: layout.shape.len(),
                got: ranges.len(),
            });
        }

        let mut offset = layout.offset as isize;
        let mut shape = Shape::new();
        let mut strides = Strides::new();
        for (dim, range) in ranges.iter().enumerate() {
            let resolved = range.resolve(dim, layout.shape[dim])?;
            offset += resolved.begin as isize * layout.strides[dim];
            if let Some(extent) = resolved.extent {
                shape.push(extent);
                strides.push(layout.strides[dim] * resolved.step as isize);
            }
        }
        debug_assert!(offset >= 0);

        Ok(Self::from_parts(
            Rc::clone(&inner.storage),
            Layout {
                shape,
                strides,
                offset: offset as usize,
            },
        ))
    }
}

impl<T: Clone> NdArray<T> {
    /// Read one element.
    ///
    /// Panics if `indices` has the wrong dimensionality or is out of bounds.
    pub fn get(&self, indices: &[usize]) -> T {
        let inner = self.inner.borrow();
        let pos = inner.layout.position(indices);
        let storage = inner.storage.borrow();
        storage[pos].clone()
    }

    /// All elements in row-major order of this array's own shape.
    pub fn to_vec(&self) -> Vec<T> {
        let inner = self.inner.borrow();
        let storage = inner.storage.borrow();
        inner
            .layout
            .positions()
            .into_iter()
            .map(|pos| storage[pos].clone())
            .collect()
    }

    /// Set every element to `value`.
    pub fn fill(&self, value: T) {
        let inner = self.inner.borrow();
        let mut storage = inner.storage.borrow_mut();
        for pos in inner.layout.positions() {
            storage[pos] = value.clone();
        }
    }

    /// Copy every element of `src` into this array.
    ///
    /// Panics if the shapes differ. `src` may alias this array.
    pub fn copy_from(&self, src: &NdArray<T>) {
        let values = src.to_vec();
        let inner = self.inner.borrow();
        assert_eq!(
            inner.layout.shape,
            src.shape(),
            "cannot copy between arrays of different shapes"
        );
        let mut storage = inner.storage.borrow_mut();
        for (pos, value) in inner.layout.positions().into_iter().zip(values) {
            storage[pos] = value;
        }
    }

    /// A deep copy with fresh contiguous storage.
    pub fn copy(&self) -> NdArray<T> {
        let shape = self.shape();
        Self::from_parts(
            Rc::new(RefCell::new(self.to_vec())),
            Layout::contiguous(&shape),
        )
    }
}

impl<T: Clone + Default> NdArray<T> {
    /// An array of the given extents filled with `T::default()`.
    pub fn new(extents: &[usize]) -> Self {
        Self::from_parts(
            Rc::new(RefCell::new(vec![T::default(); num_elements(extents)])),
            Layout::contiguous(extents),
        )
    }

    /// Reallocate with new extents, keeping the overlapping block.
    ///
    /// Elements inside the per-dimension minimum of old and new extents
    /// keep their indices; everything else is `T::default()`. Every alias
    /// of this array sees the new storage. Views taken earlier keep the old
    /// storage.
    ///
    /// Panics if the dimensionality changes.
    pub fn resize(&self, extents: &[usize]) {
        let mut inner = self.inner.borrow_mut();
        assert_eq!(
            extents.len(),
            inner.layout.shape.len(),
            "resize cannot change dimensionality"
        );
        if inner.layout.shape.as_slice() == extents {
            return;
        }

        let new_layout = Layout::contiguous(extents);
        let mut data = vec![T::default(); num_elements(extents)];
        let overlap: Shape = inner
            .layout
            .shape
            .iter()
            .zip(extents)
            .map(|(&old, &new)| old.min(new))
            .collect();
        {
            let old = inner.storage.borrow();
            let mut idx: Indices = SmallVec::from_elem(0, overlap.len());
            for _ in 0..num_elements(&overlap) {
                data[new_layout.position(&idx)] = old[inner.layout.position(&idx)].clone();
                increment_indices(&mut idx, &overlap);
            }
        }
        inner.storage = Rc::new(RefCell::new(data));
        inner.layout = new_layout;
    }
}

impl<T: Clone + PartialEq> PartialEq for NdArray<T> {
    /// Equal shapes and equal elements; storage identity is irrelevant.
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape() && self.to_vec() == other.to_vec()
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for NdArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NdArray")
            .field("shape", &self.shape().as_slice())
            .field("data", &self.to_vec())
            .finish()
    }
}
