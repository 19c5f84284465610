//! Shared, strided n-dimensional arrays for the Assay experiment engine.
//!
//! This is the leaf crate with zero internal dependencies. Every stepper
//! value and every simulation result is stored in an [`NdArray`]:
//!
//! - cloning an array aliases it, [`NdArray::copy`] deep-copies it;
//! - [`NdArray::view`] selects [`Range`]s (negative steps, negative
//!   indices, the [`END`] sentinel, dimension-removing single indices)
//!   and shares storage with the parent;
//! - [`NdArray::resize`] keeps the overlap of old and new extents, which
//!   is how results of loops with an unknown length grow and shrink.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod array;
pub mod error;
pub mod index;
pub mod range;

pub use array::NdArray;
pub use error::ArrayError;
pub use index::{increment_indices, num_elements, row_major_strides, Indices, Shape, Strides};
pub use range::{Range, END};
