//! Assay: an experiment protocol engine for simulateable models.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Assay sub-crates. For most users, adding `assay` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use assay::prelude::*;
//! use assay_test_utils::CounterModel;
//!
//! // Scan `i` over four values; each iteration is a fresh three-point
//! // timecourse of the model.
//! let states = StateCollection::shared();
//! let reset = [Modifier::reset(ApplyWhen::EveryLoop, None, states)]
//!     .into_iter()
//!     .collect();
//! let time = Stepper::uniform("t", "ms", 0.0, 2.0, 1.0).unwrap();
//! let leaf = Simulation::timecourse(time).unwrap();
//! let outer = Stepper::vector("i", "", vec![0.0, 1.0, 2.0, 3.0]).unwrap();
//! let mut scan = Simulation::nested(outer, leaf)
//!     .unwrap()
//!     .with_prefix("scan")
//!     .with_modifiers(reset);
//! scan.set_model(share(CounterModel::new()));
//!
//! let results = scan.run(None).unwrap();
//! let count = results.lookup("count").unwrap();
//! assert_eq!(count.shape().as_slice(), &[4, 3]);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`array`] | `assay-array` | `NdArray`, ranges and aliasing views |
//! | [`types`] | `assay-core` | Values, environments, expressions, model and host traits, errors |
//! | [`stepper`] | `assay-stepper` | Loop steppers |
//! | [`engine`] | `assay-engine` | Simulation tree, modifiers, loop distribution, `Experiment` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Multi-dimensional arrays with aliasing views (`assay-array`).
pub use assay_array as array;

/// Values, environments, expressions and traits (`assay-core`).
///
/// Implement [`types::Model`] to drive your own model, or
/// [`types::ProtocolHost`] to embed another kind of protocol.
pub use assay_core as types;

/// Loop steppers (`assay-stepper`).
pub use assay_stepper as stepper;

/// Simulation engine (`assay-engine`).
///
/// [`engine::Simulation`] for a single tree, [`engine::Experiment`] for a
/// whole protocol.
pub use assay_engine as engine;

/// Common imports for typical Assay usage.
///
/// ```rust
/// use assay::prelude::*;
/// ```
pub mod prelude {
    // Arrays
    pub use assay_array::{NdArray, Range, END};

    // Core types and traits
    pub use assay_core::{
        share, BoxedExpression, Environment, Expr, Expression, FnExpr, Location, Model,
        ProtocolHost, SharedModel, Value,
    };

    // Errors
    pub use assay_core::{ModelError, ProtocolError};

    // Steppers
    pub use assay_stepper::Stepper;

    // Engine
    pub use assay_engine::{
        ApplyWhen, CombinedMode, Experiment, Modifier, ModifierCollection, RunConfig, Simulation,
        StateCollection, WorkerSlot,
    };
}
