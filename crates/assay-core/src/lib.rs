//! Values, environments, expressions and model traits for the Assay
//! experiment engine.
//!
//! Everything the simulation tree needs from its collaborators is
//! defined here:
//!
//! - [`Value`] and [`Environment`]: what expressions see and produce;
//! - [`Expression`]: evaluation contract, with [`Expr`] and [`FnExpr`]
//!   as ready-made implementations;
//! - [`Model`]: the externally supplied simulateable model;
//! - [`ProtocolHost`]: a whole protocol embedded as a sub-protocol;
//! - [`ProtocolError`]: the shared error type, with source [`Location`]s.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod env;
pub mod error;
pub mod expr;
pub mod host;
pub mod location;
pub mod model;
pub mod value;

pub use env::{qualify, Environment, PREFIX_SEPARATOR};
pub use error::{ErrorKind, Locate, ModelError, ProtocolError};
pub use expr::{BinaryOp, BoxedExpression, Expr, Expression, FnExpr, UnaryOp};
pub use host::ProtocolHost;
pub use location::Location;
pub use model::{collect_outputs, share, Model, SharedModel};
pub use value::Value;
