//! Loop steppers for the Assay experiment engine.
//!
//! Each nested loop of a simulation is driven by a [`Stepper`]:
//!
//! - [`Stepper::uniform`]: evenly spaced points, fixed length;
//! - [`Stepper::vector`]: an explicit list, fixed length;
//! - [`Stepper::functional`]: a value derived from other loops, length
//!   unknowable, only meaningful inside a multiple stepper;
//! - [`Stepper::while_loop`]: iteration counts while a condition holds,
//!   with a growing point-count estimate;
//! - [`Stepper::multiple`]: members stepped in lockstep.
//!
//! `current_output_number()` always equals the number of `step()` calls
//! since the last `reset()`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod functional;
pub mod multiple;
pub mod stepper;
pub mod uniform;
pub mod vector;
pub mod while_loop;

pub use stepper::{Stepper, StepperKind};
pub use uniform::UNIFORM_TOLERANCE;
pub use while_loop::{WHILE_ESTIMATE_INCREMENT, WHILE_ESTIMATE_SEED};
