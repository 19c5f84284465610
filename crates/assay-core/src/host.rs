//! The contract a sub-protocol node relies on.

use std::path::Path;

use crate::env::Environment;
use crate::error::ProtocolError;
use crate::model::SharedModel;
use crate::value::Value;

/// A complete protocol that can be embedded in another protocol's
/// simulation tree.
///
/// The embedding node sets inputs, re-runs the library, runs the whole
/// protocol and then reads selected names from [`outputs`](Self::outputs).
pub trait ProtocolHost {
    /// Override a declared input.
    fn set_input(&mut self, name: &str, value: Value) -> Result<(), ProtocolError>;

    /// Use `model` for every simulation in the protocol.
    fn set_model(&mut self, model: SharedModel);

    /// Re-evaluate library definitions against the current inputs.
    fn initialise_library(&mut self) -> Result<(), ProtocolError>;

    /// Run every simulation, post-processing and output selection.
    fn run(&mut self) -> Result<(), ProtocolError>;

    /// The protocol's selected outputs from the last run.
    fn outputs(&self) -> &Environment;

    /// Where simulations may write per-run files.
    fn set_output_folder(&mut self, _folder: &Path) {}
}
