//! The external model contract.
//!
//! Numerical integration is not part of the engine. A model is anything
//! that can be advanced in its free variable (usually time), report named
//! outputs, and save or restore its state vector.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use assay_array::NdArray;
use indexmap::IndexMap;

use crate::error::ModelError;
use crate::value::Value;

/// A simulateable model driven by the simulation tree.
///
/// Outputs are reported in a fixed declared order: scalar outputs first,
/// then vector outputs. [`collect_outputs`] turns them into [`Value`]s.
pub trait Model {
    /// Current value of the free variable.
    fn free_variable(&self) -> f64;

    /// Move the free variable without solving (used before the first point).
    fn set_free_variable(&mut self, value: f64);

    /// Advance the model from its current free variable to `end_point`.
    fn solve_until(&mut self, end_point: f64) -> Result<(), ModelError>;

    /// Names of the scalar outputs, in declared order.
    fn output_names(&self) -> Vec<String>;

    /// Scalar outputs at the current point, matching [`output_names`](Self::output_names).
    fn compute_outputs(&mut self) -> Result<Vec<f64>, ModelError>;

    /// Names of the vector outputs, in declared order.
    fn vector_output_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Vector outputs at the current point, matching
    /// [`vector_output_names`](Self::vector_output_names).
    fn compute_vector_outputs(&mut self) -> Result<Vec<Vec<f64>>, ModelError> {
        Ok(Vec::new())
    }

    /// A snapshot of the state vector.
    fn state_variables(&self) -> Vec<f64>;

    /// Restore a state vector taken by [`state_variables`](Self::state_variables).
    fn set_state_variables(&mut self, state: &[f64]) -> Result<(), ModelError>;

    /// Return to the model's initial conditions.
    fn reset_to_initial_conditions(&mut self);

    /// True if the model resets its own state at the start of every run,
    /// making every iteration independent of earlier ones.
    fn has_implicit_reset(&self) -> bool {
        false
    }

    /// Current value of a named parameter or state variable.
    fn variable(&self, name: &str) -> Option<f64>;

    /// Overwrite a named parameter or state variable.
    fn set_variable(&mut self, name: &str, value: f64) -> Result<(), ModelError>;

    /// Drop any cached derived quantities after a variable was overwritten.
    fn invalidate_cache(&mut self) {}

    /// Where the model may write its own per-run files.
    fn set_output_folder(&mut self, _folder: &Path) {}
}

/// A model shared between the nodes of a simulation tree.
pub type SharedModel = Rc<RefCell<dyn Model>>;

/// Wrap a model for sharing.
pub fn share<M: Model + 'static>(model: M) -> SharedModel {
    Rc::new(RefCell::new(model))
}

/// Compute all outputs, scalars as numbers and vectors as 1-d arrays.
pub fn collect_outputs(model: &mut dyn Model) -> Result<IndexMap<String, Value>, ModelError> {
    let names = model.output_names();
    let values = model.compute_outputs()?;
    if names.len() != values.len() {
        return Err(ModelError::OutputsFailed {
            reason: format!(
                "{} scalar outputs declared but {} computed",
                names.len(),
                values.len()
            ),
        });
    }
    let vector_names = model.vector_output_names();
    let vectors = model.compute_vector_outputs()?;
    if vector_names.len() != vectors.len() {
        return Err(ModelError::OutputsFailed {
            reason: format!(
                "{} vector outputs declared but {} computed",
                vector_names.len(),
                vectors.len()
            ),
        });
    }

    let mut outputs = IndexMap::with_capacity(names.len() + vector_names.len());
    for (name, value) in names.into_iter().zip(values) {
        outputs.insert(name, Value::Number(value));
    }
    for (name, data) in vector_names.into_iter().zip(vectors) {
        let len = data.len();
        let array = NdArray::from_vec(&[len], data).map_err(|err| ModelError::OutputsFailed {
            reason: err.to_string(),
        })?;
        outputs.insert(name, Value::Array(array));
    }
    Ok(outputs)
}
