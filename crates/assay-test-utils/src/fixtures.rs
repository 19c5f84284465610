//! Deterministic models for engine tests.

use std::path::Path;

use assay_core::{Model, ModelError};

use crate::ModelProbe;

fn check_state(state: &[f64], expected: usize) -> Result<(), ModelError> {
    if state.len() != expected {
        return Err(ModelError::StateLength {
            expected,
            got: state.len(),
        });
    }
    Ok(())
}

// ── CounterModel ───────────────────────────────────────────────────

/// Adds `increment` to `count` on every solve, whatever the interval.
///
/// Outputs `time` and `count`; with [`with_levels`](Self::with_levels) also
/// a vector output `levels = [count, 2·count, …]`. Makes it easy to tell
/// from the results how many solves happened since the last reset.
#[derive(Debug)]
pub struct CounterModel {
    time: f64,
    count: f64,
    initial_count: f64,
    increment: f64,
    levels: Option<usize>,
    implicit_reset: bool,
    probe: ModelProbe,
}

impl CounterModel {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            count: 0.0,
            initial_count: 0.0,
            increment: 1.0,
            levels: None,
            implicit_reset: false,
            probe: ModelProbe::new(),
        }
    }

    pub fn with_initial_count(mut self, count: f64) -> Self {
        self.count = count;
        self.initial_count = count;
        self
    }

    pub fn with_increment(mut self, increment: f64) -> Self {
        self.increment = increment;
        self
    }

    /// Add a vector output `levels` of length `len`.
    pub fn with_levels(mut self, len: usize) -> Self {
        self.levels = Some(len);
        self
    }

    pub fn with_implicit_reset(mut self) -> Self {
        self.implicit_reset = true;
        self
    }

    pub fn probe(&self) -> ModelProbe {
        self.probe.clone()
    }

    pub fn count(&self) -> f64 {
        self.count
    }
}

impl Default for CounterModel {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for CounterModel {
    fn free_variable(&self) -> f64 {
        self.time
    }

    fn set_free_variable(&mut self, value: f64) {
        self.time = value;
    }

    fn solve_until(&mut self, end_point: f64) -> Result<(), ModelError> {
        self.probe.record_solve(end_point);
        self.count += self.increment;
        self.time = end_point;
        Ok(())
    }

    fn output_names(&self) -> Vec<String> {
        vec!["time".into(), "count".into()]
    }

    fn compute_outputs(&mut self) -> Result<Vec<f64>, ModelError> {
        Ok(vec![self.time, self.count])
    }

    fn vector_output_names(&self) -> Vec<String> {
        match self.levels {
            Some(_) => vec!["levels".into()],
            None => Vec::new(),
        }
    }

    fn compute_vector_outputs(&mut self) -> Result<Vec<Vec<f64>>, ModelError> {
        Ok(match self.levels {
            Some(len) => vec![(1..=len).map(|k| k as f64 * self.count).collect()],
            None => Vec::new(),
        })
    }

    fn state_variables(&self) -> Vec<f64> {
        vec![self.count]
    }

    fn set_state_variables(&mut self, state: &[f64]) -> Result<(), ModelError> {
        check_state(state, 1)?;
        self.count = state[0];
        Ok(())
    }

    fn reset_to_initial_conditions(&mut self) {
        self.probe.record_reset();
        self.count = self.initial_count;
    }

    fn has_implicit_reset(&self) -> bool {
        self.implicit_reset
    }

    fn variable(&self, name: &str) -> Option<f64> {
        match name {
            "increment" => Some(self.increment),
            "count" => Some(self.count),
            _ => None,
        }
    }

    fn set_variable(&mut self, name: &str, value: f64) -> Result<(), ModelError> {
        match name {
            "increment" => self.increment = value,
            "count" => self.count = value,
            _ => {
                return Err(ModelError::UnknownVariable {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }

    fn invalidate_cache(&mut self) {
        self.probe.record_invalidation();
    }

    fn set_output_folder(&mut self, folder: &Path) {
        self.probe.record_folder(folder.to_path_buf());
    }
}

// ── DecayModel ─────────────────────────────────────────────────────

/// Exponential decay `y' = -k·y`, solved exactly.
#[derive(Debug)]
pub struct DecayModel {
    time: f64,
    y: f64,
    y0: f64,
    k: f64,
    probe: ModelProbe,
}

impl DecayModel {
    pub fn new(y0: f64, k: f64) -> Self {
        Self {
            time: 0.0,
            y: y0,
            y0,
            k,
            probe: ModelProbe::new(),
        }
    }

    pub fn probe(&self) -> ModelProbe {
        self.probe.clone()
    }

    /// The exact solution at `t` from the initial conditions.
    pub fn exact(&self, t: f64) -> f64 {
        self.y0 * (-self.k * t).exp()
    }
}

impl Model for DecayModel {
    fn free_variable(&self) -> f64 {
        self.time
    }

    fn set_free_variable(&mut self, value: f64) {
        self.time = value;
    }

    fn solve_until(&mut self, end_point: f64) -> Result<(), ModelError> {
        self.probe.record_solve(end_point);
        self.y *= (-self.k * (end_point - self.time)).exp();
        self.time = end_point;
        Ok(())
    }

    fn output_names(&self) -> Vec<String> {
        vec!["time".into(), "y".into()]
    }

    fn compute_outputs(&mut self) -> Result<Vec<f64>, ModelError> {
        Ok(vec![self.time, self.y])
    }

    fn state_variables(&self) -> Vec<f64> {
        vec![self.y]
    }

    fn set_state_variables(&mut self, state: &[f64]) -> Result<(), ModelError> {
        check_state(state, 1)?;
        self.y = state[0];
        Ok(())
    }

    fn reset_to_initial_conditions(&mut self) {
        self.probe.record_reset();
        self.y = self.y0;
    }

    fn variable(&self, name: &str) -> Option<f64> {
        match name {
            "k" => Some(self.k),
            "y" => Some(self.y),
            _ => None,
        }
    }

    fn set_variable(&mut self, name: &str, value: f64) -> Result<(), ModelError> {
        match name {
            "k" => self.k = value,
            "y" => self.y = value,
            _ => {
                return Err(ModelError::UnknownVariable {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }

    fn invalidate_cache(&mut self) {
        self.probe.record_invalidation();
    }
}

// ── FailingModel ───────────────────────────────────────────────────

/// Solves successfully `budget` times, then fails.
#[derive(Debug)]
pub struct FailingModel {
    time: f64,
    budget: usize,
}

impl FailingModel {
    pub fn new(budget: usize) -> Self {
        Self { time: 0.0, budget }
    }
}

impl Model for FailingModel {
    fn free_variable(&self) -> f64 {
        self.time
    }

    fn set_free_variable(&mut self, value: f64) {
        self.time = value;
    }

    fn solve_until(&mut self, end_point: f64) -> Result<(), ModelError> {
        if self.budget == 0 {
            return Err(ModelError::SolveFailed {
                reason: format!("gave up before reaching {end_point}"),
            });
        }
        self.budget -= 1;
        self.time = end_point;
        Ok(())
    }

    fn output_names(&self) -> Vec<String> {
        vec!["time".into()]
    }

    fn compute_outputs(&mut self) -> Result<Vec<f64>, ModelError> {
        Ok(vec![self.time])
    }

    fn state_variables(&self) -> Vec<f64> {
        Vec::new()
    }

    fn set_state_variables(&mut self, state: &[f64]) -> Result<(), ModelError> {
        check_state(state, 0)
    }

    fn reset_to_initial_conditions(&mut self) {}

    fn variable(&self, _name: &str) -> Option<f64> {
        None
    }

    fn set_variable(&mut self, name: &str, _value: f64) -> Result<(), ModelError> {
        Err(ModelError::UnknownVariable {
            name: name.to_string(),
        })
    }
}
