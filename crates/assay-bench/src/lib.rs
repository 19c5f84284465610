//! Benchmark profiles and utilities for the Assay experiment engine.
//!
//! Provides pre-built simulation trees for benchmarking:
//!
//! - [`reference_scan`]: 20 outer iterations of a 50-point timecourse
//! - [`stress_scan`]: a 10×10 two-level scan of 100-point timecourses
//! - [`ramp_array`]: a filled array for view and copy benchmarks
//!
//! Every profile drives a [`RelaxationModel`], which is cheap enough that
//! the engine's own bookkeeping dominates the measurement.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use assay_array::NdArray;
use assay_core::{share, Model, ModelError};
use assay_engine::{ApplyWhen, Modifier, ModifierCollection, Simulation, StateCollection};
use assay_stepper::Stepper;

/// First-order relaxation of three states towards a target, solved exactly.
#[derive(Debug)]
pub struct RelaxationModel {
    time: f64,
    state: [f64; 3],
    rate: f64,
}

impl RelaxationModel {
    /// Start from zero with relaxation `rate`.
    pub fn new(rate: f64) -> Self {
        Self {
            time: 0.0,
            state: [0.0; 3],
            rate,
        }
    }
}

impl Model for RelaxationModel {
    fn free_variable(&self) -> f64 {
        self.time
    }

    fn set_free_variable(&mut self, value: f64) {
        self.time = value;
    }

    fn solve_until(&mut self, end_point: f64) -> Result<(), ModelError> {
        let decay = (-self.rate * (end_point - self.time)).exp();
        for (i, y) in self.state.iter_mut().enumerate() {
            let target = (i + 1) as f64;
            *y = target + (*y - target) * decay;
        }
        self.time = end_point;
        Ok(())
    }

    fn output_names(&self) -> Vec<String> {
        vec!["time".into(), "y0".into()]
    }

    fn compute_outputs(&mut self) -> Result<Vec<f64>, ModelError> {
        Ok(vec![self.time, self.state[0]])
    }

    fn vector_output_names(&self) -> Vec<String> {
        vec!["y".into()]
    }

    fn compute_vector_outputs(&mut self) -> Result<Vec<Vec<f64>>, ModelError> {
        Ok(vec![self.state.to_vec()])
    }

    fn state_variables(&self) -> Vec<f64> {
        self.state.to_vec()
    }

    fn set_state_variables(&mut self, state: &[f64]) -> Result<(), ModelError> {
        if state.len() != self.state.len() {
            return Err(ModelError::StateLength {
                expected: self.state.len(),
                got: state.len(),
            });
        }
        self.state.copy_from_slice(state);
        Ok(())
    }

    fn reset_to_initial_conditions(&mut self) {
        self.state = [0.0; 3];
    }

    fn variable(&self, name: &str) -> Option<f64> {
        (name == "rate").then_some(self.rate)
    }

    fn set_variable(&mut self, name: &str, value: f64) -> Result<(), ModelError> {
        if name != "rate" {
            return Err(ModelError::UnknownVariable {
                name: name.to_string(),
            });
        }
        self.rate = value;
        Ok(())
    }
}

fn points(name: &str, n: usize) -> Stepper {
    Stepper::uniform(name, "", 0.0, (n - 1) as f64, 1.0).unwrap()
}

fn reset_each_loop() -> ModifierCollection {
    [Modifier::reset(ApplyWhen::EveryLoop, None, StateCollection::shared())]
        .into_iter()
        .collect()
}

/// Build a reference profile: 20 runs of a 50-point timecourse.
pub fn reference_scan() -> Simulation {
    let leaf = Simulation::timecourse(points("t", 50)).unwrap();
    let mut root = Simulation::nested(points("run", 20), leaf)
        .unwrap()
        .with_prefix("reference")
        .with_modifiers(reset_each_loop());
    root.set_model(share(RelaxationModel::new(0.2)));
    root
}

/// Build a stress profile: a 10×10 scan of 100-point timecourses.
pub fn stress_scan() -> Simulation {
    let leaf = Simulation::timecourse(points("t", 100)).unwrap();
    let inner = Simulation::nested(points("j", 10), leaf)
        .unwrap()
        .with_modifiers(reset_each_loop());
    let mut root = Simulation::nested(points("i", 10), inner)
        .unwrap()
        .with_prefix("stress");
    root.set_model(share(RelaxationModel::new(0.2)));
    root
}

/// A row-major array whose elements count up from zero.
pub fn ramp_array(extents: &[usize]) -> NdArray<f64> {
    let len = extents.iter().product::<usize>();
    NdArray::from_vec(extents, (0..len).map(|i| i as f64).collect()).unwrap()
}
