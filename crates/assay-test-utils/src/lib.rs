//! Test utilities and mock models for Assay development.
//!
//! Provides deterministic [`Model`](assay_core::Model) implementations in
//! [`fixtures`] and a [`ModelProbe`] that records what the engine asked a
//! model to do, so tests can assert on solves, resets and cache
//! invalidations without inspecting model internals.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

pub use fixtures::{CounterModel, DecayModel, FailingModel};

/// Calls recorded by a mock model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProbeLog {
    /// End points passed to `solve_until`, in call order.
    pub solves: Vec<f64>,
    /// Number of `reset_to_initial_conditions` calls.
    pub resets: usize,
    /// Number of `invalidate_cache` calls.
    pub invalidations: usize,
    /// Folders passed to `set_output_folder`, in call order.
    pub folders: Vec<PathBuf>,
}

/// Shared handle onto a [`ProbeLog`].
///
/// Clone the probe before handing the model to the engine; the clone
/// keeps seeing every call.
#[derive(Clone, Debug, Default)]
pub struct ModelProbe {
    log: Rc<RefCell<ProbeLog>>,
}

impl ModelProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ProbeLog {
        self.log.borrow().clone()
    }

    pub fn solves(&self) -> usize {
        self.log.borrow().solves.len()
    }

    pub fn resets(&self) -> usize {
        self.log.borrow().resets
    }

    pub fn invalidations(&self) -> usize {
        self.log.borrow().invalidations
    }

    pub fn folders(&self) -> Vec<PathBuf> {
        self.log.borrow().folders.clone()
    }

    pub(crate) fn record_solve(&self, end_point: f64) {
        self.log.borrow_mut().solves.push(end_point);
    }

    pub(crate) fn record_reset(&self) {
        self.log.borrow_mut().resets += 1;
    }

    pub(crate) fn record_invalidation(&self) {
        self.log.borrow_mut().invalidations += 1;
    }

    pub(crate) fn record_folder(&self, folder: PathBuf) {
        self.log.borrow_mut().folders.push(folder);
    }
}
