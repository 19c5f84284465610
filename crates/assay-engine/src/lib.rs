//! Simulation engine for Assay experiments.
//!
//! Provides the recursive [`Simulation`] tree that drives an externally
//! supplied model through nested loops, the [`Modifier`]s that reset, save
//! or overwrite model state at loop boundaries, the loop-independence
//! analysis used to split work between worker processes, and
//! [`Experiment`], a complete protocol host.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod experiment;
pub mod modifier;
pub mod parallel;
pub mod simulation;
pub mod state;

pub use config::{ConfigError, RunConfig, WorkerSlot};
pub use experiment::{Experiment, OutputSpec};
pub use modifier::{ApplyWhen, Modifier, ModifierAction, ModifierCollection};
pub use parallel::{analyse_loops, DistributionPoint, Partition, RoundRobin};
pub use simulation::{CombinedMode, LoopFrame, LoopStack, Simulation, SimulationKind};
pub use state::{SharedStateCollection, StateCollection};
