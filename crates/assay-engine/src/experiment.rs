//! A complete protocol: inputs, library, simulations, post-processing and
//! output selection.
//!
//! [`Experiment`] is the concrete [`ProtocolHost`]. A run goes through its
//! stages in order:
//!
//! 1. **Library**: definitions evaluated against the declared inputs.
//! 2. **Simulations**: each simulation's environment delegates to the
//!    library. A prefixed simulation's results become visible to every
//!    later stage as `prefix:name`.
//! 3. **Post-processing**: definitions evaluated over the library and the
//!    simulation results.
//! 4. **Outputs**: selected names copied into the outputs environment.
//!
//! Output selection attempts every output before reporting the first
//! failure, so outputs that could be computed stay readable.

use std::path::Path;

use assay_core::{BoxedExpression, Environment, ProtocolError, ProtocolHost, SharedModel, Value};
use log::{info, warn};

use crate::config::{ConfigError, RunConfig};
use crate::parallel::{analyse_loops, Partition, RoundRobin};
use crate::simulation::Simulation;
use crate::state::{SharedStateCollection, StateCollection};

/// One selected output: `name` is bound to the value of `reference`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputSpec {
    /// Name in the outputs environment.
    pub name: String,
    /// Name looked up in the post-processing environment.
    pub reference: String,
    /// Units, for display.
    pub units: Option<String>,
}

/// A protocol host running simulations against a shared model.
pub struct Experiment {
    name: String,
    inputs: Environment,
    library_definitions: Vec<(String, BoxedExpression)>,
    library: Environment,
    simulations: Vec<Simulation>,
    post_processing: Vec<(String, BoxedExpression)>,
    post: Environment,
    output_specs: Vec<OutputSpec>,
    outputs: Environment,
    model: Option<SharedModel>,
    states: SharedStateCollection,
    config: RunConfig,
}

impl Experiment {
    /// An empty experiment with the default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        let inputs = Environment::new();
        let library = Environment::delegating_to(&inputs);
        let post = Environment::delegating_to(&library);
        Self {
            name: name.into(),
            inputs,
            library_definitions: Vec::new(),
            library,
            simulations: Vec::new(),
            post_processing: Vec::new(),
            post,
            output_specs: Vec::new(),
            outputs: Environment::new(),
            model: None,
            states: StateCollection::shared(),
            config: RunConfig::default(),
        }
    }

    /// Use `config` for subsequent runs.
    pub fn with_config(mut self, config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    // ── Definition ──────────────────────────────────────────────

    /// Declare an input and its default value.
    pub fn declare_input(&mut self, name: &str, default: Value) -> Result<(), ProtocolError> {
        self.inputs.define(name, default)
    }

    /// Append a library definition.
    pub fn add_library_definition(&mut self, name: &str, value: BoxedExpression) {
        self.library_definitions.push((name.to_string(), value));
    }

    /// Append a simulation. It sees the library and earlier results.
    pub fn add_simulation(&mut self, mut simulation: Simulation) {
        simulation
            .environment()
            .set_delegatee("", Some(self.library.clone()));
        if let Some(model) = &self.model {
            simulation.set_model(model.clone());
        }
        self.simulations.push(simulation);
    }

    /// Append a post-processing definition.
    pub fn add_post_processing(&mut self, name: &str, value: BoxedExpression) {
        self.post_processing.push((name.to_string(), value));
    }

    /// Select `reference` as output `name`.
    pub fn add_output(&mut self, name: &str, reference: &str, units: Option<&str>) {
        self.output_specs.push(OutputSpec {
            name: name.to_string(),
            reference: reference.to_string(),
            units: units.map(str::to_string),
        });
    }

    // ── Accessors ───────────────────────────────────────────────

    /// The experiment's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checkpoints shared by every modifier of this experiment.
    pub fn state_collection(&self) -> SharedStateCollection {
        self.states.clone()
    }

    /// Declared inputs and their current values.
    pub fn inputs(&self) -> &Environment {
        &self.inputs
    }

    /// Library definitions from the last initialisation.
    pub fn library(&self) -> &Environment {
        &self.library
    }

    /// Post-processing results from the last run.
    pub fn post_processing(&self) -> &Environment {
        &self.post
    }

    /// The simulations, in run order.
    pub fn simulations(&self) -> &[Simulation] {
        &self.simulations
    }

    /// Results of the simulation with `prefix` from the last run.
    pub fn simulation_results(&self, prefix: &str) -> Option<Environment> {
        self.simulations
            .iter()
            .find(|s| s.prefix() == Some(prefix))
            .map(|s| s.results().clone())
    }

    /// The selected outputs.
    pub fn output_specs(&self) -> &[OutputSpec] {
        &self.output_specs
    }

    /// The run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    // ── Running ─────────────────────────────────────────────────

    fn run_simulations(&mut self) -> Result<(), ProtocolError> {
        let implicit_reset = self
            .model
            .as_ref()
            .is_some_and(|model| model.borrow().has_implicit_reset());
        let distribute = self.config.parallelise_loops && self.config.worker.is_distributed();

        for (i, simulation) in self.simulations.iter_mut().enumerate() {
            let label = simulation
                .prefix()
                .map_or_else(|| format!("simulation_{}", i + 1), str::to_string);
            if let Some(folder) = &self.config.output_folder {
                simulation.set_output_folder(&folder.join(&label));
            }

            let partition = if distribute {
                simulation.initialise_steppers()?;
                analyse_loops(simulation, implicit_reset).map(|point| {
                    info!(
                        "Distributing loop level {} of {label} as worker {} of {}",
                        point.level, self.config.worker.rank, self.config.worker.count
                    );
                    RoundRobin::new(&point, self.config.worker)
                })
            } else {
                None
            };

            info!("Running simulation {label}");
            let results = simulation.run(partition.as_ref().map(|p| p as &dyn Partition))?;
            if let Some(prefix) = simulation.prefix() {
                self.library.set_delegatee(prefix, Some(results));
            }
        }
        Ok(())
    }

    fn run_post_processing(&mut self) -> Result<(), ProtocolError> {
        for (name, value) in &self.post_processing {
            let value = value.evaluate(&self.post)?;
            self.post.define(name.clone(), value)?;
        }
        Ok(())
    }

    fn select_outputs(&mut self) -> Result<(), ProtocolError> {
        let mut first_error = None;
        for spec in &self.output_specs {
            match self.post.lookup(&spec.reference) {
                Ok(value) => self.outputs.overwrite(spec.name.clone(), value),
                Err(err) => {
                    warn!("Output {} could not be computed: {err}", spec.name);
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl ProtocolHost for Experiment {
    fn set_input(&mut self, name: &str, value: Value) -> Result<(), ProtocolError> {
        if !self.inputs.is_defined_locally(name) {
            return Err(ProtocolError::UnknownName {
                name: name.to_string(),
            });
        }
        self.inputs.overwrite(name, value);
        Ok(())
    }

    fn set_model(&mut self, model: SharedModel) {
        for simulation in &mut self.simulations {
            simulation.set_model(model.clone());
        }
        self.model = Some(model);
    }

    fn initialise_library(&mut self) -> Result<(), ProtocolError> {
        self.library.clear();
        for (name, value) in &self.library_definitions {
            let value = value.evaluate(&self.library)?;
            self.library.define(name.clone(), value)?;
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), ProtocolError> {
        info!("Running experiment {}", self.name);
        self.outputs.clear();
        self.post.clear();
        self.states.borrow_mut().clear();
        for simulation in &self.simulations {
            if let Some(prefix) = simulation.prefix() {
                self.library.set_delegatee(prefix, None);
            }
        }

        self.initialise_library()?;
        self.run_simulations()?;
        self.run_post_processing()?;
        self.select_outputs()?;
        info!("Experiment {} finished", self.name);
        Ok(())
    }

    fn outputs(&self) -> &Environment {
        &self.outputs
    }

    fn set_output_folder(&mut self, folder: &Path) {
        self.config.output_folder = Some(folder.to_path_buf());
    }
}

impl std::fmt::Debug for Experiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Experiment")
            .field("name", &self.name)
            .field("simulations", &self.simulations)
            .field("outputs", &self.output_specs)
            .finish()
    }
}
