//! The recursive simulation tree.
//!
//! A [`Simulation`] is one node: its [`SimulationKind`] says how it runs,
//! and every node carries a modifier collection, an optional output
//! prefix and its own environment. Child environments delegate to their
//! parent's, so inner expressions see every enclosing loop variable.
//!
//! Running a node writes outputs into a results environment. Each output
//! is an array indexed first by the current iteration of every enclosing
//! loop (outermost first), then by the output's natural shape.
//!
//! # Node kinds
//!
//! - **Timecourse**: advances the model across its stepper's points,
//!   recording model outputs at each point.
//! - **Nested**: runs its child once per point of its stepper.
//! - **Combined**: runs each child as an independent simulation and files
//!   the prefixed children's results under `prefix:name`.
//! - **SubProtocol**: runs a whole protocol and keeps selected outputs.

mod combined;
mod loops;
mod nested;
mod results;
mod sub_protocol;
mod timecourse;

use std::fmt;
use std::path::{Path, PathBuf};

use assay_core::{
    BoxedExpression, Environment, Locate, Location, ProtocolError, ProtocolHost, SharedModel,
};
use assay_stepper::{Stepper, StepperKind};
use log::debug;

use crate::modifier::ModifierCollection;
use crate::parallel::Partition;

pub use loops::{LoopFrame, LoopStack};

/// Order in which a combined node runs its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombinedMode {
    /// Declaration order.
    Sequential,
    /// Children are declared independent. They run in reverse
    /// declaration order so hidden ordering dependencies show up.
    Parallel,
}

/// How a node runs, and the data only that kind needs.
pub enum SimulationKind {
    /// Advance the model along a stepper, recording outputs at each point.
    Timecourse {
        /// Drives the model's free variable.
        stepper: Stepper,
    },
    /// Run a child once per stepper point.
    Nested {
        /// The loop at this level.
        stepper: Stepper,
        /// The loop body.
        child: Box<Simulation>,
    },
    /// Run several independent simulations.
    Combined {
        /// Scheduling order.
        mode: CombinedMode,
        /// The simulations, in declaration order.
        children: Vec<Simulation>,
    },
    /// Run a whole protocol and keep selected outputs.
    SubProtocol {
        /// The embedded protocol.
        host: Box<dyn ProtocolHost>,
        /// Input bindings, evaluated in this node's environment.
        inputs: Vec<(String, BoxedExpression)>,
        /// Names of the protocol outputs to keep.
        outputs: Vec<String>,
    },
}

impl SimulationKind {
    /// Short name for logs and debugging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Timecourse { .. } => "timecourse",
            Self::Nested { .. } => "nested",
            Self::Combined { .. } => "combined",
            Self::SubProtocol { .. } => "sub-protocol",
        }
    }
}

/// One node of a simulation tree.
pub struct Simulation {
    kind: SimulationKind,
    modifiers: ModifierCollection,
    prefix: Option<String>,
    env: Environment,
    results: Environment,
    progress: Environment,
    model: Option<SharedModel>,
    output_folder: Option<PathBuf>,
    location: Option<Location>,
}

/// What a node's run function needs besides its kind-specific data.
pub(crate) struct NodeContext<'a> {
    pub(crate) modifiers: &'a ModifierCollection,
    pub(crate) env: &'a Environment,
    pub(crate) progress: &'a Environment,
    pub(crate) model: Option<&'a SharedModel>,
    pub(crate) prefix: Option<&'a str>,
    pub(crate) output_folder: Option<&'a Path>,
}

impl NodeContext<'_> {
    pub(crate) fn model(&self) -> Result<&SharedModel, ProtocolError> {
        self.model
            .ok_or_else(|| ProtocolError::definition("No model has been set for this simulation."))
    }

    /// Run the iteration-start modifier pass, if there is anything to run.
    pub(crate) fn apply_modifiers(&self, output_number: usize) -> Result<(), ProtocolError> {
        if self.modifiers.is_empty() {
            return Ok(());
        }
        let model = self.model()?;
        self.modifiers
            .apply(&mut *model.borrow_mut(), self.env, output_number)
    }

    /// Run the loop-end modifier pass.
    pub(crate) fn apply_modifiers_at_end(&self) -> Result<(), ProtocolError> {
        if self.modifiers.is_empty() {
            return Ok(());
        }
        let model = self.model()?;
        self.modifiers.apply_at_end(&mut *model.borrow_mut(), self.env)
    }

    pub(crate) fn label(&self) -> &str {
        self.prefix.unwrap_or("<anonymous>")
    }
}

impl Simulation {
    fn with_kind(kind: SimulationKind, env: Environment) -> Self {
        Self {
            kind,
            modifiers: ModifierCollection::new(),
            prefix: None,
            env,
            results: Environment::new(),
            progress: Environment::new(),
            model: None,
            output_folder: None,
            location: None,
        }
    }

    /// A leaf advancing the model along `stepper`.
    pub fn timecourse(mut stepper: Stepper) -> Result<Self, ProtocolError> {
        check_loop_stepper(&stepper)?;
        let env = Environment::new();
        stepper.set_environment(env.clone())?;
        Ok(Self::with_kind(SimulationKind::Timecourse { stepper }, env))
    }

    /// A loop running `child` once per point of `stepper`.
    pub fn nested(mut stepper: Stepper, child: Simulation) -> Result<Self, ProtocolError> {
        check_loop_stepper(&stepper)?;
        if child.has_unbounded_loop() {
            return Err(ProtocolError::definition(
                "A while loop may only be the outermost loop for a simulation.",
            )
            .at(child.location.as_ref()));
        }
        let env = Environment::new();
        stepper.set_environment(env.clone())?;
        child.env.set_delegatee("", Some(env.clone()));
        let kind = SimulationKind::Nested {
            stepper,
            child: Box::new(child),
        };
        Ok(Self::with_kind(kind, env))
    }

    /// Independent simulations run one after another.
    pub fn combined(mode: CombinedMode, children: Vec<Simulation>) -> Self {
        let env = Environment::new();
        for child in &children {
            child.env.set_delegatee("", Some(env.clone()));
        }
        Self::with_kind(SimulationKind::Combined { mode, children }, env)
    }

    /// A whole protocol whose selected `outputs` become this node's results.
    pub fn sub_protocol(
        host: Box<dyn ProtocolHost>,
        inputs: Vec<(String, BoxedExpression)>,
        outputs: Vec<String>,
    ) -> Result<Self, ProtocolError> {
        if outputs.is_empty() {
            return Err(ProtocolError::definition(
                "No results are being retained from the nested protocol.",
            ));
        }
        let kind = SimulationKind::SubProtocol {
            host,
            inputs,
            outputs,
        };
        Ok(Self::with_kind(kind, Environment::new()))
    }

    /// Name this node's results; `prefix:name` then refers to them.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if let Some(old) = &self.prefix {
            self.env.set_delegatee(old, None);
        }
        self.env.set_delegatee(&prefix, Some(self.progress.clone()));
        self.prefix = Some(prefix);
        self
    }

    /// Attach modifiers applied around this node's iterations.
    pub fn with_modifiers(mut self, modifiers: ModifierCollection) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Tag errors raised while running this node with `location`.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    // ── Accessors ───────────────────────────────────────────────

    /// How this node runs.
    pub fn kind(&self) -> &SimulationKind {
        &self.kind
    }

    /// The loop driving this node, for timecourse and nested nodes.
    pub fn stepper(&self) -> Option<&Stepper> {
        match &self.kind {
            SimulationKind::Timecourse { stepper } | SimulationKind::Nested { stepper, .. } => {
                Some(stepper)
            }
            _ => None,
        }
    }

    /// The modifiers of this node.
    pub fn modifiers(&self) -> &ModifierCollection {
        &self.modifiers
    }

    /// The output prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// This node's environment. Its default delegatee is the parent's.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Results of the last top-level run of this node.
    pub fn results(&self) -> &Environment {
        &self.results
    }

    /// Where this node was declared.
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// The output folder, if one has been set.
    pub fn output_folder(&self) -> Option<&Path> {
        self.output_folder.as_deref()
    }

    // ── Mutators ────────────────────────────────────────────────

    /// Use `model` in this node and every descendant.
    pub fn set_model(&mut self, model: SharedModel) {
        match &mut self.kind {
            SimulationKind::Timecourse { .. } => {}
            SimulationKind::Nested { child, .. } => child.set_model(model.clone()),
            SimulationKind::Combined { children, .. } => {
                for child in children {
                    child.set_model(model.clone());
                }
            }
            SimulationKind::SubProtocol { host, .. } => host.set_model(model.clone()),
        }
        self.model = Some(model);
    }

    /// Route per-run model files under `folder`.
    ///
    /// Nested nodes give each iteration its own `run_{n}` subfolder.
    pub fn set_output_folder(&mut self, folder: &Path) {
        match &mut self.kind {
            SimulationKind::Timecourse { .. } | SimulationKind::Nested { .. } => {}
            SimulationKind::Combined { children, .. } => {
                for child in children {
                    child.set_output_folder(folder);
                }
            }
            SimulationKind::SubProtocol { host, .. } => host.set_output_folder(folder),
        }
        self.output_folder = Some(folder.to_path_buf());
    }

    /// Evaluate computed stepper parameters along the loop chain.
    pub fn initialise_steppers(&mut self) -> Result<(), ProtocolError> {
        let initialised = match &mut self.kind {
            SimulationKind::Timecourse { stepper } => stepper.initialise(),
            SimulationKind::Nested { stepper, child } => {
                stepper.initialise()?;
                child.initialise_steppers()
            }
            SimulationKind::Combined { .. } | SimulationKind::SubProtocol { .. } => Ok(()),
        };
        initialised.at(self.location.as_ref())
    }

    // ── Running ─────────────────────────────────────────────────

    /// Run this node as a top-level simulation.
    ///
    /// Clears earlier results, initialises the steppers, and runs with no
    /// enclosing loops. With a `partition`, iterations of the partitioned
    /// loop owned by other workers are skipped and their results stay zero.
    pub fn run(&mut self, partition: Option<&dyn Partition>) -> Result<Environment, ProtocolError> {
        self.results.clear();
        self.progress.clear();
        self.initialise_steppers()?;
        debug!(
            "Running {} simulation {}",
            self.kind.label(),
            self.prefix.as_deref().unwrap_or("<anonymous>")
        );
        let results = self.results.clone();
        let mut loops = LoopStack::new(partition);
        self.run_node(&mut loops, &results)?;
        Ok(results)
    }

    pub(crate) fn run_node(
        &mut self,
        loops: &mut LoopStack<'_>,
        results: &Environment,
    ) -> Result<(), ProtocolError> {
        let Simulation {
            kind,
            modifiers,
            prefix,
            env,
            progress,
            model,
            output_folder,
            location,
            ..
        } = self;
        let ctx = NodeContext {
            modifiers,
            env,
            progress,
            model: model.as_ref(),
            prefix: prefix.as_deref(),
            output_folder: output_folder.as_deref(),
        };
        let outcome = match kind {
            SimulationKind::Timecourse { stepper } => {
                timecourse::run(&ctx, stepper, loops, results)
            }
            SimulationKind::Nested { stepper, child } => {
                nested::run(&ctx, stepper, child, loops, results)
            }
            SimulationKind::Combined { mode, children } => {
                combined::run(&ctx, *mode, children, loops, results)
            }
            SimulationKind::SubProtocol {
                host,
                inputs,
                outputs,
            } => sub_protocol::run(&ctx, host.as_mut(), inputs, outputs, loops, results),
        };
        outcome.at(location.as_ref())
    }

    /// True if this node's own loop chain contains a loop of unknown length.
    fn has_unbounded_loop(&self) -> bool {
        match &self.kind {
            SimulationKind::Timecourse { stepper } => !stepper.is_end_fixed(),
            SimulationKind::Nested { stepper, child } => {
                !stepper.is_end_fixed() || child.has_unbounded_loop()
            }
            SimulationKind::Combined { .. } | SimulationKind::SubProtocol { .. } => false,
        }
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Simulation");
        s.field("kind", &self.kind.label())
            .field("prefix", &self.prefix)
            .field("modifiers", &self.modifiers.len());
        match &self.kind {
            SimulationKind::Timecourse { stepper } => s.field("stepper", &stepper.name()),
            SimulationKind::Nested { stepper, child } => {
                s.field("stepper", &stepper.name()).field("child", child)
            }
            SimulationKind::Combined { children, .. } => s.field("children", children),
            SimulationKind::SubProtocol { outputs, .. } => s.field("outputs", outputs),
        };
        s.finish()
    }
}

/// Loops must be able to end by themselves.
fn check_loop_stepper(stepper: &Stepper) -> Result<(), ProtocolError> {
    fn leads_with_functional(stepper: &Stepper) -> bool {
        match stepper.kind() {
            StepperKind::Functional(_) => true,
            StepperKind::Multiple(m) => m.members().first().is_some_and(leads_with_functional),
            _ => false,
        }
    }
    if leads_with_functional(stepper) {
        return Err(ProtocolError::definition(
            "A functional range may only be used inside a multiple stepper.",
        )
        .at(stepper.location()));
    }
    Ok(())
}
