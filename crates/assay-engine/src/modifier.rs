//! Actions applied to the model at loop boundaries.
//!
//! A [`Modifier`] pairs an [`ApplyWhen`] timing with a [`ModifierAction`].
//! The simulation node owning a [`ModifierCollection`] calls
//! [`apply`](ModifierCollection::apply) at the start of every iteration and
//! [`apply_at_end`](ModifierCollection::apply_at_end) once after its loop.

use assay_core::{BoxedExpression, Environment, Locate, Location, Model, ProtocolError};
use log::debug;

use crate::state::SharedStateCollection;

/// When a modifier acts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyWhen {
    /// At the start of the first iteration only.
    AtStartOnly,
    /// At the start of every iteration.
    EveryLoop,
    /// Once, after the loop finishes.
    AtEnd,
}

/// What a modifier does.
#[derive(Debug)]
pub enum ModifierAction {
    /// Restore a saved checkpoint, or the initial conditions if unnamed.
    ResetState {
        /// Checkpoint to restore; `None` means the initial conditions.
        state_name: Option<String>,
        /// Where checkpoints live.
        states: SharedStateCollection,
    },
    /// Save the current state vector as a checkpoint.
    SaveState {
        /// Checkpoint name.
        state_name: String,
        /// Where checkpoints live.
        states: SharedStateCollection,
    },
    /// Overwrite a model variable with the value of an expression.
    SetVariable {
        /// The model variable to overwrite.
        variable: String,
        /// Evaluated in the owning node's environment.
        value: BoxedExpression,
    },
}

/// A timed action on the model.
#[derive(Debug)]
pub struct Modifier {
    when: ApplyWhen,
    action: ModifierAction,
    location: Option<Location>,
}

impl Modifier {
    /// Reset to the checkpoint `state_name`, or to the initial conditions.
    pub fn reset(when: ApplyWhen, state_name: Option<&str>, states: SharedStateCollection) -> Self {
        Self::new(
            when,
            ModifierAction::ResetState {
                state_name: state_name.map(str::to_string),
                states,
            },
        )
    }

    /// Save the state vector under `state_name`.
    pub fn save(when: ApplyWhen, state_name: &str, states: SharedStateCollection) -> Self {
        Self::new(
            when,
            ModifierAction::SaveState {
                state_name: state_name.to_string(),
                states,
            },
        )
    }

    /// Overwrite `variable` with `value`.
    pub fn set_variable(when: ApplyWhen, variable: &str, value: BoxedExpression) -> Self {
        Self::new(
            when,
            ModifierAction::SetVariable {
                variable: variable.to_string(),
                value,
            },
        )
    }

    /// Build from parts.
    pub fn new(when: ApplyWhen, action: ModifierAction) -> Self {
        Self {
            when,
            action,
            location: None,
        }
    }

    /// Tag errors raised by this modifier with `location`.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// When this modifier acts.
    pub fn when(&self) -> ApplyWhen {
        self.when
    }

    /// What this modifier does.
    pub fn action(&self) -> &ModifierAction {
        &self.action
    }

    /// True for state resets.
    pub fn is_reset(&self) -> bool {
        matches!(self.action, ModifierAction::ResetState { .. })
    }

    /// The checkpoint this modifier resets to or saves, if any.
    pub fn state_name(&self) -> Option<&str> {
        match &self.action {
            ModifierAction::ResetState { state_name, .. } => state_name.as_deref(),
            ModifierAction::SaveState { state_name, .. } => Some(state_name),
            ModifierAction::SetVariable { .. } => None,
        }
    }

    /// Perform the action now, regardless of timing.
    pub fn apply(&self, model: &mut dyn Model, env: &Environment) -> Result<(), ProtocolError> {
        self.try_apply(model, env).at(self.location.as_ref())
    }

    fn try_apply(&self, model: &mut dyn Model, env: &Environment) -> Result<(), ProtocolError> {
        match &self.action {
            ModifierAction::ResetState {
                state_name: None, ..
            } => {
                debug!("Resetting model to initial conditions");
                model.reset_to_initial_conditions();
            }
            ModifierAction::ResetState {
                state_name: Some(name),
                states,
            } => {
                debug!("Resetting model to saved state {name}");
                let states = states.borrow();
                let state = states
                    .get(name)
                    .ok_or_else(|| ProtocolError::MissingState { name: name.clone() })?;
                model.set_state_variables(state)?;
            }
            ModifierAction::SaveState { state_name, states } => {
                debug!("Saving model state as {state_name}");
                states
                    .borrow_mut()
                    .save(state_name.clone(), model.state_variables());
            }
            ModifierAction::SetVariable { variable, value } => {
                let new_value = value.evaluate(env)?.expect_number(
                    "The value computed by a setVariable modifier must be a real number.",
                )?;
                let old_value =
                    model
                        .variable(variable)
                        .ok_or_else(|| ProtocolError::UnknownName {
                            name: variable.clone(),
                        })?;
                debug!("Setting {variable} from {old_value} to {new_value}");
                model.set_variable(variable, new_value)?;
                if old_value != new_value {
                    model.invalidate_cache();
                }
            }
        }
        Ok(())
    }
}

/// The modifiers owned by one simulation node, in declaration order.
#[derive(Debug, Default)]
pub struct ModifierCollection {
    modifiers: Vec<Modifier>,
}

impl ModifierCollection {
    /// An empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a modifier.
    pub fn push(&mut self, modifier: Modifier) {
        self.modifiers.push(modifier);
    }

    /// The modifiers, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Modifier> {
        self.modifiers.iter()
    }

    /// True if there are no modifiers.
    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    /// Number of modifiers.
    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    /// Iteration-start pass: `EveryLoop` modifiers always act,
    /// `AtStartOnly` ones only when `output_number` is 0.
    pub fn apply(
        &self,
        model: &mut dyn Model,
        env: &Environment,
        output_number: usize,
    ) -> Result<(), ProtocolError> {
        for modifier in &self.modifiers {
            let due = match modifier.when {
                ApplyWhen::AtStartOnly => output_number == 0,
                ApplyWhen::EveryLoop => true,
                ApplyWhen::AtEnd => false,
            };
            if due {
                modifier.apply(model, env)?;
            }
        }
        Ok(())
    }

    /// Loop-end pass: only `AtEnd` modifiers act.
    pub fn apply_at_end(
        &self,
        model: &mut dyn Model,
        env: &Environment,
    ) -> Result<(), ProtocolError> {
        for modifier in self.modifiers.iter().filter(|m| m.when == ApplyWhen::AtEnd) {
            modifier.apply(model, env)?;
        }
        Ok(())
    }
}

impl FromIterator<Modifier> for ModifierCollection {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        Self {
            modifiers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateCollection;
    use assay_core::{Expr, Value};
    use assay_test_utils::CounterModel;

    #[test]
    fn save_then_reset_restores_checkpoint() {
        let states = StateCollection::shared();
        let env = Environment::new();
        let mut model = CounterModel::new();
        model.solve_until(1.0).unwrap();
        Modifier::save(ApplyWhen::AtEnd, "one", states.clone())
            .apply(&mut model, &env)
            .unwrap();
        model.solve_until(2.0).unwrap();
        assert_eq!(model.count(), 2.0);
        Modifier::reset(ApplyWhen::AtEnd, Some("one"), states.clone())
            .apply(&mut model, &env)
            .unwrap();
        assert_eq!(model.count(), 1.0);
        assert_eq!(states.borrow().get("one"), Some(&[1.0][..]));
    }

    #[test]
    fn unnamed_reset_restores_initial_conditions() {
        let mut model = CounterModel::new().with_initial_count(5.0);
        let probe = model.probe();
        model.solve_until(1.0).unwrap();
        Modifier::reset(ApplyWhen::EveryLoop, None, StateCollection::shared())
            .apply(&mut model, &Environment::new())
            .unwrap();
        assert_eq!(model.count(), 5.0);
        assert_eq!(probe.resets(), 1);
    }

    #[test]
    fn reset_to_unsaved_state_fails() {
        let mut model = CounterModel::new();
        let reset = Modifier::reset(ApplyWhen::EveryLoop, Some("nope"), StateCollection::shared());
        let err = reset
            .apply(&mut model, &Environment::new())
            .unwrap_err();
        assert_eq!(err, ProtocolError::MissingState { name: "nope".into() });
    }

    #[test]
    fn set_variable_invalidates_only_on_change() {
        let env = Environment::new();
        env.define("rate", Value::Number(3.0)).unwrap();
        let mut model = CounterModel::new();
        let probe = model.probe();
        let rate = Box::new(Expr::name("rate"));
        let modifier = Modifier::set_variable(ApplyWhen::EveryLoop, "increment", rate);
        modifier.apply(&mut model, &env).unwrap();
        modifier.apply(&mut model, &env).unwrap();
        assert_eq!(model.variable("increment"), Some(3.0));
        assert_eq!(probe.invalidations(), 1);
    }

    #[test]
    fn set_variable_rejects_unknown_names_and_arrays() {
        let env = Environment::new();
        let mut model = CounterModel::new();
        let one = Box::new(Expr::num(1.0));
        let unknown = Modifier::set_variable(ApplyWhen::EveryLoop, "missing", one);
        assert!(matches!(
            unknown.apply(&mut model, &env),
            Err(ProtocolError::UnknownName { .. })
        ));
        let array = Expr::Array(vec![Expr::num(1.0), Expr::num(2.0)]);
        let not_a_number = Modifier::set_variable(ApplyWhen::EveryLoop, "count", Box::new(array));
        assert!(matches!(
            not_a_number.apply(&mut model, &env),
            Err(ProtocolError::Evaluation { .. })
        ));
    }

    #[test]
    fn collection_applies_by_timing() {
        let states = StateCollection::shared();
        let env = Environment::new();
        let collection: ModifierCollection = [
            Modifier::save(ApplyWhen::AtStartOnly, "start", states.clone()),
            Modifier::save(ApplyWhen::EveryLoop, "latest", states.clone()),
            Modifier::save(ApplyWhen::AtEnd, "end", states.clone()),
        ]
        .into_iter()
        .collect();
        let mut model = CounterModel::new();

        collection.apply(&mut model, &env, 0).unwrap();
        model.solve_until(1.0).unwrap();
        collection.apply(&mut model, &env, 1).unwrap();
        assert_eq!(states.borrow().get("start"), Some(&[0.0][..]));
        assert_eq!(states.borrow().get("latest"), Some(&[1.0][..]));
        assert!(!states.borrow().contains("end"));

        model.solve_until(2.0).unwrap();
        collection.apply_at_end(&mut model, &env).unwrap();
        assert_eq!(states.borrow().get("end"), Some(&[2.0][..]));
        assert_eq!(collection.len(), 3);
    }
}
