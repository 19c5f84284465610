//! The stepper: one loop dimension of a simulation.
//!
//! A [`Stepper`] holds what every loop has (an index name, units, the
//! iteration count and the current point) and a [`StepperKind`] holding
//! what differs between loop types. Once bound to an environment with
//! [`set_environment`](Stepper::set_environment), the stepper keeps its
//! index name bound to the current point after every reset and step.

use assay_core::{BoxedExpression, Environment, Location, ProtocolError, Value};
use log::debug;

use crate::functional::FunctionalRange;
use crate::multiple::MultipleRange;
use crate::uniform::UniformRange;
use crate::vector::VectorRange;
use crate::while_loop::WhileRange;

/// The loop type and its private state.
#[derive(Debug)]
pub enum StepperKind {
    /// Evenly spaced points.
    Uniform(UniformRange),
    /// An explicit list of points.
    Vector(VectorRange),
    /// Points computed from other loop values.
    Functional(FunctionalRange),
    /// Iteration counts while a condition holds.
    While(WhileRange),
    /// Several steppers in lockstep.
    Multiple(MultipleRange),
}

/// One loop dimension.
#[derive(Debug)]
pub struct Stepper {
    name: String,
    units: String,
    location: Option<Location>,
    env: Option<Environment>,
    current_step: usize,
    value: f64,
    kind: StepperKind,
}

impl Stepper {
    fn with_kind(name: impl Into<String>, units: impl Into<String>, kind: StepperKind) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            location: None,
            env: None,
            current_step: 0,
            value: f64::NAN,
            kind,
        }
    }

    /// Evenly spaced points from `start` to `end`.
    pub fn uniform(
        name: impl Into<String>,
        units: impl Into<String>,
        start: f64,
        end: f64,
        interval: f64,
    ) -> Result<Self, ProtocolError> {
        let range = UniformRange::new(start, end, interval)?;
        let mut stepper = Self::with_kind(name, units, StepperKind::Uniform(range));
        stepper.reset()?;
        Ok(stepper)
    }

    /// Evenly spaced points whose bounds are computed at initialisation.
    pub fn uniform_from(
        name: impl Into<String>,
        units: impl Into<String>,
        start: BoxedExpression,
        end: BoxedExpression,
        interval: BoxedExpression,
    ) -> Self {
        let range = UniformRange::from_expressions(start, end, interval);
        Self::with_kind(name, units, StepperKind::Uniform(range))
    }

    /// An explicit, non-empty list of points.
    pub fn vector(
        name: impl Into<String>,
        units: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, ProtocolError> {
        let range = VectorRange::new(values)?;
        let mut stepper = Self::with_kind(name, units, StepperKind::Vector(range));
        stepper.reset()?;
        Ok(stepper)
    }

    /// A list of points computed at initialisation.
    pub fn vector_from(
        name: impl Into<String>,
        units: impl Into<String>,
        values: Vec<BoxedExpression>,
    ) -> Result<Self, ProtocolError> {
        let range = VectorRange::from_expressions(values)?;
        Ok(Self::with_kind(name, units, StepperKind::Vector(range)))
    }

    /// Points computed by `expression` from other loop values.
    pub fn functional(
        name: impl Into<String>,
        units: impl Into<String>,
        expression: BoxedExpression,
    ) -> Self {
        let range = FunctionalRange::new(expression);
        Self::with_kind(name, units, StepperKind::Functional(range))
    }

    /// Iteration counts `0, 1, ...` while `condition` holds after each step.
    pub fn while_loop(
        name: impl Into<String>,
        units: impl Into<String>,
        condition: BoxedExpression,
    ) -> Self {
        let range = WhileRange::new(condition);
        let mut stepper = Self::with_kind(name, units, StepperKind::While(range));
        stepper.value = 0.0;
        stepper
    }

    /// Members stepping in lockstep. The composite takes the first
    /// member's name and units.
    pub fn multiple(members: Vec<Stepper>) -> Result<Self, ProtocolError> {
        let range = MultipleRange::new(members)?;
        let first = range.first();
        let (name, units) = (first.name.clone(), first.units.clone());
        let value = first.value;
        let mut stepper = Self::with_kind(name, units, StepperKind::Multiple(range));
        stepper.value = value;
        Ok(stepper)
    }

    /// Tag errors raised by this stepper with `location`.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    // ── Accessors ───────────────────────────────────────────────

    /// Index name bound in the environment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Units of the points.
    pub fn units(&self) -> &str {
        &self.units
    }

    /// Where this stepper was declared.
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// The loop type.
    pub fn kind(&self) -> &StepperKind {
        &self.kind
    }

    /// The environment the index name is bound in.
    pub fn environment(&self) -> Option<&Environment> {
        self.env.as_ref()
    }

    /// Number of steps taken since the last reset.
    pub fn current_output_number(&self) -> usize {
        self.current_step
    }

    /// The current point.
    pub fn current_output_point(&self) -> f64 {
        self.value
    }

    /// Number of points: exact for fixed-length loops, an upper estimate
    /// for while loops, `None` when unknowable or not yet computed.
    pub fn number_of_output_points(&self) -> Option<usize> {
        match &self.kind {
            StepperKind::Uniform(u) => u.num_points(),
            StepperKind::Vector(v) => v.num_points(),
            StepperKind::Functional(_) => None,
            StepperKind::While(w) => Some(w.estimate()),
            StepperKind::Multiple(m) => m.first().number_of_output_points(),
        }
    }

    /// True if the point count is known before the loop completes.
    pub fn is_end_fixed(&self) -> bool {
        match &self.kind {
            StepperKind::Uniform(_) | StepperKind::Vector(_) => true,
            StepperKind::Functional(_) | StepperKind::While(_) => false,
            StepperKind::Multiple(m) => m.first().is_end_fixed(),
        }
    }

    /// True once every point has been produced.
    pub fn at_end(&self) -> bool {
        match &self.kind {
            StepperKind::Functional(_) => false,
            StepperKind::While(w) => w.is_finished(),
            StepperKind::Multiple(m) => m.first().at_end(),
            StepperKind::Uniform(_) | StepperKind::Vector(_) => {
                self.number_of_output_points() == Some(self.current_step)
            }
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Bind the index name in `env` and remember `env` for evaluation.
    pub fn set_environment(&mut self, env: Environment) -> Result<(), ProtocolError> {
        if let StepperKind::Multiple(m) = &mut self.kind {
            for member in m.members_mut() {
                member.set_environment(env.clone())?;
            }
        } else {
            env.define(self.name.clone(), Value::Number(self.value))
                .map_err(|err| err.at(self.location.as_ref()))?;
        }
        self.env = Some(env);
        Ok(())
    }

    /// Evaluate computed parameters and reset to the first point.
    pub fn initialise(&mut self) -> Result<(), ProtocolError> {
        self.try_initialise()
            .map_err(|err| err.at(self.location.as_ref()))?;
        debug!(
            "Initialised stepper {} with {:?} points",
            self.name,
            self.number_of_output_points()
        );
        Ok(())
    }

    fn try_initialise(&mut self) -> Result<(), ProtocolError> {
        let env = self.env.as_ref();
        match &mut self.kind {
            StepperKind::Uniform(u) => u.initialise(env)?,
            StepperKind::Vector(v) => v.initialise(env)?,
            StepperKind::Functional(_) | StepperKind::While(_) => {}
            StepperKind::Multiple(m) => {
                for member in m.members_mut() {
                    member.initialise()?;
                }
            }
        }
        self.reset()
    }

    /// Return to iteration 0 and the first point.
    pub fn reset(&mut self) -> Result<(), ProtocolError> {
        self.try_reset()
            .map_err(|err| err.at(self.location.as_ref()))
    }

    fn try_reset(&mut self) -> Result<(), ProtocolError> {
        self.current_step = 0;
        let env = self.env.as_ref();
        self.value = match &mut self.kind {
            StepperKind::Uniform(u) => {
                u.num_points().ok_or_else(not_initialised)?;
                u.start()
            }
            StepperKind::Vector(v) => {
                v.num_points().ok_or_else(not_initialised)?;
                v.point(0)
            }
            StepperKind::Functional(f) => f.evaluate(env)?,
            StepperKind::While(w) => {
                w.reset();
                0.0
            }
            StepperKind::Multiple(m) => {
                for member in m.members_mut() {
                    member.reset()?;
                }
                m.first().value
            }
        };
        self.bind();
        Ok(())
    }

    /// Advance one iteration and return the new point.
    ///
    /// Stepping a fixed-length loop past its end yields a meaningless
    /// point; callers check [`at_end`](Self::at_end) first.
    pub fn step(&mut self) -> Result<f64, ProtocolError> {
        self.try_step()
            .map_err(|err| err.at(self.location.as_ref()))
    }

    fn try_step(&mut self) -> Result<f64, ProtocolError> {
        if let StepperKind::Multiple(m) = &mut self.kind {
            if m.members().iter().any(Stepper::at_end) {
                return Err(ProtocolError::definition(
                    "A subsidiary range for this task has been exhausted.",
                ));
            }
            for member in m.members_mut() {
                member.step()?;
            }
            self.current_step += 1;
            self.value = m.first().value;
            return Ok(self.value);
        }

        self.current_step += 1;
        let step = self.current_step;
        let env = self.env.as_ref();
        self.value = match &self.kind {
            StepperKind::Uniform(u) => u.point(step),
            StepperKind::Vector(v) => v.point(step),
            StepperKind::Functional(f) => f.evaluate(env)?,
            StepperKind::While(_) => step as f64,
            StepperKind::Multiple(_) => unreachable!("handled above"),
        };
        self.bind();
        if let StepperKind::While(w) = &mut self.kind {
            w.check(step, self.env.as_ref())?;
        }
        Ok(self.value)
    }

    fn bind(&self) {
        if matches!(self.kind, StepperKind::Multiple(_)) {
            return;
        }
        if let Some(env) = &self.env {
            env.overwrite(self.name.clone(), Value::Number(self.value));
        }
    }
}

fn not_initialised() -> ProtocolError {
    ProtocolError::definition("A stepper with computed points must be initialised before use.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assay_core::Expr;

    fn bound(mut stepper: Stepper) -> (Stepper, Environment) {
        let env = Environment::new();
        stepper.set_environment(env.clone()).unwrap();
        stepper.initialise().unwrap();
        (stepper, env)
    }

    fn drain(stepper: &mut Stepper) -> Vec<f64> {
        let mut points = vec![stepper.current_output_point()];
        loop {
            let v = stepper.step().unwrap();
            if stepper.at_end() {
                return points;
            }
            points.push(v);
        }
    }

    #[test]
    fn uniform_binds_index_name() {
        let (mut s, env) = bound(Stepper::uniform("t", "ms", 0.0, 2.0, 1.0).unwrap());
        assert_eq!(env.lookup("t").unwrap(), Value::Number(0.0));
        s.step().unwrap();
        assert_eq!(env.lookup("t").unwrap(), Value::Number(1.0));
        assert_eq!(s.current_output_number(), 1);
    }

    #[test]
    fn vector_past_end_is_nan() {
        let mut s = Stepper::vector("x", "", vec![4.0, 2.0]).unwrap();
        assert_eq!(drain(&mut s), vec![4.0, 2.0]);
        assert!(s.current_output_point().is_nan());
    }

    #[test]
    fn vector_flattens_computed_arrays() {
        let parent = Environment::new();
        let data = assay_array::NdArray::from_vec(&[2], vec![1.0, 2.0]).unwrap();
        parent.define("a", Value::Array(data)).unwrap();
        let env = Environment::delegating_to(&parent);
        let mut s = Stepper::vector_from(
            "x",
            "",
            vec![Box::new(Expr::name("a")), Box::new(Expr::num(9.0))],
        )
        .unwrap();
        assert_eq!(s.number_of_output_points(), None);
        s.set_environment(env).unwrap();
        s.initialise().unwrap();
        assert_eq!(s.number_of_output_points(), Some(3));
        assert_eq!(drain(&mut s), vec![1.0, 2.0, 9.0]);
    }

    #[test]
    fn uninitialised_vector_cannot_reset() {
        let mut s = Stepper::vector_from("x", "", vec![Box::new(Expr::num(1.0))]).unwrap();
        assert!(s.reset().is_err());
    }

    #[test]
    fn computed_uniform_bounds() {
        let parent = Environment::new();
        parent.define("n", Value::Number(4.0)).unwrap();
        let env = Environment::delegating_to(&parent);
        let mut s = Stepper::uniform_from(
            "i",
            "",
            Box::new(Expr::num(0.0)),
            Box::new(Expr::name("n")),
            Box::new(Expr::num(1.0)),
        );
        s.set_environment(env).unwrap();
        s.initialise().unwrap();
        assert_eq!(s.number_of_output_points(), Some(5));
        assert!(s.is_end_fixed());
    }

    #[test]
    fn functional_tracks_expression() {
        let env = Environment::new();
        env.define("k", Value::Number(3.0)).unwrap();
        let mut s = Stepper::functional("y", "", Box::new(Expr::name("k").times(Expr::num(2.0))));
        s.set_environment(env.clone()).unwrap();
        s.initialise().unwrap();
        assert_eq!(s.current_output_point(), 6.0);
        assert!(!s.is_end_fixed());
        assert_eq!(s.number_of_output_points(), None);
        env.overwrite("k", Value::Number(5.0));
        assert_eq!(s.step().unwrap(), 10.0);
        assert!(!s.at_end());
    }

    #[test]
    fn functional_must_yield_number() {
        let env = Environment::new();
        let mut s = Stepper::functional("y", "", Box::new(Expr::Array(vec![Expr::num(1.0)])))
            .with_location(Location::new("p.xml:4"));
        s.set_environment(env).unwrap();
        let err = s.initialise().unwrap_err();
        assert_eq!(err.location(), Some(&Location::new("p.xml:4")));
        assert_eq!(
            err.root().to_string(),
            "The functionalRange definition must evaluate to a real number."
        );
    }

    #[test]
    fn while_condition_must_be_number() {
        let (mut s, _env) = bound(Stepper::while_loop(
            "count",
            "",
            Box::new(Expr::Array(vec![Expr::num(1.0)])),
        ));
        let err = s.step().unwrap_err();
        assert_eq!(
            err.to_string(),
            "A while loop condition must evaluate to a number."
        );
    }

    #[test]
    fn multiple_mirrors_first_member() {
        let a = Stepper::vector("a", "mV", vec![1.0, 2.0]).unwrap();
        let b = Stepper::uniform("b", "", 0.0, 4.0, 1.0).unwrap();
        let (mut s, env) = bound(Stepper::multiple(vec![a, b]).unwrap());
        assert_eq!(s.name(), "a");
        assert_eq!(s.units(), "mV");
        assert_eq!(s.number_of_output_points(), Some(2));
        assert_eq!(s.step().unwrap(), 2.0);
        assert_eq!(env.lookup("b").unwrap(), Value::Number(1.0));
        s.step().unwrap();
        assert!(s.at_end());
    }

    #[test]
    fn duplicate_member_names_are_rejected() {
        let a = Stepper::vector("x", "", vec![1.0]).unwrap();
        let b = Stepper::vector("x", "", vec![2.0]).unwrap();
        let mut s = Stepper::multiple(vec![a, b]).unwrap();
        assert!(matches!(
            s.set_environment(Environment::new()),
            Err(ProtocolError::DuplicateName { .. })
        ));
    }
}
