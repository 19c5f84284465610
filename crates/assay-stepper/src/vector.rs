//! An explicit list of points.

use assay_core::{BoxedExpression, Environment, Expression, ProtocolError, Value};

const EMPTY: &str = "A VectorStepper must be given a non-empty vector.";

/// Points taken from a list, literal or computed once at initialisation.
#[derive(Debug)]
pub struct VectorRange {
    values: Vec<f64>,
    sources: Vec<BoxedExpression>,
    ready: bool,
}

impl VectorRange {
    /// A literal, non-empty list.
    pub fn new(values: Vec<f64>) -> Result<Self, ProtocolError> {
        if values.is_empty() {
            return Err(ProtocolError::definition(EMPTY));
        }
        Ok(Self {
            values,
            sources: Vec::new(),
            ready: true,
        })
    }

    /// A list computed from expressions; each may yield a number or a 1-d
    /// array, and arrays are flattened into the list.
    pub fn from_expressions(sources: Vec<BoxedExpression>) -> Result<Self, ProtocolError> {
        if sources.is_empty() {
            return Err(ProtocolError::definition(EMPTY));
        }
        Ok(Self {
            values: Vec::new(),
            sources,
            ready: false,
        })
    }

    pub(crate) fn initialise(&mut self, env: Option<&Environment>) -> Result<(), ProtocolError> {
        if self.sources.is_empty() {
            return Ok(());
        }
        let env = env.ok_or_else(|| {
            ProtocolError::definition("A vector stepper with computed values needs an environment.")
        })?;
        let mut values = Vec::new();
        for source in &self.sources {
            match source.evaluate(env)? {
                Value::Number(v) => values.push(v),
                Value::Array(a) if a.ndim() <= 1 => values.extend(a.to_vec()),
                Value::Array(a) => {
                    return Err(ProtocolError::evaluation(format!(
                        "A vector stepper value must be a number or a 1-d array, not a {}-d array.",
                        a.ndim()
                    )))
                }
            }
        }
        if values.is_empty() {
            return Err(ProtocolError::definition(EMPTY));
        }
        self.values = values;
        self.ready = true;
        Ok(())
    }

    /// Number of points, once the list is known.
    pub fn num_points(&self) -> Option<usize> {
        self.ready.then_some(self.values.len())
    }

    /// The value at iteration `step`; NaN past the end.
    pub(crate) fn point(&self, step: usize) -> f64 {
        self.values.get(step).copied().unwrap_or(f64::NAN)
    }
}
