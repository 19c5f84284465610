//! Points derived from other loop values.

use assay_core::{BoxedExpression, Environment, Expression, ProtocolError};

/// A value computed by an expression on every reset and step.
///
/// Its length is never known, so it can only ride along inside a
/// multiple stepper whose first member controls the loop.
#[derive(Debug)]
pub struct FunctionalRange {
    expression: BoxedExpression,
}

impl FunctionalRange {
    /// Wrap the defining expression.
    pub fn new(expression: BoxedExpression) -> Self {
        Self { expression }
    }

    pub(crate) fn evaluate(&self, env: Option<&Environment>) -> Result<f64, ProtocolError> {
        let env = env.ok_or_else(|| {
            ProtocolError::definition("A functional stepper needs an environment before it can run.")
        })?;
        self.expression
            .evaluate(env)?
            .expect_number("The functionalRange definition must evaluate to a real number.")
    }
}
