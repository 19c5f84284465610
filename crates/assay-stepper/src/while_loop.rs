//! Loops that run until a condition fails.

use assay_core::{BoxedExpression, Environment, Expression, ProtocolError};

/// Initial guess at the number of iterations of a while loop.
pub const WHILE_ESTIMATE_SEED: usize = 1000;

/// How much the guess grows whenever the loop reaches it.
pub const WHILE_ESTIMATE_INCREMENT: usize = 1000;

/// Counts iterations while `condition` holds.
///
/// The point count is only an estimate until the condition fails. The
/// estimate always exceeds the number of completed steps while the loop
/// is running, so outputs sized by it always have room for the current
/// iteration.
#[derive(Debug)]
pub struct WhileRange {
    condition: BoxedExpression,
    estimate: usize,
    finished: bool,
}

impl WhileRange {
    /// Wrap the loop condition.
    pub fn new(condition: BoxedExpression) -> Self {
        Self {
            condition,
            estimate: WHILE_ESTIMATE_SEED,
            finished: false,
        }
    }

    /// Current estimate of the number of points; exact once finished.
    pub fn estimate(&self) -> usize {
        self.estimate
    }

    /// True once the condition has failed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn reset(&mut self) {
        self.estimate = WHILE_ESTIMATE_SEED;
        self.finished = false;
    }

    /// Evaluate the condition after step `count` has been bound.
    pub(crate) fn check(
        &mut self,
        count: usize,
        env: Option<&Environment>,
    ) -> Result<(), ProtocolError> {
        let env = env.ok_or_else(|| {
            ProtocolError::definition("A while loop needs an environment before it can run.")
        })?;
        let holds = self
            .condition
            .evaluate(env)?
            .expect_number("A while loop condition must evaluate to a number.")?
            != 0.0;
        if !holds {
            self.finished = true;
            self.estimate = count;
        } else if count >= self.estimate {
            self.estimate += WHILE_ESTIMATE_INCREMENT;
        }
        Ok(())
    }
}
