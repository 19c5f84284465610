//! Evenly spaced points from a start to an end.

use assay_core::{BoxedExpression, Environment, Expression, ProtocolError};

/// Absolute tolerance, relative to the range, when checking that the
/// interval divides the range.
pub const UNIFORM_TOLERANCE: f64 = 1e-10;

/// Points `start, start + interval, ..., end`.
#[derive(Debug)]
pub struct UniformRange {
    start: f64,
    end: f64,
    interval: f64,
    points: Option<usize>,
    bounds: Option<[BoxedExpression; 3]>,
}

impl UniformRange {
    /// A range with literal bounds, validated immediately.
    pub fn new(start: f64, end: f64, interval: f64) -> Result<Self, ProtocolError> {
        let points = count_points(start, end, interval)?;
        Ok(Self {
            start,
            end,
            interval,
            points: Some(points),
            bounds: None,
        })
    }

    /// A range whose bounds are evaluated when the stepper is initialised.
    pub fn from_expressions(
        start: BoxedExpression,
        end: BoxedExpression,
        interval: BoxedExpression,
    ) -> Self {
        Self {
            start: 0.0,
            end: 0.0,
            interval: 0.0,
            points: None,
            bounds: Some([start, end, interval]),
        }
    }

    pub(crate) fn initialise(&mut self, env: Option<&Environment>) -> Result<(), ProtocolError> {
        let Some([start, end, interval]) = &self.bounds else {
            return Ok(());
        };
        let env = env.ok_or_else(|| {
            ProtocolError::definition("A uniform stepper with computed bounds needs an environment.")
        })?;
        let message = "The bounds of a uniform stepper must evaluate to real numbers.";
        let start = start.evaluate(env)?.expect_number(message)?;
        let end = end.evaluate(env)?.expect_number(message)?;
        let interval = interval.evaluate(env)?.expect_number(message)?;

        self.points = Some(count_points(start, end, interval)?);
        self.start = start;
        self.end = end;
        self.interval = interval;
        Ok(())
    }

    /// Number of points, once the bounds are known.
    pub fn num_points(&self) -> Option<usize> {
        self.points
    }

    /// The first point.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// The value at iteration `step`. The final point is exactly `end`.
    pub(crate) fn point(&self, step: usize) -> f64 {
        match self.points {
            Some(n) if step + 1 == n => self.end,
            _ => self.start + self.interval * step as f64,
        }
    }
}

/// `1 + (end - start) / interval`, if the interval divides the range.
fn count_points(start: f64, end: f64, interval: f64) -> Result<usize, ProtocolError> {
    if !(start.is_finite() && end.is_finite() && interval.is_finite()) {
        return Err(ProtocolError::definition(
            "The bounds of a uniform stepper must be finite.",
        ));
    }
    let range = end - start;
    if range == 0.0 {
        return Ok(1);
    }
    if interval == 0.0 {
        return Err(ProtocolError::definition(
            "The step interval of a uniform stepper must be nonzero.",
        ));
    }
    if range * interval < 0.0 {
        return Err(ProtocolError::definition(
            "If and only if endPoint is before startPoint, stepInterval must be negative.",
        ));
    }
    let steps = (range / interval + 0.5).floor();
    let tolerance = UNIFORM_TOLERANCE * range.abs().max(1.0);
    if (steps * interval - range).abs() > tolerance {
        return Err(ProtocolError::definition(
            "The step interval must divide the range.",
        ));
    }
    Ok(steps as usize + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_points_in_both_directions() {
        assert_eq!(count_points(0.0, 10.0, 2.5).unwrap(), 5);
        assert_eq!(count_points(1.0, -1.0, -0.5).unwrap(), 5);
        assert_eq!(count_points(3.0, 3.0, 0.0).unwrap(), 1);
        assert_eq!(count_points(0.0, 1.0, 0.1).unwrap(), 11);
    }

    #[test]
    fn rejects_sign_mismatch_and_non_divisor() {
        assert!(count_points(0.0, 1.0, -0.1).is_err());
        assert!(count_points(0.0, 1.0, 0.3).is_err());
        assert!(count_points(0.0, 1.0, 0.0).is_err());
        assert!(count_points(0.0, f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn final_point_is_exact() {
        let r = UniformRange::new(0.0, 1.0, 0.1).unwrap();
        assert_eq!(r.point(10), 1.0);
        assert!((r.point(3) - 0.3).abs() < 1e-12);
    }
}
