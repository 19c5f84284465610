//! Expressions evaluated against an [`Environment`].
//!
//! The engine only needs the [`Expression`] trait. [`Expr`] is a small
//! expression tree covering what loop bounds, loop conditions and variable
//! overwrites typically use; [`FnExpr`] adapts a closure.

use std::fmt;

use assay_array::{NdArray, Range};

use crate::env::Environment;
use crate::error::ProtocolError;
use crate::value::Value;

/// Something that can be evaluated to a [`Value`].
pub trait Expression: fmt::Debug {
    /// Evaluate in `env`.
    fn evaluate(&self, env: &Environment) -> Result<Value, ProtocolError>;
}

/// Owned, type-erased expression.
pub type BoxedExpression = Box<dyn Expression>;

// ── Expr ────────────────────────────────────────────────────────

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Logical not: 1 if the operand is zero, else 0.
    Not,
}

/// Binary operators. Comparisons and logic yield 1 or 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
    /// `a ^ b`
    Pow,
    /// `a < b`
    Lt,
    /// `a <= b`
    Le,
    /// `a > b`
    Gt,
    /// `a >= b`
    Ge,
    /// `a == b`
    Eq,
    /// `a != b`
    Neq,
    /// Both non-zero. Short-circuits.
    And,
    /// Either non-zero. Short-circuits.
    Or,
    /// The smaller operand.
    Min,
    /// The larger operand.
    Max,
}

impl BinaryOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        let truth = |c: bool| if c { 1.0 } else { 0.0 };
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Pow => a.powf(b),
            Self::Lt => truth(a < b),
            Self::Le => truth(a <= b),
            Self::Gt => truth(a > b),
            Self::Ge => truth(a >= b),
            Self::Eq => truth(a == b),
            Self::Neq => truth(a != b),
            Self::And => truth(a != 0.0 && b != 0.0),
            Self::Or => truth(a != 0.0 || b != 0.0),
            Self::Min => a.min(b),
            Self::Max => a.max(b),
        }
    }
}

/// A small expression tree.
#[derive(Clone, Debug)]
pub enum Expr {
    /// A literal real.
    Number(f64),
    /// A (possibly prefix-qualified) name.
    Name(String),
    /// A unary operation on a real.
    Unary(UnaryOp, Box<Expr>),
    /// A binary operation on two reals.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `if cond then a else b`; only the chosen branch is evaluated.
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    /// A 1-d array literal; every element must evaluate to a real.
    Array(Vec<Expr>),
    /// A view of an array-valued expression.
    View(Box<Expr>, Vec<Range>),
}

impl Expr {
    /// A literal.
    pub fn num(value: f64) -> Self {
        Self::Number(value)
    }

    /// A name reference.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// `op(lhs, rhs)`.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// `self + rhs`
    pub fn plus(self, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Add, self, rhs)
    }

    /// `self - rhs`
    pub fn minus(self, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Sub, self, rhs)
    }

    /// `self * rhs`
    pub fn times(self, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Mul, self, rhs)
    }

    /// `self < rhs`
    pub fn lt(self, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Lt, self, rhs)
    }

    /// `self > rhs`
    pub fn gt(self, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Gt, self, rhs)
    }

    /// `self[ranges]`
    pub fn view(self, ranges: Vec<Range>) -> Self {
        Self::View(Box::new(self), ranges)
    }

    fn number(&self, env: &Environment) -> Result<f64, ProtocolError> {
        let value = self.evaluate(env)?;
        value.as_number().ok_or_else(|| {
            ProtocolError::evaluation(format!(
                "operand {self:?} must evaluate to a real number, not an {}",
                value.kind_name()
            ))
        })
    }
}

impl Expression for Expr {
    fn evaluate(&self, env: &Environment) -> Result<Value, ProtocolError> {
        match self {
            Self::Number(v) => Ok(Value::Number(*v)),
            Self::Name(name) => env.lookup(name),
            Self::Unary(op, operand) => {
                let v = operand.number(env)?;
                Ok(Value::Number(match op {
                    UnaryOp::Neg => -v,
                    UnaryOp::Not => {
                        if v == 0.0 {
                            1.0
                        } else {
                            0.0
                        }
                    }
                }))
            }
            Self::Binary(op @ (BinaryOp::And | BinaryOp::Or), lhs, rhs) => {
                let a = lhs.number(env)?;
                let decided = match op {
                    BinaryOp::And => a == 0.0,
                    _ => a != 0.0,
                };
                if decided {
                    return Ok(Value::Number(if a != 0.0 { 1.0 } else { 0.0 }));
                }
                Ok(Value::Number(op.apply(a, rhs.number(env)?)))
            }
            Self::Binary(op, lhs, rhs) => {
                let a = lhs.number(env)?;
                let b = rhs.number(env)?;
                Ok(Value::Number(op.apply(a, b)))
            }
            Self::If(cond, then, otherwise) => {
                if cond.number(env)? != 0.0 {
                    then.evaluate(env)
                } else {
                    otherwise.evaluate(env)
                }
            }
            Self::Array(items) => {
                let data = items
                    .iter()
                    .map(|item| item.number(env))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(NdArray::from_vec(&[data.len()], data)?))
            }
            Self::View(target, ranges) => match target.evaluate(env)? {
                Value::Array(array) => Ok(Value::Array(array.view(ranges)?)),
                Value::Number(_) => Err(ProtocolError::evaluation(format!(
                    "only arrays can be viewed, but {target:?} is a number"
                ))),
            },
        }
    }
}

// ── FnExpr ──────────────────────────────────────────────────────

/// An expression backed by a closure.
pub struct FnExpr<F> {
    label: String,
    f: F,
}

impl<F> FnExpr<F>
where
    F: Fn(&Environment) -> Result<Value, ProtocolError>,
{
    /// Wrap `f`; `label` is what `Debug` shows.
    pub fn new(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }
}

impl<F> fmt::Debug for FnExpr<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnExpr({})", self.label)
    }
}

impl<F> Expression for FnExpr<F>
where
    F: Fn(&Environment) -> Result<Value, ProtocolError>,
{
    fn evaluate(&self, env: &Environment) -> Result<Value, ProtocolError> {
        (self.f)(env)
    }
}
