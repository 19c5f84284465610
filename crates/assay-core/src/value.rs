//! Values produced by expressions and stored in environments.

use assay_array::{NdArray, Shape};

use crate::error::ProtocolError;

/// A protocol value: a real number or an array of reals.
#[derive(Clone, Debug)]
pub enum Value {
    /// A single real.
    Number(f64),
    /// An n-dimensional array. Cloning the value aliases the array.
    Array(NdArray<f64>),
}

impl Value {
    /// The value as a real, if it is a number or a 0-dimensional array.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Array(a) if a.ndim() == 0 => Some(a.get(&[])),
            Self::Array(_) => None,
        }
    }

    /// The value as a real, or an evaluation error with `message`.
    pub fn expect_number(&self, message: &str) -> Result<f64, ProtocolError> {
        self.as_number()
            .ok_or_else(|| ProtocolError::evaluation(message))
    }

    /// The array, if this is an array value.
    pub fn as_array(&self) -> Option<&NdArray<f64>> {
        match self {
            Self::Array(a) => Some(a),
            Self::Number(_) => None,
        }
    }

    /// The value as an array; numbers become fresh 0-dimensional arrays.
    pub fn to_array(&self) -> NdArray<f64> {
        match self {
            Self::Number(v) => NdArray::from_scalar(*v),
            Self::Array(a) => a.clone(),
        }
    }

    /// Natural shape: empty for numbers.
    pub fn shape(&self) -> Shape {
        match self {
            Self::Number(_) => Shape::new(),
            Self::Array(a) => a.shape(),
        }
    }

    /// "number" or "array", for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Array(_) => "array",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<NdArray<f64>> for Value {
    fn from(a: NdArray<f64>) -> Self {
        Self::Array(a)
    }
}
