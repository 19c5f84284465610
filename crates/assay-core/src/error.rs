//! Error types for the Assay experiment engine.
//!
//! Errors fall into the classes reported by [`ProtocolError::kind`]:
//! definition errors (malformed constructs, raised at construction or
//! initialisation), evaluation errors (an expression produced the wrong
//! kind of value, or a name is missing), model errors (the external model
//! failed), and I/O errors. Output shape contract violations are not
//! errors; they panic.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use assay_array::ArrayError;

use crate::location::Location;

// ── ModelError ──────────────────────────────────────────────────

/// Errors reported by a [`Model`](crate::Model) implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelError {
    /// Advancing the model to the requested point failed.
    SolveFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// Computing the model's outputs failed.
    OutputsFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The model has no variable with this name.
    UnknownVariable {
        /// The requested variable name.
        name: String,
    },
    /// A state vector of the wrong length was supplied.
    StateLength {
        /// Number of state variables the model has.
        expected: usize,
        /// Length of the vector supplied.
        got: usize,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SolveFailed { reason } => write!(f, "model solve failed: {reason}"),
            Self::OutputsFailed { reason } => {
                write!(f, "computing model outputs failed: {reason}")
            }
            Self::UnknownVariable { name } => write!(f, "model has no variable '{name}'"),
            Self::StateLength { expected, got } => {
                write!(
                    f,
                    "state vector has {got} entries but the model has {expected} state variables"
                )
            }
        }
    }
}

impl Error for ModelError {}

// ── ProtocolError ───────────────────────────────────────────────

/// Coarse classification of a [`ProtocolError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A construct is malformed; retrying cannot help.
    Definition,
    /// An expression did not produce the value expected of it.
    Evaluation,
    /// The external model failed.
    Model,
    /// Filesystem access failed.
    Io,
}

/// Errors raised while building or running a protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// A construct was defined with invalid parameters.
    Definition {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// An expression evaluated to an unexpected kind of value.
    Evaluation {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// A lookup found no binding for this name.
    UnknownName {
        /// The name that was looked up.
        name: String,
    },
    /// `define` was called for a name that is already bound.
    DuplicateName {
        /// The name that was defined twice.
        name: String,
    },
    /// A reset modifier named a checkpoint that was never saved.
    MissingState {
        /// The checkpoint name.
        name: String,
    },
    /// A repeated run produced an output with a different shape.
    OutputShape {
        /// The output name.
        name: String,
        /// Shape recorded by the first run.
        expected: Vec<usize>,
        /// Shape produced by this run.
        found: Vec<usize>,
    },
    /// Creating an output folder failed.
    Io {
        /// The folder being created.
        path: PathBuf,
        /// Description of the underlying I/O failure.
        reason: String,
    },
    /// A malformed array range or shape.
    Array(ArrayError),
    /// The model failed.
    Model(ModelError),
    /// Another error, tagged with the location of the failing construct.
    Located {
        /// Where the failing construct was declared.
        location: Location,
        /// The error raised by that construct.
        source: Box<ProtocolError>,
    },
}

impl ProtocolError {
    /// Shorthand for [`ProtocolError::Definition`].
    pub fn definition(reason: impl Into<String>) -> Self {
        Self::Definition {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ProtocolError::Evaluation`].
    pub fn evaluation(reason: impl Into<String>) -> Self {
        Self::Evaluation {
            reason: reason.into(),
        }
    }

    /// Attach `location` unless the error already carries one.
    ///
    /// The innermost location is kept since it names the construct that
    /// actually failed.
    pub fn at(self, location: Option<&Location>) -> Self {
        match (self, location) {
            (err @ Self::Located { .. }, _) | (err, None) => err,
            (err, Some(location)) => Self::Located {
                location: location.clone(),
                source: Box::new(err),
            },
        }
    }

    /// The location attached by [`at`](Self::at), if any.
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::Located { location, .. } => Some(location),
            _ => None,
        }
    }

    /// The error with any location wrapper removed.
    pub fn root(&self) -> &ProtocolError {
        match self {
            Self::Located { source, .. } => source.root(),
            other => other,
        }
    }

    /// Which error class this belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Self::Definition { .. }
            | Self::DuplicateName { .. }
            | Self::MissingState { .. }
            | Self::Array(_) => ErrorKind::Definition,
            Self::Evaluation { .. } | Self::UnknownName { .. } | Self::OutputShape { .. } => {
                ErrorKind::Evaluation
            }
            Self::Model(_) => ErrorKind::Model,
            Self::Io { .. } => ErrorKind::Io,
            Self::Located { .. } => unreachable!("root() strips location wrappers"),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Definition { reason } | Self::Evaluation { reason } => f.write_str(reason),
            Self::UnknownName { name } => write!(f, "the name '{name}' is not defined"),
            Self::DuplicateName { name } => {
                write!(f, "the name '{name}' is already defined")
            }
            Self::MissingState { name } => {
                write!(f, "no model state has been saved as '{name}'")
            }
            Self::OutputShape {
                name,
                expected,
                found,
            } => {
                write!(
                    f,
                    "all runs of a nested protocol must produce outputs with the same shape: \
                     '{name}' was {expected:?}, now {found:?}"
                )
            }
            Self::Io { path, reason } => {
                write!(f, "cannot create output folder {}: {reason}", path.display())
            }
            Self::Array(err) => write!(f, "{err}"),
            Self::Model(err) => write!(f, "{err}"),
            Self::Located { location, source } => write!(f, "{location}: {source}"),
        }
    }
}

impl Error for ProtocolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Array(err) => Some(err),
            Self::Model(err) => Some(err),
            Self::Located { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<ArrayError> for ProtocolError {
    fn from(err: ArrayError) -> Self {
        Self::Array(err)
    }
}

impl From<ModelError> for ProtocolError {
    fn from(err: ModelError) -> Self {
        Self::Model(err)
    }
}

/// Location tagging for `Result`s.
pub trait Locate<T> {
    /// Tag an error with `location`; see [`ProtocolError::at`].
    fn at(self, location: Option<&Location>) -> Result<T, ProtocolError>;
}

impl<T, E: Into<ProtocolError>> Locate<T> for Result<T, E> {
    fn at(self, location: Option<&Location>) -> Result<T, ProtocolError> {
        self.map_err(|err| {
            let err: ProtocolError = err.into();
            err.at(location)
        })
    }
}
