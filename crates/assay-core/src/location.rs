//! Source locations attached to protocol constructs.

use std::fmt;
use std::sync::Arc;

/// Where a protocol construct was declared, e.g. `"sweep.xml:42:7"`.
///
/// Opaque to the engine: it is only carried along and shown in errors.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location(Arc<str>);

impl Location {
    /// Wrap a textual location.
    pub fn new(text: impl AsRef<str>) -> Self {
        Self(Arc::from(text.as_ref()))
    }

    /// The location text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Location {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
