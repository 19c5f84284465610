//! Named checkpoints of model state.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

/// A name → state-vector map filled by save modifiers and read by reset
/// modifiers.
#[derive(Clone, Debug, Default)]
pub struct StateCollection {
    states: IndexMap<String, Vec<f64>>,
}

/// A state collection shared by every modifier of a protocol.
pub type SharedStateCollection = Rc<RefCell<StateCollection>>;

impl StateCollection {
    /// An empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty collection ready to be shared.
    pub fn shared() -> SharedStateCollection {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Store `state` under `name`, replacing any earlier checkpoint.
    pub fn save(&mut self, name: impl Into<String>, state: Vec<f64>) {
        self.states.insert(name.into(), state);
    }

    /// The checkpoint saved under `name`.
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.states.get(name).map(Vec::as_slice)
    }

    /// True if a checkpoint exists under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// Checkpoint names, in first-save order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// Drop every checkpoint.
    pub fn clear(&mut self) {
        self.states.clear();
    }
}
