//! Name-binding environments with delegation.
//!
//! An [`Environment`] is a shared handle: clones refer to the same
//! bindings. Environments form chains. A lookup that misses locally is
//! forwarded to a delegatee, chosen by the prefix of a qualified name
//! (`"sim:V"` asks the delegatee registered for `"sim"` for `"V"`) or, failing
//! that, to the default delegatee registered for the empty prefix.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::ProtocolError;
use crate::value::Value;

/// Separator between a prefix and a name in qualified names.
pub const PREFIX_SEPARATOR: char = ':';

/// Join `prefix` and `name` into a qualified name.
pub fn qualify(prefix: &str, name: &str) -> String {
    format!("{prefix}{PREFIX_SEPARATOR}{name}")
}

#[derive(Default)]
struct Scope {
    bindings: IndexMap<String, Value>,
    delegatees: IndexMap<String, Environment>,
}

/// A shared set of bindings, in definition order.
#[derive(Clone, Default)]
pub struct Environment {
    scope: Rc<RefCell<Scope>>,
}

impl Environment {
    /// An empty environment with no delegatees.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty environment forwarding misses to `parent`.
    pub fn delegating_to(parent: &Environment) -> Self {
        let env = Self::new();
        env.set_delegatee("", Some(parent.clone()));
        env
    }

    /// Bind a new name. Fails if it is already bound locally.
    pub fn define(&self, name: impl Into<String>, value: Value) -> Result<(), ProtocolError> {
        let name = name.into();
        let mut scope = self.scope.borrow_mut();
        if scope.bindings.contains_key(&name) {
            return Err(ProtocolError::DuplicateName { name });
        }
        scope.bindings.insert(name, value);
        Ok(())
    }

    /// Bind a name, replacing any local binding.
    pub fn overwrite(&self, name: impl Into<String>, value: Value) {
        self.scope.borrow_mut().bindings.insert(name.into(), value);
    }

    /// Remove a local binding, returning it.
    pub fn remove(&self, name: &str) -> Option<Value> {
        self.scope.borrow_mut().bindings.shift_remove(name)
    }

    /// Drop every local binding. Delegatees are kept.
    pub fn clear(&self) {
        self.scope.borrow_mut().bindings.clear();
    }

    /// True if `name` is bound locally.
    pub fn is_defined_locally(&self, name: &str) -> bool {
        self.scope.borrow().bindings.contains_key(name)
    }

    /// The local binding for `name`, ignoring delegatees.
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.scope.borrow().bindings.get(name).cloned()
    }

    /// Look a name up here, then through the delegatees.
    pub fn lookup(&self, name: &str) -> Result<Value, ProtocolError> {
        self.find(name).ok_or_else(|| ProtocolError::UnknownName {
            name: name.to_string(),
        })
    }

    /// True if [`lookup`](Self::lookup) would succeed.
    pub fn has_name(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    fn find(&self, name: &str) -> Option<Value> {
        let scope = self.scope.borrow();
        if let Some(value) = scope.bindings.get(name) {
            return Some(value.clone());
        }
        if let Some((prefix, rest)) = name.split_once(PREFIX_SEPARATOR) {
            if let Some(delegatee) = scope.delegatees.get(prefix) {
                if let Some(value) = delegatee.find(rest) {
                    return Some(value);
                }
            }
        }
        scope.delegatees.get("").and_then(|parent| parent.find(name))
    }

    /// Register (or with `None`, remove) the delegatee for `prefix`.
    ///
    /// The empty prefix is the default delegatee.
    pub fn set_delegatee(&self, prefix: &str, env: Option<Environment>) {
        let mut scope = self.scope.borrow_mut();
        match env {
            Some(env) => {
                scope.delegatees.insert(prefix.to_string(), env);
            }
            None => {
                scope.delegatees.shift_remove(prefix);
            }
        }
    }

    /// The delegatee registered for `prefix`.
    pub fn delegatee(&self, prefix: &str) -> Option<Environment> {
        self.scope.borrow().delegatees.get(prefix).cloned()
    }

    /// Locally bound names, in definition order.
    pub fn defined_names(&self) -> Vec<String> {
        self.scope.borrow().bindings.keys().cloned().collect()
    }

    /// Local bindings, in definition order.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        self.scope
            .borrow()
            .bindings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of local bindings.
    pub fn len(&self) -> usize {
        self.scope.borrow().bindings.len()
    }

    /// True if nothing is bound locally.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if both handles refer to the same environment.
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.scope, &other.scope)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = self.scope.borrow();
        f.debug_struct("Environment")
            .field("names", &scope.bindings.keys().collect::<Vec<_>>())
            .field("delegatees", &scope.delegatees.keys().collect::<Vec<_>>())
            .finish()
    }
}
