//! Ambient per-invocation context.
//!
//! A parent [`CommandGroup`](crate::CommandGroup) may establish a [`Context`]
//! (e.g. a configuration root) before a subcommand runs. Schemas that declare
//! a context field receive a copy; all others never see it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The one type a context field may have.
///
/// # Examples
///
/// ```
/// use typed_command_core::Context;
///
/// let context = Context::new().with("root_path", "/tmp/wallet");
/// assert_eq!(context.get_str("root_path"), Some("/tmp/wallet"));
/// assert!(context.get("missing").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    values: Map<String, Value>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, builder style.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts an entry, returning the previous value for `key`.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.to_string(), value.into())
    }

    /// Looks up an entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Looks up a string entry.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Merges `other` into `self`; entries of `other` win.
    pub fn extend(&mut self, other: Context) {
        self.values.extend(other.values);
    }

    /// Returns `true` if `key` has an entry.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

impl From<Map<String, Value>> for Context {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}
