//! A single pending key-value edit.

use tessera_values::Value;

/// One pending operation against a map or set: bind `key` to a value, or
/// remove it when `value` is `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Kvp {
    pub key: Value,
    pub value: Option<Value>,
}

impl Kvp {
    /// An insert-or-replace operation.
    pub fn insert(key: Value, value: Value) -> Self {
        Self {
            key,
            value: Some(value),
        }
    }

    /// A removal operation. Removing an absent key later applies as a no-op.
    pub fn remove(key: Value) -> Self {
        Self { key, value: None }
    }

    /// Whether this operation removes its key.
    pub fn is_removal(&self) -> bool {
        self.value.is_none()
    }
}
