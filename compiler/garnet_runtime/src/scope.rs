//! Local-variable tables.
//!
//! Slots 0 and 1 of a scope that has locals are the special `$_` (last line)
//! and `$~` (last match) variables, named `_` and `~`. Every path that gives a
//! scope locals installs them first, so user locals start at slot 2.

use garnet_value::Value;

use crate::shared::Shared;

/// Shared scope handle. Blocks capture the scope they were created in and
/// install that same scope on every activation.
pub type ScopeRef = Shared<Scope>;

/// Slot of `$_`.
pub const LAST_LINE_SLOT: usize = 0;
/// Slot of `$~`.
pub const BACK_REF_SLOT: usize = 1;
/// Names of the special slots, in slot order.
pub const SPECIAL_SLOT_NAMES: [&str; 2] = ["_", "~"];

/// Named local-variable storage of one method or script body.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    local_names: Vec<String>,
    local_values: Vec<Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope pre-populated with the special slots followed by `names`.
    pub fn with_locals(names: &[&str]) -> Self {
        let mut scope = Scope::new();
        scope.ensure_special_slots();
        for name in names {
            scope.declare(name, Value::Nil);
        }
        scope
    }

    #[inline]
    pub fn has_local_values(&self) -> bool {
        !self.local_values.is_empty()
    }

    #[inline]
    pub fn local_names(&self) -> &[String] {
        &self.local_names
    }

    /// Replace the name table. Existing values keep their positions; new
    /// slots start as `nil`. A table that does not begin with `_` and `~`
    /// gets them prepended.
    pub fn set_local_names(&mut self, names: Vec<String>) {
        let names = if has_special_prefix(&names) {
            names
        } else {
            SPECIAL_SLOT_NAMES
                .iter()
                .map(ToString::to_string)
                .chain(names)
                .collect()
        };
        self.local_values.resize(names.len(), Value::Nil);
        self.local_names = names;
    }

    /// Give a local-less scope its `_` and `~` slots.
    pub fn ensure_special_slots(&mut self) {
        if self.local_names.is_empty() {
            self.set_local_names(Vec::new());
        }
    }

    /// Value at `index`, or `nil` past the end.
    pub fn get(&self, index: usize) -> Value {
        self.local_values.get(index).cloned().unwrap_or_default()
    }

    /// Store at `index`. Returns `false` when the slot does not exist.
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        match self.local_values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.local_names.iter().position(|n| n == name)
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.index_of(name).map(|index| self.get(index))
    }

    /// Assign an existing local. Returns `false` when `name` is not declared.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        match self.index_of(name) {
            Some(index) => self.set(index, value),
            None => false,
        }
    }

    /// Declare `name` (if new) and assign it.
    pub fn declare(&mut self, name: &str, value: Value) {
        if !self.assign(name, value.clone()) {
            self.ensure_special_slots();
            self.local_names.push(name.to_string());
            self.local_values.push(value);
        }
    }
}

fn has_special_prefix(names: &[String]) -> bool {
    names.len() >= SPECIAL_SLOT_NAMES.len()
        && names
            .iter()
            .zip(SPECIAL_SLOT_NAMES)
            .all(|(name, special)| name == special)
}

#[cfg(test)]
mod tests;
