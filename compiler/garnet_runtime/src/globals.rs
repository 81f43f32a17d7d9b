//! Global variable table.
//!
//! Every global is a cell shared through `Rc`. An alias entry holds the
//! target *cell*, not its name, so reads and writes through either name hit
//! the same storage even after the original name is undefined.
//!
//! Special globals (`$SAFE`, `$_`, `$~`) live in execution-context state;
//! the table only records that a name is special and lets the runtime
//! resolve it.

use std::cell::RefCell;
use std::rc::Rc;

use garnet_value::{read_only_global, EvalError, Value};
use rustc_hash::FxHashMap;

pub type GlobalRef = Rc<GlobalVariable>;

/// Globals whose value is held by the execution context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialGlobal {
    /// `$SAFE`
    SafeLevel,
    /// `$_`
    LastLine,
    /// `$~`
    BackRef,
}

#[derive(Debug)]
pub enum GlobalKind {
    Plain(RefCell<Value>),
    ReadOnly(Value),
    Alias(GlobalRef),
    Special(SpecialGlobal),
}

#[derive(Debug)]
pub struct GlobalVariable {
    name: String,
    kind: GlobalKind,
}

/// Outcome of a read that the table could not finish on its own.
#[derive(Clone, Debug, PartialEq)]
pub enum GlobalRead {
    Value(Value),
    Special(SpecialGlobal),
}

/// Outcome of a write that the table could not finish on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlobalWrite {
    Stored,
    Special(SpecialGlobal),
}

impl GlobalVariable {
    pub fn plain(name: &str, value: Value) -> Self {
        GlobalVariable {
            name: name.to_string(),
            kind: GlobalKind::Plain(RefCell::new(value)),
        }
    }

    pub fn read_only(name: &str, value: Value) -> Self {
        GlobalVariable {
            name: name.to_string(),
            kind: GlobalKind::ReadOnly(value),
        }
    }

    pub fn special(name: &str, special: SpecialGlobal) -> Self {
        GlobalVariable {
            name: name.to_string(),
            kind: GlobalKind::Special(special),
        }
    }

    pub fn alias(name: &str, target: GlobalRef) -> Self {
        GlobalVariable {
            name: name.to_string(),
            kind: GlobalKind::Alias(target),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> &GlobalKind {
        &self.kind
    }

    #[inline]
    pub fn is_alias(&self) -> bool {
        matches!(self.kind, GlobalKind::Alias(_))
    }

    pub fn read(&self) -> GlobalRead {
        match &self.kind {
            GlobalKind::Plain(cell) => GlobalRead::Value(cell.borrow().clone()),
            GlobalKind::ReadOnly(value) => GlobalRead::Value(value.clone()),
            GlobalKind::Alias(target) => target.read(),
            GlobalKind::Special(special) => GlobalRead::Special(*special),
        }
    }

    pub fn write(&self, value: Value) -> Result<GlobalWrite, EvalError> {
        match &self.kind {
            GlobalKind::Plain(cell) => {
                *cell.borrow_mut() = value;
                Ok(GlobalWrite::Stored)
            }
            GlobalKind::ReadOnly(_) => Err(read_only_global(&self.name)),
            GlobalKind::Alias(target) => target.write(value),
            GlobalKind::Special(special) => Ok(GlobalWrite::Special(*special)),
        }
    }
}

/// Name-keyed global storage.
#[derive(Debug, Default)]
pub struct GlobalTable {
    vars: FxHashMap<String, GlobalRef>,
}

impl GlobalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry under its own name.
    pub fn define(&mut self, var: GlobalVariable) -> GlobalRef {
        let var = Rc::new(var);
        self.vars.insert(var.name.clone(), Rc::clone(&var));
        var
    }

    pub fn lookup(&self, name: &str) -> Option<&GlobalRef> {
        self.vars.get(name)
    }

    /// Existing entry, or a fresh `nil` cell.
    fn entry(&mut self, name: &str) -> GlobalRef {
        if let Some(var) = self.vars.get(name) {
            return Rc::clone(var);
        }
        self.define(GlobalVariable::plain(name, Value::Nil))
    }

    /// Read `name`. An unknown global reads as `nil` and becomes defined.
    pub fn get(&mut self, name: &str) -> GlobalRead {
        self.entry(name).read()
    }

    /// Write `name`, creating it if missing.
    pub fn set(&mut self, name: &str, value: Value) -> Result<GlobalWrite, EvalError> {
        self.entry(name).write(value)
    }

    /// Make `new_name` an alias of the cell behind `old_name`, creating that
    /// cell if missing.
    pub fn alias(&mut self, old_name: &str, new_name: &str) {
        let target = self.entry(old_name);
        self.define(GlobalVariable::alias(new_name, target));
    }

    /// Remove `name`. Aliases that pointed at it keep the cell alive.
    pub fn undefine(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Sorted names of every defined global.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vars.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests;
