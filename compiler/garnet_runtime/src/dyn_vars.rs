//! Block-local dynamic variables.
//!
//! A persistent singly linked chain. Cloning a `DynamicVars` copies one
//! pointer, and two values that share a tail see each other's writes to the
//! shared links. A block captures the chain it was created in; each
//! activation extends that captured chain with a fresh activation link, so
//! variables first assigned inside the body stay local to the activation
//! while writes to outer variables are visible to the creator.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use garnet_value::Value;

struct DynVarLink {
    /// `None` marks an activation boundary.
    name: Option<String>,
    value: RefCell<Value>,
    next: DynamicVars,
}

/// Handle to the head of a dynamic-variable chain.
#[derive(Clone, Default)]
pub struct DynamicVars(Option<Rc<DynVarLink>>);

impl DynamicVars {
    pub fn new() -> Self {
        Self::default()
    }

    fn links(&self) -> impl Iterator<Item = &DynVarLink> {
        std::iter::successors(self.0.as_deref(), |link| link.next.0.as_deref())
    }

    fn find(&self, name: &str) -> Option<&DynVarLink> {
        self.links()
            .find(|link| link.name.as_deref() == Some(name))
    }

    fn prepend(&mut self, name: Option<String>, value: Value) {
        let next = std::mem::take(self);
        self.0 = Some(Rc::new(DynVarLink {
            name,
            value: RefCell::new(value),
            next,
        }));
    }

    /// The chain a new block activation starts from: `self` plus an empty
    /// activation boundary.
    #[must_use]
    pub fn with_activation_link(&self) -> Self {
        let mut chain = self.clone();
        chain.prepend(None, Value::Nil);
        chain
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.find(name).map(|link| link.value.borrow().clone())
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Update an existing variable. Returns `false` when `name` is unknown.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        match self.find(name) {
            Some(link) => {
                *link.value.borrow_mut() = value;
                true
            }
            None => false,
        }
    }

    /// Add a new innermost variable, shadowing any outer one.
    pub fn declare(&mut self, name: &str, value: Value) {
        self.prepend(Some(name.to_string()), value);
    }

    /// Assign if visible, else declare.
    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(link) = self.find(name) {
            *link.value.borrow_mut() = value;
            return;
        }
        self.declare(name, value);
    }

    /// Visible variable names, innermost first, without duplicates.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.links().filter_map(|link| link.name.as_deref()) {
            if !names.iter().any(|seen| seen == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    /// Whether both handles point at the same chain head.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        match (&a.0, &b.0) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for DynamicVars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.links().map(|link| link.name.as_deref().unwrap_or("|")))
            .finish()
    }
}
