//! Class and module objects.
//!
//! Only the shape the runtime core needs: a name, a kind, a superclass link,
//! and a constant table. Method tables and ancestor linearization belong to
//! the object model layered on top.

use std::cell::RefCell;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::value::{Heap, Value};

/// Shared handle to a class or module. Compares by identity.
pub type ModuleRef = Heap<RModule>;

/// Whether an `RModule` is a class (instantiable, has a superclass) or a
/// plain module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleKind {
    Class,
    Module,
}

/// A class or module object.
pub struct RModule {
    name: RefCell<String>,
    kind: ModuleKind,
    superclass: Option<ModuleRef>,
    constants: RefCell<FxHashMap<String, Value>>,
}

impl RModule {
    /// Create a class. `superclass` is `None` only for the root class.
    pub fn new_class(name: &str, superclass: Option<ModuleRef>) -> ModuleRef {
        Heap::new(RModule {
            name: RefCell::new(name.to_string()),
            kind: ModuleKind::Class,
            superclass,
            constants: RefCell::new(FxHashMap::default()),
        })
    }

    /// Create a module.
    pub fn new_module(name: &str) -> ModuleRef {
        Heap::new(RModule {
            name: RefCell::new(name.to_string()),
            kind: ModuleKind::Module,
            superclass: None,
            constants: RefCell::new(FxHashMap::default()),
        })
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub fn set_name(&self, name: &str) {
        *self.name.borrow_mut() = name.to_string();
    }

    #[inline]
    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    #[inline]
    pub fn is_class(&self) -> bool {
        self.kind == ModuleKind::Class
    }

    #[inline]
    pub fn superclass(&self) -> Option<&ModuleRef> {
        self.superclass.as_ref()
    }

    /// Whether `ancestor` is this class or appears on its superclass chain.
    pub fn inherits_from(&self, ancestor: &ModuleRef) -> bool {
        if std::ptr::eq(self, &**ancestor) {
            return true;
        }
        let mut current = self.superclass.as_ref();
        while let Some(class) = current {
            if Heap::ptr_eq(class, ancestor) {
                return true;
            }
            current = class.superclass.as_ref();
        }
        false
    }

    /// Define or replace a constant directly on this module.
    pub fn define_constant(&self, name: &str, value: Value) {
        self.constants.borrow_mut().insert(name.to_string(), value);
    }

    /// Constant defined directly on this module.
    pub fn constant(&self, name: &str) -> Option<Value> {
        self.constants.borrow().get(name).cloned()
    }

    /// Constant on this module or any superclass.
    pub fn lookup_constant(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.constant(name) {
            return Some(value);
        }
        let mut current = self.superclass.as_ref();
        while let Some(class) = current {
            if let Some(value) = class.constant(name) {
                return Some(value);
            }
            current = class.superclass.as_ref();
        }
        None
    }

    pub fn constant_names(&self) -> Vec<String> {
        self.constants.borrow().keys().cloned().collect()
    }
}

impl PartialEq for RModule {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for RModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RModule")
            .field("name", &*self.name.borrow())
            .field("kind", &self.kind)
            .field(
                "superclass",
                &self.superclass.as_ref().map(|class| class.name()),
            )
            .finish_non_exhaustive()
    }
}

/// Plain object instance: just its class.
pub struct RObject {
    class: ModuleRef,
}

impl RObject {
    pub(crate) fn new(class: ModuleRef) -> Self {
        RObject { class }
    }

    #[inline]
    pub fn class(&self) -> &ModuleRef {
        &self.class
    }
}

impl fmt::Debug for RObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<{}>", self.class.name())
    }
}

#[cfg(test)]
mod tests;
