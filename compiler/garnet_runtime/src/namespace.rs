//! Lexical namespace chain (`cbase`).

use garnet_value::{ModuleRef, Value};

use crate::shared::Shared;

pub type NamespaceRef = Shared<Namespace>;

/// One level of lexical module nesting.
#[derive(Debug)]
pub struct Namespace {
    module: ModuleRef,
    parent: Option<NamespaceRef>,
}

impl Namespace {
    /// Outermost namespace.
    pub fn top(module: ModuleRef) -> NamespaceRef {
        Shared::new(Namespace {
            module,
            parent: None,
        })
    }

    /// Namespace for a module body opened inside `parent`.
    pub fn child(module: ModuleRef, parent: &NamespaceRef) -> NamespaceRef {
        Shared::new(Namespace {
            module,
            parent: Some(parent.clone()),
        })
    }

    #[inline]
    pub fn module(&self) -> &ModuleRef {
        &self.module
    }

    /// Rebind this level to `module`; the parent chain is kept.
    pub fn set_module(&mut self, module: ModuleRef) {
        self.module = module;
    }

    #[inline]
    pub fn parent(&self) -> Option<&NamespaceRef> {
        self.parent.as_ref()
    }

    /// Number of nesting levels including this one.
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |parent| parent.borrow().depth())
    }

    /// Constant lookup: each lexically enclosing module's own constants,
    /// innermost first, then the innermost module's superclass chain.
    pub fn lookup_constant(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.lexical_constant(name) {
            return Some(value);
        }
        self.module.lookup_constant(name)
    }

    fn lexical_constant(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.module.constant(name) {
            return Some(value);
        }
        self.parent
            .as_ref()
            .and_then(|parent| parent.borrow().lexical_constant(name))
    }
}
