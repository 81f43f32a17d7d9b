//! The open-class stack: the class definitions target.

use garnet_value::ModuleRef;

use crate::context_stack::ContextStack;

/// Current open class plus the saved values beneath it.
///
/// `push` saves the current class and installs a new one; `pop` restores
/// the saved one. `None` means "no class open".
#[derive(Debug)]
pub struct ClassStack {
    current: Option<ModuleRef>,
    saved: ContextStack<Option<ModuleRef>>,
}

impl Default for ClassStack {
    fn default() -> Self {
        ClassStack {
            current: None,
            saved: ContextStack::new("class"),
        }
    }
}

impl ClassStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, class: Option<ModuleRef>) {
        let previous = std::mem::replace(&mut self.current, class);
        self.saved.push(previous);
    }

    /// Restore the class saved by the matching `push`.
    ///
    /// # Panics
    ///
    /// Without a matching `push`.
    #[track_caller]
    pub fn pop(&mut self) -> Option<ModuleRef> {
        let restored = self.saved.pop();
        std::mem::replace(&mut self.current, restored)
    }

    #[inline]
    pub fn current(&self) -> Option<&ModuleRef> {
        self.current.as_ref()
    }

    /// Replace the current class without saving it.
    pub fn set_current(&mut self, class: Option<ModuleRef>) -> Option<ModuleRef> {
        std::mem::replace(&mut self.current, class)
    }

    /// Number of saved entries.
    #[inline]
    pub fn depth(&self) -> usize {
        self.saved.depth()
    }
}
