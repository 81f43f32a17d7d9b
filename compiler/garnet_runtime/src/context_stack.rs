//! The stack shape shared by the frame, scope, block, iterator and
//! open-class stacks.
//!
//! Entries below the *base* are part of the context's initial state and can
//! never be popped. Popping past the base is an interpreter bug, not a
//! language-level error, so it panics instead of returning a `Result`.

/// A push/pop stack with a protected base.
#[derive(Clone, Debug)]
pub struct ContextStack<T> {
    entries: Vec<T>,
    base: usize,
    name: &'static str,
}

impl<T> ContextStack<T> {
    /// Create an empty stack. `name` appears in invariant-violation panics.
    pub fn new(name: &'static str) -> Self {
        Self {
            entries: Vec::new(),
            base: 0,
            name,
        }
    }

    #[inline]
    pub fn push(&mut self, entry: T) {
        self.entries.push(entry);
    }

    /// Remove and return the top entry.
    ///
    /// # Panics
    ///
    /// When the stack is at its base depth.
    #[track_caller]
    pub fn pop(&mut self) -> T {
        if self.entries.len() <= self.base {
            stack_underflow(self.name);
        }
        let name = self.name;
        self.entries.pop().unwrap_or_else(|| stack_underflow(name))
    }

    #[inline]
    pub fn top(&self) -> Option<&T> {
        self.entries.last()
    }

    /// The live top entry.
    ///
    /// # Panics
    ///
    /// When the stack is empty (the context was never initialized).
    #[track_caller]
    pub fn current(&self) -> &T {
        match self.entries.last() {
            Some(entry) => entry,
            None => stack_underflow(self.name),
        }
    }

    /// The entry just below the top.
    pub fn previous(&self) -> Option<&T> {
        let len = self.entries.len();
        if len < 2 {
            return None;
        }
        self.entries.get(len - 2)
    }

    /// Replace the top entry without changing depth; returns the old top.
    ///
    /// # Panics
    ///
    /// When the stack is empty.
    #[track_caller]
    pub fn set_top(&mut self, entry: T) -> T {
        match self.entries.last_mut() {
            Some(slot) => std::mem::replace(slot, entry),
            None => stack_underflow(self.name),
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Protect every current entry from being popped.
    pub fn seal_base(&mut self) {
        self.base = self.entries.len();
    }

    /// Entries from the bottom up.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }
}

impl<'a, T> IntoIterator for &'a ContextStack<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Invariant violation: a pop without a matching push.
#[cold]
#[track_caller]
pub(crate) fn stack_underflow(name: &str) -> ! {
    panic!("internal error: {name} stack popped past its base entry (interpreter bug)")
}
