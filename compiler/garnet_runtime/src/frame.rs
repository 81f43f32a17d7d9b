//! Method-call frames and the iterator state.

use garnet_value::Value;

use crate::namespace::NamespaceRef;
use crate::shared::Shared;

/// Shared frame handle. Blocks hold on to the frame they were created in.
pub type FrameRef = Shared<Frame>;

/// Whether the current call has a block attached.
///
/// `Pre` marks "a block has been pushed for the *next* call"; the call it
/// is meant for turns it into `Cur` when its frame is pushed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Iter {
    #[default]
    Not,
    Pre,
    Cur,
}

impl Iter {
    #[inline]
    pub fn is_not(self) -> bool {
        self == Iter::Not
    }

    /// Iter state of a frame pushed while `self` is on top of the iterator
    /// stack.
    #[inline]
    pub fn for_callee(self) -> Iter {
        if self == Iter::Pre {
            Iter::Cur
        } else {
            Iter::Not
        }
    }
}

/// Per-method-call record.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    /// Receiver of the call.
    pub self_value: Value,
    /// Lexical namespace (`cbase`) of the running code.
    pub namespace: Option<NamespaceRef>,
    /// Name of the running method, `None` at top level.
    pub last_func: Option<String>,
    /// Whether a block was passed to this call.
    pub iter: Iter,
}

impl Frame {
    pub fn new(
        self_value: Value,
        namespace: Option<NamespaceRef>,
        last_func: Option<String>,
        iter: Iter,
    ) -> Self {
        Frame {
            self_value,
            namespace,
            last_func,
            iter,
        }
    }

    /// Name for backtraces.
    pub fn display_name(&self) -> &str {
        self.last_func.as_deref().unwrap_or("<main>")
    }
}
