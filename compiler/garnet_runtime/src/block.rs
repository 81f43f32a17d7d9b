//! Captured blocks.

use std::fmt;
use std::rc::Rc;

use garnet_value::{EvalResult, ModuleRef, Value};

use crate::dyn_vars::DynamicVars;
use crate::frame::{FrameRef, Iter};
use crate::namespace::NamespaceRef;
use crate::runtime::Runtime;
use crate::scope::ScopeRef;

pub type BlockRef = Rc<Block>;

/// Signature of a block body: runtime, receiver, positional arguments.
pub type BlockFn = dyn Fn(&mut Runtime, &Value, &[Value]) -> EvalResult;

/// Executable body of a block. The evaluator supplies it; the runtime only
/// calls it.
#[derive(Clone)]
pub struct BlockBody(Rc<BlockFn>);

impl BlockBody {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&mut Runtime, &Value, &[Value]) -> EvalResult + 'static,
    {
        BlockBody(Rc::new(body))
    }

    #[inline]
    pub fn call(&self, rt: &mut Runtime, receiver: &Value, args: &[Value]) -> EvalResult {
        (self.0)(rt, receiver, args)
    }
}

impl fmt::Debug for BlockBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BlockBody(..)")
    }
}

/// A block parameter list that binds something.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamPattern {
    /// `|x|`
    Name(String),
    /// `|a, b, *rest|`: destructures the yielded value.
    Multiple {
        names: Vec<String>,
        splat: Option<String>,
    },
}

impl ParamPattern {
    pub fn name(name: &str) -> Self {
        ParamPattern::Name(name.to_string())
    }

    pub fn multiple(names: &[&str]) -> Self {
        ParamPattern::Multiple {
            names: names.iter().map(ToString::to_string).collect(),
            splat: None,
        }
    }

    pub fn multiple_with_splat(names: &[&str], splat: &str) -> Self {
        ParamPattern::Multiple {
            names: names.iter().map(ToString::to_string).collect(),
            splat: Some(splat.to_string()),
        }
    }

    #[inline]
    pub fn is_multiple(&self) -> bool {
        matches!(self, ParamPattern::Multiple { .. })
    }
}

/// Parameter declaration of a block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BlockParams {
    /// No `|...|` at all.
    #[default]
    None,
    /// An explicit empty `||`.
    ZeroArg,
    Pattern(ParamPattern),
}

/// A closure captured together with the execution context it was created in.
///
/// Activating a block installs the captured frame, scope, dynamic variables
/// and class; it never copies them.
#[derive(Debug)]
pub struct Block {
    pub(crate) params: BlockParams,
    pub(crate) body: BlockBody,
    pub(crate) self_value: Value,
    pub(crate) frame: FrameRef,
    pub(crate) scope: ScopeRef,
    pub(crate) namespace: Option<NamespaceRef>,
    pub(crate) klass: Option<ModuleRef>,
    pub(crate) dyn_vars: DynamicVars,
    pub(crate) iter: Iter,
}

impl Block {
    #[inline]
    pub fn params(&self) -> &BlockParams {
        &self.params
    }

    #[inline]
    pub fn self_value(&self) -> &Value {
        &self.self_value
    }

    #[inline]
    pub fn frame(&self) -> &FrameRef {
        &self.frame
    }

    #[inline]
    pub fn scope(&self) -> &ScopeRef {
        &self.scope
    }

    #[inline]
    pub fn namespace(&self) -> Option<&NamespaceRef> {
        self.namespace.as_ref()
    }

    #[inline]
    pub fn klass(&self) -> Option<&ModuleRef> {
        self.klass.as_ref()
    }

    #[inline]
    pub fn dyn_vars(&self) -> &DynamicVars {
        &self.dyn_vars
    }

    /// Iterator state current when the block was created.
    #[inline]
    pub fn iter(&self) -> Iter {
        self.iter
    }
}
