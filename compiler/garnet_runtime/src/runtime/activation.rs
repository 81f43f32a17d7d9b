//! Block activation and the iterate protocol.
//!
//! Every operation here saves part of the execution context, runs code,
//! and restores the saved state. The restore lives in a guard's `Drop`, so
//! it runs on normal return, on every `Err` (failures and control signals
//! alike), and during panic unwinding.
//!
//! # Stack discipline
//!
//! | operation          | pushes                         | consumes             |
//! |--------------------|--------------------------------|----------------------|
//! | `yield_block`      | frame, class, iter; detaches block | `next`, `redo`, `return` |
//! | `iterate`          | iter `Pre`, block              | `break`, `return`, `retry` |
//! | `call_with_block`  | iter `Pre`, block              | `break`, `retry`     |
//! | `invoke_frame`     | iter, frame                    | `return`             |
//! | `open_module_body` | frame, scope, class, namespace | nothing              |

use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use garnet_stack::ensure_sufficient_stack;
use garnet_value::{
    no_block_given, wrong_block_arity, ControlAction, EvalError, EvalResult, ModuleRef, Value,
};

use super::Runtime;
use crate::block::{BlockBody, BlockParams, BlockRef};
use crate::dyn_vars::DynamicVars;
use crate::frame::{Frame, Iter};
use crate::namespace::{Namespace, NamespaceRef};
use crate::scope::{Scope, ScopeRef};
use crate::shared::Shared;

/// Caller state a block activation replaces.
struct SavedEnv {
    namespace: Option<NamespaceRef>,
    scope: ScopeRef,
    dyn_vars: DynamicVars,
}

/// RAII guard for one block activation.
///
/// While it lives, the block's captured frame, scope, dynamic variables and
/// class are installed and the block itself is detached from the block
/// stack. The block's iterator state is pushed separately, once parameters
/// are bound. Dropping it restores the caller's state exactly.
///
/// Access the runtime through this guard; it implements `Deref` and
/// `DerefMut`.
pub struct BlockActivation<'rt> {
    rt: &'rt mut Runtime,
    block: BlockRef,
    saved: SavedEnv,
    iter_pushed: bool,
}

impl<'rt> BlockActivation<'rt> {
    #[track_caller]
    fn enter(rt: &'rt mut Runtime, klass: Option<ModuleRef>) -> Self {
        let saved = SavedEnv {
            namespace: rt.namespace.clone(),
            scope: rt.current_scope(),
            dyn_vars: rt.dyn_vars.clone(),
        };
        let block = rt.blocks.pop();

        rt.frames.push(block.frame.clone());
        let frame_namespace = block.frame.borrow().namespace.clone();
        rt.namespace = frame_namespace.or_else(|| block.namespace.clone());
        rt.scopes.set_top(block.scope.clone());
        rt.dyn_vars = block.dyn_vars.with_activation_link();
        rt.classes.push(klass.or_else(|| block.klass.clone()));

        BlockActivation {
            rt,
            block,
            saved,
            iter_pushed: false,
        }
    }

    fn push_block_iter(&mut self) {
        self.rt.iters.push(self.block.iter);
        self.iter_pushed = true;
    }

    /// The block being activated.
    pub fn block(&self) -> &BlockRef {
        &self.block
    }

    fn runtime(&mut self) -> &mut Runtime {
        self.rt
    }
}

impl Drop for BlockActivation<'_> {
    fn drop(&mut self) {
        let rt = &mut *self.rt;
        if self.iter_pushed {
            rt.iters.pop();
        }
        rt.classes.pop();
        rt.dyn_vars.clone_from(&self.saved.dyn_vars);
        rt.blocks.push(Rc::clone(&self.block));
        rt.frames.pop();
        rt.namespace = self.saved.namespace.take();
        rt.scopes.set_top(self.saved.scope.clone());
    }
}

impl Deref for BlockActivation<'_> {
    type Target = Runtime;

    fn deref(&self) -> &Runtime {
        self.rt
    }
}

impl DerefMut for BlockActivation<'_> {
    fn deref_mut(&mut self) -> &mut Runtime {
        self.rt
    }
}

/// Guard for a call that has a block attached: block and `Iter::Pre` pushed
/// on entry, both popped on drop.
struct BlockCall<'rt> {
    rt: &'rt mut Runtime,
}

impl<'rt> BlockCall<'rt> {
    fn enter(rt: &'rt mut Runtime, block: BlockRef) -> Self {
        rt.iters.push(Iter::Pre);
        rt.blocks.push(block);
        BlockCall { rt }
    }
}

impl Drop for BlockCall<'_> {
    fn drop(&mut self) {
        self.rt.blocks.pop();
        self.rt.iters.pop();
    }
}

/// Guard for a method invocation: iterator state and frame.
struct FrameCall<'rt> {
    rt: &'rt mut Runtime,
}

impl<'rt> FrameCall<'rt> {
    fn enter(rt: &'rt mut Runtime, receiver: Value, method: &str) -> Result<Self, EvalError> {
        rt.check_call_depth()?;
        let iter = rt.current_iter().for_callee();
        rt.iters.push(iter);
        let frame = Frame::new(receiver, rt.namespace.clone(), Some(method.to_string()), iter);
        rt.frames.push(Shared::new(frame));
        Ok(FrameCall { rt })
    }
}

impl Drop for FrameCall<'_> {
    fn drop(&mut self) {
        self.rt.frames.pop();
        self.rt.iters.pop();
    }
}

/// RAII guard for a class or module body.
///
/// Installs a frame whose self is the module, a fresh scope, the module as
/// the open class, and a namespace nested in the current one.
pub struct ModuleBody<'rt> {
    rt: &'rt mut Runtime,
    saved_namespace: Option<NamespaceRef>,
}

impl<'rt> ModuleBody<'rt> {
    fn enter(rt: &'rt mut Runtime, module: &ModuleRef) -> Result<Self, EvalError> {
        rt.check_call_depth()?;
        let namespace = match &rt.namespace {
            Some(parent) => Namespace::child(module.clone(), parent),
            None => Namespace::top(module.clone()),
        };
        let frame = Frame::new(
            Value::module(module),
            Some(namespace.clone()),
            None,
            rt.current_iter(),
        );
        rt.frames.push(Shared::new(frame));
        rt.scopes.push(Shared::new(Scope::with_locals(&[])));
        rt.classes.push(Some(module.clone()));
        let saved_namespace = rt.set_namespace(Some(namespace));
        Ok(ModuleBody {
            rt,
            saved_namespace,
        })
    }
}

impl Drop for ModuleBody<'_> {
    fn drop(&mut self) {
        let rt = &mut *self.rt;
        rt.namespace = self.saved_namespace.take();
        rt.classes.pop();
        rt.scopes.pop();
        rt.frames.pop();
    }
}

impl Deref for ModuleBody<'_> {
    type Target = Runtime;

    fn deref(&self) -> &Runtime {
        self.rt
    }
}

impl DerefMut for ModuleBody<'_> {
    fn deref_mut(&mut self) -> &mut Runtime {
        self.rt
    }
}

impl Runtime {
    /// Invoke the block attached to the current call.
    ///
    /// - `value`: the yielded value; `None` yields an empty argument list.
    /// - `receiver`, `klass`: when `klass` is given the body runs with that
    ///   class open and with `receiver` (falling back to the block's own
    ///   self) as self. Otherwise the block's captured self is used.
    /// - `check_arity`: strict parameter-count checking.
    ///
    /// `next` ends the activation with `nil`, `redo` reruns the body with the
    /// same arguments, `return` ends it with the carried value. Everything
    /// else propagates after the caller's context has been restored.
    #[tracing::instrument(level = "trace", skip_all, fields(check_arity))]
    pub fn yield_block(
        &mut self,
        value: Option<Value>,
        receiver: Option<Value>,
        klass: Option<ModuleRef>,
        check_arity: bool,
    ) -> EvalResult {
        if !self.is_block_given() || self.blocks.top().is_none() {
            return Err(self.attach_backtrace(no_block_given()).into());
        }
        let mut activation = BlockActivation::enter(self, klass.clone());
        let block = Rc::clone(activation.block());

        let receiver = if klass.is_some() {
            receiver.unwrap_or_else(|| block.self_value.clone())
        } else {
            block.self_value.clone()
        };
        let value = value.unwrap_or_else(Value::empty_array);

        let rt = activation.runtime();
        let value = bind_block_params(rt, &block.params, &receiver, value, check_arity)
            .map_err(|err| rt.attach_backtrace(err))?;
        let args = value.to_args();

        activation.push_block_iter();
        run_block_body(activation.runtime(), &block.body, &receiver, &args)
    }

    /// Run `driver` with a transient block built from `body` attached, the
    /// way a native iterator method is called with a block.
    ///
    /// The block receives `(yielded, data2)`. `break` ends the iteration
    /// with `nil`, `return` with its value, and `retry` restarts the driver.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn iterate<D, B>(&mut self, mut driver: D, data1: &Value, body: B, data2: Value) -> EvalResult
    where
        D: FnMut(&mut Runtime, &Value) -> EvalResult,
        B: Fn(&mut Runtime, &Value, &Value) -> EvalResult + 'static,
    {
        let body = BlockBody::new(move |rt, _receiver, args| body(rt, &Value::from_args(args), &data2));
        let receiver = self.top_self.clone();
        let block = self.new_block_with_self(BlockParams::None, body, receiver);

        let call = BlockCall::enter(self, block);
        loop {
            match driver(call.rt, data1) {
                Err(ControlAction::Break(_)) => return Ok(Value::Nil),
                Err(ControlAction::Return(value)) => return Ok(value),
                Err(ControlAction::Retry) => {
                    tracing::trace!("retry");
                }
                other => return other,
            }
        }
    }

    /// Call `f` with `block` attached, the way an evaluator calls a method
    /// given a literal block.
    ///
    /// `break` ends the call with the carried value; `retry` calls `f`
    /// again.
    pub fn call_with_block<F>(&mut self, block: BlockRef, mut f: F) -> EvalResult
    where
        F: FnMut(&mut Runtime) -> EvalResult,
    {
        let call = BlockCall::enter(self, block);
        loop {
            match f(call.rt) {
                Err(ControlAction::Break(value)) => return Ok(value),
                Err(ControlAction::Retry) => {
                    tracing::trace!("retry");
                }
                other => return other,
            }
        }
    }

    /// Run a method body in a fresh frame for `receiver`.
    ///
    /// The frame counts as called with a block exactly when a block was
    /// pushed for it (`Iter::Pre` on top). `return` ends the call with its
    /// value. Fails with `SystemStackError` at the configured depth limit.
    pub fn invoke_frame<F>(&mut self, receiver: Value, method: &str, f: F) -> EvalResult
    where
        F: FnOnce(&mut Runtime) -> EvalResult,
    {
        let call = FrameCall::enter(self, receiver, method)?;
        match ensure_sufficient_stack(|| f(call.rt)) {
            Err(ControlAction::Return(value)) => Ok(value),
            other => other,
        }
    }

    /// Run `f` as the body of `module`'s definition.
    pub fn open_module_body<F>(&mut self, module: &ModuleRef, f: F) -> EvalResult
    where
        F: FnOnce(&mut ModuleBody<'_>) -> EvalResult,
    {
        let mut body = ModuleBody::enter(self, module)?;
        f(&mut body)
    }

    /// Run `f`, catching a `throw` whose tag equals `tag`.
    pub fn catch_tag<F>(&mut self, tag: &Value, f: F) -> EvalResult
    where
        F: FnOnce(&mut Runtime) -> EvalResult,
    {
        match f(self) {
            Err(ControlAction::Throw { tag: thrown, value }) if thrown == *tag => Ok(value),
            other => other,
        }
    }
}

/// Apply the parameter rules for one activation and return the value whose
/// elements become the body's arguments.
///
/// - `||`: under strict arity, a non-empty array is an error.
/// - no parameters, or a single-name pattern: under strict arity, a
///   one-element array collapses to its element.
/// - a destructuring pattern: the value is bound as is.
fn bind_block_params(
    rt: &mut Runtime,
    params: &BlockParams,
    receiver: &Value,
    value: Value,
    check_arity: bool,
) -> Result<Value, EvalError> {
    match params {
        BlockParams::ZeroArg => {
            if check_arity {
                if let Some(len) = value.array_len().filter(|&len| len != 0) {
                    return Err(wrong_block_arity(len));
                }
            }
            Ok(value)
        }
        BlockParams::None => Ok(collapse_single(value, check_arity)),
        BlockParams::Pattern(pattern) => {
            let value = if pattern.is_multiple() {
                value
            } else {
                collapse_single(value, check_arity)
            };
            let binder = Rc::clone(&rt.binder);
            binder.bind(rt, pattern, receiver, value.clone(), check_arity)?;
            Ok(value)
        }
    }
}

fn collapse_single(value: Value, check_arity: bool) -> Value {
    if check_arity && value.array_len() == Some(1) {
        if let Some(only) = value.array_entry(0) {
            return only;
        }
    }
    value
}

fn run_block_body(rt: &mut Runtime, body: &BlockBody, receiver: &Value, args: &[Value]) -> EvalResult {
    loop {
        match ensure_sufficient_stack(|| body.call(rt, receiver, args)) {
            Err(ControlAction::Redo) => {
                tracing::trace!("redo");
            }
            Err(ControlAction::Next) => return Ok(Value::Nil),
            Err(ControlAction::Return(value)) => return Ok(value),
            other => return other,
        }
    }
}
