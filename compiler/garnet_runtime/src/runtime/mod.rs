//! The execution context.
//!
//! `Runtime` owns the frame, scope, block, iterator and open-class stacks,
//! the dynamic-variable chain, the current namespace, the global table, the
//! safe level, and the class registry. The evaluator drives it through the
//! operations here and in [`activation`]; every operation that pushes
//! context state pops it again on every exit path.

mod activation;
mod builder;
mod load;

use std::rc::Rc;

use garnet_value::{
    insecure_global_alias, insecure_operation, safe_level_downgrade, safe_level_not_integer,
    stack_depth_exceeded, unknown_superclass, BacktraceFrame, ControlAction, EvalBacktrace,
    EvalError, ModuleRef, Value,
};

pub use activation::{BlockActivation, ModuleBody};
pub use builder::RuntimeBuilder;

use crate::binder::ParamBinder;
use crate::block::{Block, BlockBody, BlockParams, BlockRef};
use crate::class_stack::ClassStack;
use crate::classes::{ClassRegistry, CoreClasses, ExceptionClasses};
use crate::config::{RuntimeConfig, Visibility, MAX_SAFE_LEVEL};
use crate::context_stack::ContextStack;
use crate::dyn_vars::DynamicVars;
use crate::frame::{Frame, FrameRef, Iter};
use crate::globals::{GlobalRead, GlobalTable, GlobalVariable, GlobalWrite, SpecialGlobal};
use crate::namespace::{Namespace, NamespaceRef};
use crate::output::SharedErrorStream;
use crate::scope::{Scope, ScopeRef, BACK_REF_SLOT, LAST_LINE_SLOT};
use crate::shared::Shared;

/// One interpreter execution context.
///
/// Single-threaded: nothing here is `Send`.
pub struct Runtime {
    pub(crate) config: RuntimeConfig,
    initialized: bool,
    safe_level: u8,

    pub(crate) frames: ContextStack<FrameRef>,
    pub(crate) scopes: ContextStack<ScopeRef>,
    pub(crate) blocks: ContextStack<BlockRef>,
    pub(crate) iters: ContextStack<Iter>,
    pub(crate) classes: ClassStack,
    pub(crate) dyn_vars: DynamicVars,
    pub(crate) namespace: Option<NamespaceRef>,

    globals: GlobalTable,
    registry: ClassRegistry,
    core: Option<CoreClasses>,
    exceptions: Option<ExceptionClasses>,

    top_self: Value,
    top_frame: Option<FrameRef>,
    top_scope: Option<ScopeRef>,
    top_namespace: Option<NamespaceRef>,
    method_scope: Visibility,
    wrapper: Option<ModuleRef>,
    source_file: String,
    source_line: u32,
    in_eval: u32,

    pub(crate) binder: Rc<dyn ParamBinder>,
    error_stream: SharedErrorStream,
}

impl Runtime {
    /// Runtime with default configuration. Call [`Runtime::init`] before use.
    pub fn new() -> Self {
        RuntimeBuilder::new().build()
    }

    /// Install the base context: the top-level iterator state, frame and
    /// scope, the core classes, the default globals, and the top-level self
    /// and namespace.
    ///
    /// Idempotent.
    pub fn init(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        self.iters.push(Iter::Not);
        self.iters.seal_base();

        let top_frame = Shared::new(Frame::default());
        self.frames.push(top_frame.clone());
        self.frames.seal_base();

        let top_scope = Shared::new(Scope::with_locals(&[]));
        self.scopes.push(top_scope.clone());
        self.scopes.seal_base();

        self.method_scope = Visibility::Private;

        let core = CoreClasses::define(&mut self.registry);
        let exceptions = ExceptionClasses::define(&mut self.registry, &core.object);
        self.define_default_globals();

        self.top_self = Value::object(&core.object);
        self.classes.set_current(Some(core.object.clone()));
        let namespace = Namespace::top(core.object.clone());
        {
            let mut frame = top_frame.borrow_mut();
            frame.self_value.clone_from(&self.top_self);
            frame.namespace = Some(namespace.clone());
        }
        self.namespace = Some(namespace.clone());
        self.top_namespace = Some(namespace);
        self.top_frame = Some(top_frame);
        self.top_scope = Some(top_scope);
        self.core = Some(core);
        self.exceptions = Some(exceptions);

        tracing::debug!(
            classes = self.registry.len(),
            globals = self.globals.len(),
            safe_level = self.safe_level,
            "runtime initialized"
        );
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // Stacks

    /// Frame of the running method.
    #[track_caller]
    pub fn current_frame(&self) -> FrameRef {
        self.frames.current().clone()
    }

    /// Frame of the caller of the running method.
    pub fn previous_frame(&self) -> Option<FrameRef> {
        self.frames.previous().cloned()
    }

    /// Push a frame for a call on `receiver`. The frame inherits the
    /// current namespace and iterator state.
    pub fn push_frame(&mut self, receiver: Value, method: Option<&str>) -> Result<FrameRef, EvalError> {
        self.check_call_depth()?;
        let frame = Shared::new(Frame::new(
            receiver,
            self.namespace.clone(),
            method.map(str::to_string),
            self.current_iter(),
        ));
        self.frames.push(frame.clone());
        Ok(frame)
    }

    #[track_caller]
    pub fn pop_frame(&mut self) -> FrameRef {
        self.frames.pop()
    }

    pub(crate) fn check_call_depth(&self) -> Result<(), EvalError> {
        match self.config.max_call_depth {
            Some(limit) if self.frames.depth() >= limit => {
                tracing::debug!(limit, "call depth limit reached");
                Err(self.attach_backtrace(stack_depth_exceeded(limit)))
            }
            _ => Ok(()),
        }
    }

    #[track_caller]
    pub fn current_scope(&self) -> ScopeRef {
        self.scopes.current().clone()
    }

    pub fn push_scope(&mut self, scope: Scope) -> ScopeRef {
        let scope = Shared::new(scope);
        self.scopes.push(scope.clone());
        scope
    }

    #[track_caller]
    pub fn pop_scope(&mut self) -> ScopeRef {
        self.scopes.pop()
    }

    /// Replace the current scope in place; returns the old one.
    #[track_caller]
    pub fn set_top_scope(&mut self, scope: ScopeRef) -> ScopeRef {
        self.scopes.set_top(scope)
    }

    /// The block the next `yield` will activate.
    pub fn active_block(&self) -> Option<BlockRef> {
        self.blocks.top().cloned()
    }

    pub fn push_block(&mut self, block: BlockRef) {
        self.blocks.push(block);
    }

    #[track_caller]
    pub fn pop_block(&mut self) -> BlockRef {
        self.blocks.pop()
    }

    #[track_caller]
    pub fn current_iter(&self) -> Iter {
        *self.iters.current()
    }

    pub fn push_iter(&mut self, iter: Iter) {
        self.iters.push(iter);
    }

    #[track_caller]
    pub fn pop_iter(&mut self) -> Iter {
        self.iters.pop()
    }

    pub fn current_class(&self) -> Option<ModuleRef> {
        self.classes.current().cloned()
    }

    pub fn push_class(&mut self, class: Option<ModuleRef>) {
        self.classes.push(class);
    }

    #[track_caller]
    pub fn pop_class(&mut self) -> Option<ModuleRef> {
        self.classes.pop()
    }

    pub fn set_current_class(&mut self, class: Option<ModuleRef>) -> Option<ModuleRef> {
        self.classes.set_current(class)
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.depth()
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    pub fn block_depth(&self) -> usize {
        self.blocks.depth()
    }

    pub fn iter_depth(&self) -> usize {
        self.iters.depth()
    }

    pub fn class_depth(&self) -> usize {
        self.classes.depth()
    }

    /// Whether the running method was called with a block.
    pub fn is_block_given(&self) -> bool {
        self.frames
            .top()
            .is_some_and(|frame| !frame.borrow().iter.is_not())
    }

    /// Whether the caller of the running method was called with a block.
    pub fn is_frame_block_given(&self) -> bool {
        self.frames
            .previous()
            .is_some_and(|frame| !frame.borrow().iter.is_not())
    }

    /// Capture a block over the current context. Its receiver is the current
    /// frame's self.
    pub fn new_block(&self, params: BlockParams, body: BlockBody) -> BlockRef {
        let receiver = self.frames.top().map(|frame| frame.borrow().self_value.clone());
        self.new_block_with_self(params, body, receiver.unwrap_or_default())
    }

    /// Capture a block over the current context with an explicit receiver.
    #[track_caller]
    pub fn new_block_with_self(&self, params: BlockParams, body: BlockBody, receiver: Value) -> BlockRef {
        Rc::new(Block {
            params,
            body,
            self_value: receiver,
            frame: self.current_frame(),
            scope: self.current_scope(),
            namespace: self.namespace.clone(),
            klass: self.current_class(),
            dyn_vars: self.dyn_vars.clone(),
            iter: self.current_iter(),
        })
    }

    // Dynamic variables

    pub fn dynamic_vars(&self) -> &DynamicVars {
        &self.dyn_vars
    }

    /// Replace the dynamic-variable chain; returns the previous one.
    pub fn set_dynamic_vars(&mut self, vars: DynamicVars) -> DynamicVars {
        std::mem::replace(&mut self.dyn_vars, vars)
    }

    pub fn dyn_var_get(&self, name: &str) -> Option<Value> {
        self.dyn_vars.get(name)
    }

    pub fn dyn_var_set(&mut self, name: &str, value: Value) {
        self.dyn_vars.set(name, value);
    }

    pub fn is_dyn_var_defined(&self, name: &str) -> bool {
        self.dyn_vars.is_defined(name)
    }

    pub fn dyn_var_names(&self) -> Vec<String> {
        self.dyn_vars.names()
    }

    // Namespaces

    pub fn current_namespace(&self) -> Option<NamespaceRef> {
        self.namespace.clone()
    }

    /// Replace the current namespace; returns the previous one.
    pub fn set_namespace(&mut self, namespace: Option<NamespaceRef>) -> Option<NamespaceRef> {
        std::mem::replace(&mut self.namespace, namespace)
    }

    /// Lexical class of the running code, from the current frame.
    pub fn cbase(&self) -> Option<ModuleRef> {
        let frame = self.frames.top()?.borrow();
        let namespace = frame.namespace.as_ref()?.borrow();
        let module = namespace.module().clone();
        Some(module)
    }

    /// Replace the module of the current frame's namespace in place, so
    /// every holder of that namespace (including the current one) sees it.
    /// A frame without a namespace gets a fresh top-level one.
    #[track_caller]
    pub fn set_cbase(&mut self, module: ModuleRef) {
        let frame = self.frames.current().clone();
        let existing = frame.borrow().namespace.clone();
        match existing {
            Some(namespace) => namespace.borrow_mut().set_module(module),
            None => {
                let namespace = Namespace::top(module);
                frame.borrow_mut().namespace = Some(namespace.clone());
                if self.namespace.is_none() {
                    self.namespace = Some(namespace);
                }
            }
        }
    }

    /// Resolve a constant through the current namespace chain.
    pub fn lookup_constant(&self, name: &str) -> Option<Value> {
        let namespace = self.namespace.as_ref()?;
        let found = namespace.borrow().lookup_constant(name);
        found
    }

    // Safe level

    #[inline]
    pub fn safe_level(&self) -> u8 {
        self.safe_level
    }

    /// Raise the safe level. Lowering it is refused.
    pub fn set_safe_level(&mut self, level: u8) -> Result<(), EvalError> {
        if level < self.safe_level {
            return Err(self.attach_backtrace(safe_level_downgrade(
                self.safe_level,
                i64::from(level),
            )));
        }
        self.safe_level = level.min(MAX_SAFE_LEVEL);
        Ok(())
    }

    /// Fail when an operation requiring safe level below `level` runs at
    /// `level` or above.
    pub fn secure(&self, level: u8) -> Result<(), EvalError> {
        if level <= self.safe_level {
            let operation = self
                .frames
                .top()
                .and_then(|frame| frame.borrow().last_func.clone())
                .unwrap_or_default();
            tracing::debug!(%operation, level = self.safe_level, "insecure operation refused");
            return Err(self.attach_backtrace(insecure_operation(&operation, self.safe_level)));
        }
        Ok(())
    }

    // Globals

    /// Read a global. Unknown globals read as `nil`.
    pub fn global_get(&mut self, name: &str) -> Value {
        match self.globals.get(name) {
            GlobalRead::Value(value) => value,
            GlobalRead::Special(special) => self.read_special(special),
        }
    }

    /// Write a global, returning the stored value.
    pub fn global_set(&mut self, name: &str, value: Value) -> Result<Value, EvalError> {
        let write = self
            .globals
            .set(name, value.clone())
            .map_err(|err| self.attach_backtrace(err))?;
        if let GlobalWrite::Special(special) = write {
            self.write_special(special, value.clone())?;
        }
        Ok(value)
    }

    /// Make `new_name` refer to the same storage as `old_name`.
    pub fn alias_global(&mut self, old_name: &str, new_name: &str) -> Result<(), EvalError> {
        if self.safe_level >= 4 {
            return Err(self.attach_backtrace(insecure_global_alias()));
        }
        self.globals.alias(old_name, new_name);
        Ok(())
    }

    pub fn define_global(&mut self, var: GlobalVariable) {
        self.globals.define(var);
    }

    pub fn define_readonly_global(&mut self, name: &str, value: Value) {
        self.globals.define(GlobalVariable::read_only(name, value));
    }

    pub fn undefine_global(&mut self, name: &str) -> bool {
        self.globals.undefine(name)
    }

    pub fn is_global_defined(&self, name: &str) -> bool {
        self.globals.is_defined(name)
    }

    pub fn global_names(&self) -> Vec<String> {
        self.globals.names()
    }

    fn read_special(&self, special: SpecialGlobal) -> Value {
        match special {
            SpecialGlobal::SafeLevel => Value::int(i64::from(self.safe_level)),
            SpecialGlobal::LastLine => self.last_line(),
            SpecialGlobal::BackRef => self.back_ref(),
        }
    }

    fn write_special(&mut self, special: SpecialGlobal, value: Value) -> Result<(), EvalError> {
        match special {
            SpecialGlobal::SafeLevel => {
                let Value::Int(level) = value else {
                    return Err(self.attach_backtrace(safe_level_not_integer(value.type_name())));
                };
                if level < i64::from(self.safe_level) {
                    return Err(
                        self.attach_backtrace(safe_level_downgrade(self.safe_level, level))
                    );
                }
                let level = u8::try_from(level).unwrap_or(MAX_SAFE_LEVEL);
                self.set_safe_level(level)
            }
            SpecialGlobal::LastLine => {
                self.set_last_line(value);
                Ok(())
            }
            SpecialGlobal::BackRef => {
                self.set_back_ref(value);
                Ok(())
            }
        }
    }

    fn define_default_globals(&mut self) {
        let mut load_path = Vec::new();
        if let Some(dir) = self.config.library_path() {
            load_path.push(Value::string(dir.to_string_lossy()));
        }
        load_path.push(Value::string("."));

        let globals = &mut self.globals;
        globals.define(GlobalVariable::plain("$:", Value::array(load_path)));
        globals.alias("$:", "$LOAD_PATH");
        globals.define(GlobalVariable::plain("$\"", Value::empty_array()));
        globals.alias("$\"", "$LOADED_FEATURES");
        globals.define(GlobalVariable::plain("$/", Value::string("\n")));
        globals.define(GlobalVariable::plain("$,", Value::Nil));
        globals.define(GlobalVariable::plain("$;", Value::Nil));
        globals.define(GlobalVariable::plain("$\\", Value::Nil));
        globals.define(GlobalVariable::plain("$VERBOSE", Value::bool(self.config.verbose)));
        globals.define(GlobalVariable::plain("$DEBUG", Value::bool(self.config.debug)));
        globals.define(GlobalVariable::read_only(
            "$0",
            Value::string(self.config.script_name.as_str()),
        ));
        globals.define(GlobalVariable::read_only(
            "$$",
            Value::int(i64::from(std::process::id())),
        ));
        globals.define(GlobalVariable::special("$SAFE", SpecialGlobal::SafeLevel));
        globals.define(GlobalVariable::special("$_", SpecialGlobal::LastLine));
        globals.define(GlobalVariable::special("$~", SpecialGlobal::BackRef));
    }

    // Special scope slots

    /// `$_` of the current scope; `nil` when the scope has no locals.
    pub fn last_line(&self) -> Value {
        self.special_slot(LAST_LINE_SLOT)
    }

    pub fn set_last_line(&mut self, value: Value) {
        self.set_special_slot(LAST_LINE_SLOT, value);
    }

    /// `$~` of the current scope; `nil` when the scope has no locals.
    pub fn back_ref(&self) -> Value {
        self.special_slot(BACK_REF_SLOT)
    }

    pub fn set_back_ref(&mut self, value: Value) {
        self.set_special_slot(BACK_REF_SLOT, value);
    }

    fn special_slot(&self, slot: usize) -> Value {
        let Some(scope) = self.scopes.top() else {
            return Value::Nil;
        };
        let scope = scope.borrow();
        if scope.has_local_values() {
            scope.get(slot)
        } else {
            Value::Nil
        }
    }

    fn set_special_slot(&mut self, slot: usize, value: Value) {
        let scope = self.current_scope();
        let mut scope = scope.borrow_mut();
        scope.ensure_special_slots();
        scope.set(slot, value);
    }

    // Classes

    #[track_caller]
    pub fn core(&self) -> &CoreClasses {
        match &self.core {
            Some(core) => core,
            None => not_initialized(),
        }
    }

    #[track_caller]
    pub fn exceptions(&self) -> &ExceptionClasses {
        match &self.exceptions {
            Some(exceptions) => exceptions,
            None => not_initialized(),
        }
    }

    #[track_caller]
    pub fn object_class(&self) -> ModuleRef {
        self.core().object.clone()
    }

    /// Define a class, defaulting the superclass to `Object`, and bind it as a
    /// top-level constant.
    #[track_caller]
    pub fn define_class(&mut self, name: &str, superclass: Option<&ModuleRef>) -> ModuleRef {
        let object = self.object_class();
        let superclass = superclass.unwrap_or(&object);
        let class = self.registry.define_class(name, Some(superclass));
        object.define_constant(name, Value::module(&class));
        tracing::trace!(class = name, superclass = %superclass.name(), "class defined");
        class
    }

    /// Define a class whose superclass is given by name.
    #[track_caller]
    pub fn define_class_by_name(&mut self, name: &str, superclass: &str) -> Result<ModuleRef, EvalError> {
        let Some(parent) = self.get_class(superclass) else {
            return Err(self.attach_backtrace(unknown_superclass(superclass)));
        };
        Ok(self.define_class(name, Some(&parent)))
    }

    #[track_caller]
    pub fn define_module(&mut self, name: &str) -> ModuleRef {
        let module = self.registry.define_module(name);
        self.object_class().define_constant(name, Value::module(&module));
        module
    }

    /// Registered class or module.
    pub fn get_module(&self, name: &str) -> Option<ModuleRef> {
        self.registry.get(name).cloned()
    }

    /// Registered class (not a plain module).
    pub fn get_class(&self, name: &str) -> Option<ModuleRef> {
        self.registry.get(name).filter(|module| module.is_class()).cloned()
    }

    pub fn is_class_defined(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn class_names(&self) -> Vec<String> {
        self.registry.names()
    }

    #[track_caller]
    pub fn define_global_constant(&mut self, name: &str, value: Value) {
        self.object_class().define_constant(name, value);
    }

    pub fn get_top_constant(&self, name: &str) -> Option<Value> {
        self.core.as_ref()?.object.constant(name)
    }

    /// The `nil` singleton.
    pub fn nil_value(&self) -> Value {
        Value::Nil
    }

    /// The `true` singleton.
    pub fn true_value(&self) -> Value {
        Value::bool(true)
    }

    /// The `false` singleton.
    pub fn false_value(&self) -> Value {
        Value::bool(false)
    }

    /// Class of any value.
    #[track_caller]
    pub fn class_of(&self, value: &Value) -> ModuleRef {
        let core = self.core();
        match value {
            Value::Nil => core.nil_class.clone(),
            Value::Bool(true) => core.true_class.clone(),
            Value::Bool(false) => core.false_class.clone(),
            Value::Int(_) => core.integer.clone(),
            Value::Float(_) => core.float.clone(),
            Value::Str(_) => core.string.clone(),
            Value::Array(_) => core.array.clone(),
            Value::Object(object) => object.class().clone(),
            Value::Module(module) if module.is_class() => core.class.clone(),
            Value::Module(_) => core.module.clone(),
        }
    }

    /// Exception class an error surfaces as.
    pub fn exception_class_of(&self, err: &EvalError) -> Option<ModuleRef> {
        self.get_class(err.exception_class())
    }

    // Top-level state

    pub fn top_self(&self) -> &Value {
        &self.top_self
    }

    pub fn top_frame(&self) -> Option<&FrameRef> {
        self.top_frame.as_ref()
    }

    pub fn top_scope(&self) -> Option<&ScopeRef> {
        self.top_scope.as_ref()
    }

    pub fn top_namespace(&self) -> Option<&NamespaceRef> {
        self.top_namespace.as_ref()
    }

    pub fn method_scope(&self) -> Visibility {
        self.method_scope
    }

    pub fn set_method_scope(&mut self, visibility: Visibility) {
        self.method_scope = visibility;
    }

    pub fn is_scope(&self, visibility: Visibility) -> bool {
        self.method_scope == visibility
    }

    /// Anonymous module wrapping a `load(file, true)`.
    pub fn wrapper(&self) -> Option<&ModuleRef> {
        self.wrapper.as_ref()
    }

    pub fn set_wrapper(&mut self, wrapper: Option<ModuleRef>) -> Option<ModuleRef> {
        std::mem::replace(&mut self.wrapper, wrapper)
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn set_source_file(&mut self, file: &str) {
        file.clone_into(&mut self.source_file);
    }

    pub fn source_line(&self) -> u32 {
        self.source_line
    }

    pub fn set_source_line(&mut self, line: u32) {
        self.source_line = line;
    }

    /// `file:line` of the code being evaluated.
    pub fn position(&self) -> String {
        format!("{}:{}", self.source_file, self.source_line)
    }

    pub fn verbose(&self) -> bool {
        self.config.verbose
    }

    pub fn debug(&self) -> bool {
        self.config.debug
    }

    /// Whether code is running inside `eval`.
    pub fn in_eval(&self) -> bool {
        self.in_eval > 0
    }

    pub fn enter_eval(&mut self) {
        self.in_eval += 1;
    }

    pub fn leave_eval(&mut self) {
        self.in_eval = self.in_eval.saturating_sub(1);
    }

    // Errors

    /// Snapshot of the frame stack, innermost first.
    pub fn backtrace(&self) -> EvalBacktrace {
        EvalBacktrace::new(
            self.frames
                .iter()
                .rev()
                .map(|frame| BacktraceFrame {
                    name: frame.borrow().display_name().to_string(),
                })
                .collect(),
        )
    }

    pub(crate) fn attach_backtrace(&self, err: EvalError) -> EvalError {
        if err.backtrace.is_some() {
            return err;
        }
        err.with_backtrace(self.backtrace())
    }

    /// Write an action that escaped to the top level to the error stream.
    pub fn report(&self, action: &ControlAction) {
        tracing::debug!(signal = action.signal_name(), "reporting escaped action");
        let text = match action {
            ControlAction::Break(_) => "break without block.".to_string(),
            ControlAction::Return(_) => "return without block.".to_string(),
            other => {
                let err = other.clone().into_eval_error();
                let mut text = format!("{}: {}", err.exception_class(), err.message);
                if let Some(backtrace) = err.backtrace.as_ref().filter(|bt| !bt.is_empty()) {
                    text.push('\n');
                    text.push_str(backtrace.to_string().trim_end());
                }
                text
            }
        };
        self.error_stream.println(&text);
    }

    pub fn error_stream(&self) -> &SharedErrorStream {
        &self.error_stream
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cold]
#[track_caller]
fn not_initialized() -> ! {
    panic!("internal error: runtime used before init() (interpreter bug)")
}

#[cfg(test)]
mod tests;
