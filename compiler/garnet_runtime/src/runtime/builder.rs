//! `RuntimeBuilder` for creating `Runtime` instances with various
//! configurations.

use std::path::PathBuf;
use std::rc::Rc;

use garnet_value::Value;

use super::Runtime;
use crate::binder::{DynVarBinder, ParamBinder};
use crate::class_stack::ClassStack;
use crate::classes::ClassRegistry;
use crate::config::{RuntimeConfig, Visibility, MAX_SAFE_LEVEL};
use crate::context_stack::ContextStack;
use crate::dyn_vars::DynamicVars;
use crate::globals::GlobalTable;
use crate::output::{stderr_stream, SharedErrorStream};

/// Builder for `Runtime`.
///
/// The built runtime is not yet initialized; call [`Runtime::init`] (or use
/// [`RuntimeBuilder::build_initialized`]).
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    binder: Option<Rc<dyn ParamBinder>>,
    error_stream: Option<SharedErrorStream>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            binder: None,
            error_stream: None,
        }
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial safe level. Values above the maximum are clamped.
    #[must_use]
    pub fn safe_level(mut self, level: u8) -> Self {
        self.config.safe_level = level.min(MAX_SAFE_LEVEL);
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Frame-depth limit; `None` disables the check.
    #[must_use]
    pub fn max_call_depth(mut self, depth: Option<usize>) -> Self {
        self.config.max_call_depth = depth;
        self
    }

    #[must_use]
    pub fn lib_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.lib_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn home_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.home_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn script_name(mut self, name: &str) -> Self {
        self.config.script_name = name.to_string();
        self
    }

    /// Block-parameter binder. Defaults to [`DynVarBinder`].
    #[must_use]
    pub fn binder(mut self, binder: Rc<dyn ParamBinder>) -> Self {
        self.binder = Some(binder);
        self
    }

    /// Destination for [`Runtime::report`]. Defaults to stderr.
    #[must_use]
    pub fn error_stream(mut self, stream: SharedErrorStream) -> Self {
        self.error_stream = Some(stream);
        self
    }

    pub fn build(self) -> Runtime {
        let config = self.config;
        Runtime {
            safe_level: config.safe_level.min(MAX_SAFE_LEVEL),
            initialized: false,
            frames: ContextStack::new("frame"),
            scopes: ContextStack::new("scope"),
            blocks: ContextStack::new("block"),
            iters: ContextStack::new("iterator"),
            classes: ClassStack::new(),
            dyn_vars: DynamicVars::new(),
            namespace: None,
            globals: GlobalTable::new(),
            registry: ClassRegistry::new(),
            core: None,
            exceptions: None,
            top_self: Value::Nil,
            top_frame: None,
            top_scope: None,
            top_namespace: None,
            method_scope: Visibility::Public,
            wrapper: None,
            source_file: String::new(),
            source_line: 0,
            in_eval: 0,
            binder: self.binder.unwrap_or_else(|| Rc::new(DynVarBinder)),
            error_stream: self.error_stream.unwrap_or_else(stderr_stream),
            config,
        }
    }

    /// Build and run [`Runtime::init`].
    pub fn build_initialized(self) -> Runtime {
        let mut runtime = self.build();
        runtime.init();
        runtime
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
