//! Execution-context core of the Garnet interpreter.
//!
//! The [`Runtime`] holds everything an evaluator needs besides the tree it
//! walks: the frame, scope, block, iterator and open-class stacks; the
//! dynamic-variable chain; the lexical namespace; the global variable table;
//! the safe level; and the class registry. It implements the two block
//! protocols, [`Runtime::yield_block`] and [`Runtime::iterate`], together
//! with the non-local exits (`break`, `next`, `redo`, `retry`, `return`,
//! `throw`) that flow through them as [`ControlAction`]s.
//!
//! # Usage
//!
//! ```text
//! let mut rt = RuntimeBuilder::new().build_initialized();
//! let block = rt.new_block(BlockParams::Pattern(ParamPattern::name("x")), body);
//! rt.call_with_block(block, |rt| {
//!     rt.invoke_frame(receiver, "each", |rt| rt.yield_block(Some(item), None, None, false))
//! })?;
//! ```

#![allow(
    clippy::result_large_err,
    reason = "ControlAction carries EvalError inline"
)]

mod binder;
mod block;
mod class_stack;
mod classes;
mod config;
mod context_stack;
mod dyn_vars;
mod frame;
mod globals;
mod namespace;
mod output;
mod parser;
mod runtime;
mod scope;
mod shared;

use std::sync::Once;

pub use binder::{DynVarBinder, ParamBinder};
pub use block::{Block, BlockBody, BlockFn, BlockParams, BlockRef, ParamPattern};
pub use class_stack::ClassStack;
pub use classes::{ClassRegistry, CoreClasses, ExceptionClasses};
pub use config::{RuntimeConfig, Visibility, MAX_SAFE_LEVEL};
pub use context_stack::ContextStack;
pub use dyn_vars::DynamicVars;
pub use frame::{Frame, FrameRef, Iter};
pub use globals::{
    GlobalKind, GlobalRead, GlobalRef, GlobalTable, GlobalVariable, GlobalWrite, SpecialGlobal,
};
pub use namespace::{Namespace, NamespaceRef};
pub use output::{
    buffer_stream, silent_stream, stderr_stream, BufferErrorStream, ErrorStream,
    SharedErrorStream,
};
pub use parser::{ParseOutput, Parser};
pub use runtime::{BlockActivation, ModuleBody, Runtime, RuntimeBuilder};
pub use scope::{Scope, ScopeRef, BACK_REF_SLOT, LAST_LINE_SLOT, SPECIAL_SLOT_NAMES};
pub use shared::Shared;

pub use garnet_value::{ControlAction, EvalError, EvalResult, ModuleRef, Value};

static TRACING_INIT: Once = Once::new();

/// Initialize the tracing subscriber.
///
/// Call once at startup. Subsequent calls are no-ops. Only installs a
/// subscriber when `RUST_LOG` is set, e.g.
/// `RUST_LOG=garnet_runtime=trace` to see every block activation.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
