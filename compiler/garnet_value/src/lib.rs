#![allow(
    clippy::result_large_err,
    reason = "ControlAction carries EvalError inline; boxing would touch every protocol layer"
)]
//! Garnet Value - runtime values and error types for the Garnet runtime.
//!
//! This crate provides:
//! - Runtime values (`Value`, `Heap`) with the minimal shape the control
//!   protocols inspect (nil/boolean identity, array arity and element access)
//! - Class and module objects (`RModule`, `RObject`, `ModuleRef`)
//! - Evaluation errors (`EvalError`, `EvalErrorKind`) and the non-local
//!   control signals that travel beside them (`ControlAction`, `EvalResult`)
//!
//! # Single-Context Ownership
//!
//! Heap values use `Rc`, not `Arc`. One execution context owns every value it
//! creates; independent contexts never share mutable objects.

mod errors;
mod module;
mod value;

pub use errors::{
    escaped_signal, insecure_global_alias, insecure_operation, load_failed, no_block_given,
    read_only_global, safe_level_downgrade, safe_level_not_integer, stack_depth_exceeded,
    uncaught_throw, unknown_superclass, wrong_arg_count, wrong_block_arity, BacktraceFrame,
    ControlAction, EvalBacktrace, EvalError, EvalErrorKind, EvalResult,
};
pub use module::{ModuleKind, ModuleRef, RModule, RObject};
pub use value::{Heap, Value};
