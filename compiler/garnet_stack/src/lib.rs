//! Host stack safety for re-entrant activations.
//!
//! Every block activation and native iteration in the runtime nests on the
//! host call stack: a script that yields inside a yield inside a method call
//! recurses through `Runtime::yield_block` once per level. This crate keeps
//! those nestings from overflowing the native stack by growing it on demand.
//!
//! - **Native targets**: `stacker` allocates a fresh segment when the red zone
//!   is reached.
//! - **WASM targets**: passthrough; the engine manages its own stack.
//!
//! ```text
//! fn run_body(rt: &mut Runtime, body: &BlockBody) -> EvalResult {
//!     ensure_sufficient_stack(|| body.call(rt, &self_value, &args))
//! }
//! ```

/// Grow the stack when fewer than this many bytes remain (128KB).
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment (2MB).
///
/// Block bodies carry more host frames per level than a plain recursive
/// function, so segments are larger than the red zone by a wide margin.
const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, growing the host stack first if the red zone has been reached.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// WASM version: call directly.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// Bytes of host stack remaining, when the platform can tell.
#[cfg(not(target_arch = "wasm32"))]
pub fn remaining_stack() -> Option<usize> {
    stacker::remaining_stack()
}

/// WASM version: unknown.
#[cfg(target_arch = "wasm32")]
pub fn remaining_stack() -> Option<usize> {
    None
}
