//! Evaluation errors and non-local control signals.
//!
//! Two things travel on the `Err` side of an `EvalResult`:
//!
//! - **Failures** (`EvalError`): security violations, arity mismatches, load
//!   failures. Always surfaced to the caller.
//! - **Control signals** (`ControlAction::Break`, `Next`, `Redo`, `Retry`,
//!   `Return`, `Throw`): language-level non-local exits. Each is consumed by
//!   the one protocol layer that gives it meaning and passed through untouched
//!   by every other layer.
//!
//! Factory functions (e.g. `no_block_given()`) are the public constructors;
//! they populate both `kind` and `message`.

use std::fmt;

use crate::value::Value;

/// Result of evaluating anything that may exit non-locally.
pub type EvalResult = Result<Value, ControlAction>;

/// Typed error category.
///
/// `Display` produces the user-facing message; `exception_class` names the
/// language-level exception class the error surfaces as.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvalErrorKind {
    #[error("wrong # of arguments ({got} for {expected})")]
    ArityMismatch { expected: usize, got: usize },

    #[error("{message}")]
    Security { message: String },

    /// A control signal used where nothing can catch it.
    #[error("{message}")]
    LocalJump { message: String },

    #[error("No such file to load -- {path}")]
    LoadFailed { path: String },

    #[error("{name} is a read-only variable")]
    ReadOnlyGlobal { name: String },

    #[error("undefined superclass '{name}'")]
    UnknownSuperclass { name: String },

    #[error("uncaught throw `{tag}'")]
    UncaughtThrow { tag: String },

    #[error("stack level too deep (limit: {depth})")]
    StackDepthExceeded { depth: usize },

    /// Catch-all for errors raised by collaborators with a bare message.
    #[error("{message}")]
    Custom { message: String },
}

impl EvalErrorKind {
    /// Name of the exception class this error surfaces as.
    pub fn exception_class(&self) -> &'static str {
        match self {
            Self::ArityMismatch { .. } | Self::UncaughtThrow { .. } => "ArgumentError",
            Self::Security { .. } => "SecurityError",
            Self::LocalJump { .. } => "LocalJumpError",
            Self::LoadFailed { .. } => "LoadError",
            Self::ReadOnlyGlobal { .. } | Self::UnknownSuperclass { .. } => "NameError",
            Self::StackDepthExceeded { .. } => "SystemStackError",
            Self::Custom { .. } => "RuntimeError",
        }
    }

    /// Variant name, for tests and logging.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::ArityMismatch { .. } => "ArityMismatch",
            Self::Security { .. } => "Security",
            Self::LocalJump { .. } => "LocalJump",
            Self::LoadFailed { .. } => "LoadFailed",
            Self::ReadOnlyGlobal { .. } => "ReadOnlyGlobal",
            Self::UnknownSuperclass { .. } => "UnknownSuperclass",
            Self::UncaughtThrow { .. } => "UncaughtThrow",
            Self::StackDepthExceeded { .. } => "StackDepthExceeded",
            Self::Custom { .. } => "Custom",
        }
    }
}

/// One entry of an error backtrace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BacktraceFrame {
    /// Method name of the frame, or `<main>` for the top frame.
    pub name: String,
}

/// Snapshot of the frame stack at an error site, innermost first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalBacktrace {
    frames: Vec<BacktraceFrame>,
}

impl EvalBacktrace {
    pub fn new(frames: Vec<BacktraceFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[BacktraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Display for EvalBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in &self.frames {
            writeln!(f, "\tfrom {}", frame.name)?;
        }
        Ok(())
    }
}

/// Evaluation error.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct EvalError {
    /// Structured category.
    pub kind: EvalErrorKind,
    /// Human-readable message; equals `kind.to_string()` for factory errors.
    pub message: String,
    /// Frame stack at the error site, when the runtime attached one.
    pub backtrace: Option<EvalBacktrace>,
}

impl EvalError {
    /// Error with a bare message (`Custom` kind).
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: EvalErrorKind::Custom {
                message: message.clone(),
            },
            message,
            backtrace: None,
        }
    }

    fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            backtrace: None,
        }
    }

    #[must_use]
    pub fn with_backtrace(mut self, backtrace: EvalBacktrace) -> Self {
        self.backtrace = Some(backtrace);
        self
    }

    /// Name of the exception class this error surfaces as.
    #[inline]
    pub fn exception_class(&self) -> &'static str {
        self.kind.exception_class()
    }
}

/// Outcome on the `Err` side of `EvalResult`.
#[derive(Clone, Debug)]
pub enum ControlAction {
    /// A genuine failure.
    Error(EvalError),
    /// `break`: leave the call that received the block, carrying a value.
    Break(Value),
    /// `next`: finish the current block activation early.
    Next,
    /// `redo`: restart the current block body with the same arguments.
    Redo,
    /// `retry`: restart the whole iterator call.
    Retry,
    /// `return`: leave the enclosing method, carrying a value.
    Return(Value),
    /// `throw tag, value`: unwind to the matching `catch`.
    Throw { tag: Value, value: Value },
}

impl ControlAction {
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, ControlAction::Error(_))
    }

    /// Short keyword naming the action, for logging.
    pub fn signal_name(&self) -> &'static str {
        match self {
            ControlAction::Error(_) => "error",
            ControlAction::Break(_) => "break",
            ControlAction::Next => "next",
            ControlAction::Redo => "redo",
            ControlAction::Retry => "retry",
            ControlAction::Return(_) => "return",
            ControlAction::Throw { .. } => "throw",
        }
    }

    /// Convert to an `EvalError`, turning a signal that escaped every handler
    /// into the matching "used out of context" error.
    pub fn into_eval_error(self) -> EvalError {
        match self {
            ControlAction::Error(err) => err,
            ControlAction::Throw { tag, .. } => uncaught_throw(&tag),
            signal => escaped_signal(signal.signal_name()),
        }
    }
}

impl From<EvalError> for ControlAction {
    #[inline]
    fn from(err: EvalError) -> Self {
        ControlAction::Error(err)
    }
}

// Control Flow Errors

/// `yield` with no block supplied to the current call.
#[cold]
pub fn no_block_given() -> EvalError {
    EvalError::from_kind(EvalErrorKind::LocalJump {
        message: "no block given".to_string(),
    })
}

/// A control signal reached a point where nothing handles it.
#[cold]
pub fn escaped_signal(signal: &str) -> EvalError {
    let message = match signal {
        "break" => "break from proc-closure".to_string(),
        "retry" => "retry outside of rescue clause".to_string(),
        other => format!("unexpected {other}"),
    };
    EvalError::from_kind(EvalErrorKind::LocalJump { message })
}

/// `throw` with no matching `catch`.
#[cold]
pub fn uncaught_throw(tag: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UncaughtThrow {
        tag: tag.to_string(),
    })
}

// Argument Errors

/// A `||` block received arguments under strict arity checking.
#[cold]
pub fn wrong_block_arity(got: usize) -> EvalError {
    wrong_arg_count(0, got)
}

/// Wrong number of arguments.
#[cold]
pub fn wrong_arg_count(expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch { expected, got })
}

// Security Errors

/// Operation forbidden at the current safe level.
#[cold]
pub fn insecure_operation(operation: &str, level: u8) -> EvalError {
    let message = if operation.is_empty() {
        format!("Insecure operation at level {level}")
    } else {
        format!("Insecure operation '{operation}' at level {level}")
    };
    EvalError::from_kind(EvalErrorKind::Security { message })
}

/// Global aliasing at safe level 4 or above.
#[cold]
pub fn insecure_global_alias() -> EvalError {
    EvalError::from_kind(EvalErrorKind::Security {
        message: "Insecure: can't alias global variable".to_string(),
    })
}

/// Attempt to lower the safe level through `$SAFE`.
#[cold]
pub fn safe_level_downgrade(current: u8, requested: i64) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Security {
        message: format!("tried to downgrade safe level from {current} to {requested}"),
    })
}

/// `$SAFE` assigned something other than an integer.
#[cold]
pub fn safe_level_not_integer(type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Security {
        message: format!("$SAFE must be an integer, not {type_name}"),
    })
}

// Definition Errors

/// Write to a read-only global.
#[cold]
pub fn read_only_global(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ReadOnlyGlobal {
        name: name.to_string(),
    })
}

/// Class defined against a superclass name that is not registered.
#[cold]
pub fn unknown_superclass(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnknownSuperclass {
        name: name.to_string(),
    })
}

// Resource Errors

/// Script not found on the load path.
#[cold]
pub fn load_failed(path: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::LoadFailed {
        path: path.to_string(),
    })
}

/// Frame stack hit the configured depth limit.
#[cold]
pub fn stack_depth_exceeded(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StackDepthExceeded { depth })
}
