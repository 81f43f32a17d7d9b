//! Runtime configuration.

use std::path::PathBuf;

/// Highest safe level.
pub const MAX_SAFE_LEVEL: u8 = 4;

/// Settings fixed when a runtime is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Initial safe level, `0..=4`.
    pub safe_level: u8,
    /// Initial value of `$VERBOSE`.
    pub verbose: bool,
    /// Initial value of `$DEBUG`.
    pub debug: bool,
    /// Frame-stack depth at which calls fail with `SystemStackError`;
    /// `None` means unbounded.
    pub max_call_depth: Option<usize>,
    /// Standard library directory appended to the load path.
    pub lib_dir: Option<PathBuf>,
    /// Installation home, used for `lib/ruby` beneath it when `lib_dir` is
    /// not given.
    pub home_dir: Option<PathBuf>,
    /// Initial `$0`.
    pub script_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            safe_level: 0,
            verbose: false,
            debug: false,
            max_call_depth: Some(10_000),
            lib_dir: None,
            home_dir: None,
            script_name: "-".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Directory appended to the load path at init, if any.
    pub fn library_path(&self) -> Option<PathBuf> {
        self.lib_dir
            .clone()
            .or_else(|| self.home_dir.as_ref().map(|home| home.join("lib").join("ruby")))
    }
}

/// Default visibility for methods defined in the current scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Protected,
    ModuleFunction,
}
