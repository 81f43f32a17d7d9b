//! Source compilation and load-path resolution.

use std::path::{Path, PathBuf};

use garnet_value::{load_failed, EvalError, Value};

use super::Runtime;
use crate::parser::Parser;

/// Environment variable whose entries are prepended to the load path.
pub const LIB_PATH_VAR: &str = "RUBYLIB";

impl Runtime {
    /// Parse `source` against the current scope's locals. Names the parser
    /// introduces become locals of the current scope.
    pub fn compile<P: Parser>(
        &mut self,
        parser: &mut P,
        source: &str,
        file: &str,
        line: u32,
    ) -> Result<P::Ast, EvalError> {
        let scope = self.current_scope();
        let known = scope.borrow().local_names().to_vec();
        let output = parser
            .parse(source, file, line, &known)
            .map_err(|err| self.attach_backtrace(err))?;
        if let Some(names) = output.local_names {
            tracing::trace!(file, added = names.len().saturating_sub(known.len()), "locals extended");
            scope.borrow_mut().set_local_names(names);
        }
        Ok(output.ast)
    }

    /// Prepend `include_dirs`, then the entries of `RUBYLIB`, to `$:`.
    pub fn init_load(&mut self, include_dirs: &[PathBuf]) {
        let mut front: Vec<Value> = include_dirs
            .iter()
            .map(|dir| Value::string(dir.to_string_lossy()))
            .collect();
        if let Some(lib) = std::env::var_os(LIB_PATH_VAR) {
            front.extend(
                std::env::split_paths(&lib)
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .map(|dir| Value::string(dir.to_string_lossy())),
            );
        }

        let load_path = self.global_get("$:");
        let mut entries = front;
        entries.extend(load_path.array_items().unwrap_or_default());
        tracing::debug!(entries = entries.len(), "load path initialized");
        if let Err(err) = self.global_set("$:", Value::array(entries)) {
            tracing::warn!(error = %err, "could not update the load path");
        }
    }

    /// Current `$:` entries.
    pub fn load_path(&mut self) -> Vec<PathBuf> {
        self.global_get("$:")
            .array_items()
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| entry.as_str().map(PathBuf::from))
            .collect()
    }

    /// Resolve `path`: relative paths are tried against each load-path entry
    /// in order, then as given.
    pub fn find_file(&mut self, path: &Path) -> Result<PathBuf, EvalError> {
        if path.is_relative() {
            for dir in self.load_path() {
                let candidate = dir.join(path);
                if candidate.exists() {
                    return Ok(candidate);
                }
            }
        }
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        tracing::debug!(path = %path.display(), "file not found on load path");
        Err(self.attach_backtrace(load_failed(&path.to_string_lossy())))
    }
}
