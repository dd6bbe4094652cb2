use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

use crate::command::ExitCode;

/// Mutable, user-level view of the process environment used by the shell.
///
/// The environment contains:
/// - `vars`: a map of environment variables visible to executed commands.
/// - `current_dir`: the working directory for command execution.
/// - `should_exit`: a flag the loop checks to know when to terminate.
/// - `last_status`: the exit code of the most recently dispatched command.
///
/// Inline builtins mutate this context directly; forked builtins see a
/// copy that dies with the child.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// When set to true, indicates that the interactive loop should exit.
    pub should_exit: bool,
    /// Exit code of the last dispatched command; also the shell's own
    /// eventual exit status.
    pub last_status: ExitCode,
}

impl Environment {
    /// Capture the current process state into a new `Environment`.
    ///
    /// Copies variables from `std::env::vars()` and initializes
    /// `current_dir` from `std::env::current_dir()`. `HOME` and `PWD` are
    /// given defaults when absent; existing values are never overridden.
    pub fn new() -> Self {
        let mut vars = HashMap::new();
        for (k, v) in stdenv::vars() {
            vars.insert(k, v);
        }
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        vars.entry("HOME".to_string()).or_insert_with(|| "/".to_string());
        vars.entry("PWD".to_string())
            .or_insert_with(|| current_dir.display().to_string());
        Self {
            vars,
            current_dir,
            should_exit: false,
            last_status: 0,
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Working directory shown in the prompt.
    ///
    /// Resolution order: the `PWD` variable, then a live query of the
    /// process working directory, then the literal `(null)`.
    pub fn prompt_dir(&self) -> String {
        if let Some(dir) = self.get_var("PWD") {
            return dir;
        }
        match stdenv::current_dir() {
            Ok(dir) => dir.display().to_string(),
            Err(_) => String::from("(null)"),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
