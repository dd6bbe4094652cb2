use std::io::{self, Write};

use crate::command::{self, ExitCode};
use crate::env::Environment;
use crate::lexer;
use crate::line;

/// The interactive command runner.
///
/// Owns the shell [`Environment`] and drives the read-tokenize-dispatch
/// loop until the exit builtin flips the running flag or input reaches
/// end-of-stream.
///
/// Example
/// ```
/// use tinysh::Interpreter;
/// let mut sh = Interpreter::new();
/// let code = sh.execute_line("help");
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
}

impl Interpreter {
    /// Create an interpreter over a freshly captured process environment.
    pub fn new() -> Self {
        command::check_table();
        Self {
            env: Environment::new(),
        }
    }

    /// Shared shell context, mainly useful for inspection in tests.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Tokenize and dispatch a single line.
    ///
    /// The last observed status is recorded only when the line actually
    /// named a command; blank lines leave it untouched.
    pub fn execute_line(&mut self, input: &str) -> ExitCode {
        let Some(tokens) = lexer::split_line(input) else {
            return command::NO_COMMAND;
        };
        let code = command::execute(&tokens, &mut self.env);
        if !tokens.is_empty() {
            self.env.last_status = code;
        }
        code
    }

    /// Run the interactive loop until termination.
    ///
    /// Returns the shell's own exit status: the last observed command
    /// status. End-of-input is treated as an exit request, the same as the
    /// exit builtin.
    pub fn repl(&mut self) -> ExitCode {
        self.banner();

        let mut input = io::stdin().lock();
        while !self.env.should_exit {
            self.prompt();

            match line::read_line(&mut input) {
                Some(text) => {
                    self.execute_line(&text);
                }
                None => {
                    log::debug!("end of input, leaving the loop");
                    self.env.should_exit = true;
                    println!();
                }
            }

            let _ = io::stdout().flush();
        }
        self.env.last_status
    }

    fn banner(&self) {
        println!();
        println!("Welcome to tinysh {}", env!("CARGO_PKG_VERSION"));
        println!("Type 'help' for a list of commands");
        println!();
    }

    /// Write the `dir$ ` prompt and flush so it is visible while the read
    /// below blocks.
    fn prompt(&self) {
        let mut out = io::stdout();
        let _ = write!(out, "{}$ ", self.env.prompt_dir());
        let _ = out.flush();
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env as stdenv;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Mutex, MutexGuard, OnceLock};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn lock_current_dir() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX.get_or_init(|| Mutex::new(())).lock().unwrap()
    }

    fn make_unique_temp_dir(tag: &str) -> PathBuf {
        let mut p = stdenv::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("tinysh_repl_{}_{}_{}", tag, std::process::id(), nanos));
        fs::create_dir_all(&p).unwrap();
        p
    }

    #[test]
    fn test_exit_transitions_to_terminated() {
        let mut sh = Interpreter::new();
        assert!(!sh.env().should_exit);

        sh.execute_line("exit");
        assert!(sh.env().should_exit);
    }

    #[test]
    fn test_exit_code_becomes_the_shell_status() {
        let mut sh = Interpreter::new();
        let code = sh.execute_line("exit 3");
        assert_eq!(code, 3);
        assert_eq!(sh.env().last_status, 3);
    }

    #[test]
    fn test_blank_line_does_not_touch_the_status() {
        let mut sh = Interpreter::new();
        sh.execute_line("exit 3");
        let code = sh.execute_line("   \t ");
        assert_eq!(code, command::NO_COMMAND);
        assert_eq!(sh.env().last_status, 3);
    }

    #[test]
    fn test_unknown_command_yields_the_sentinel() {
        let mut sh = Interpreter::new();
        let code = sh.execute_line("frobnicate");
        assert_eq!(code, command::NO_COMMAND);
        assert!(!sh.env().should_exit);
    }

    #[test]
    fn test_forked_command_status_is_observed() {
        // sleep runs in a child; its exit status must round-trip through
        // the executor into the shell's bookkeeping.
        let mut sh = Interpreter::new();
        let code = sh.execute_line("sleep 0");
        assert_eq!(code, 0);
        assert_eq!(sh.env().last_status, 0);
    }

    #[test]
    fn test_forked_usage_error_status_is_observed() {
        let mut sh = Interpreter::new();
        let code = sh.execute_line("sleep not-a-number");
        assert_eq!(code, 1);
        assert_eq!(sh.env().last_status, 1);
    }

    #[test]
    fn test_cd_changes_the_next_prompt_directory() {
        let _lock = lock_current_dir();
        let temp = make_unique_temp_dir("cd_prompt");
        let canonical = fs::canonicalize(&temp).unwrap();
        let orig = stdenv::current_dir().unwrap();

        let mut sh = Interpreter::new();
        let code = sh.execute_line(&format!("cd {}", canonical.display()));

        stdenv::set_current_dir(&orig).unwrap();

        assert_eq!(code, 0);
        assert_eq!(sh.env().prompt_dir(), canonical.display().to_string());

        let _ = fs::remove_dir_all(&temp);
    }
}
