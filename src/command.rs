//! The builtin command table and the dispatcher that consults it.

use std::io::{self, Write};

use crate::builtin::{self, entry};
use crate::env::Environment;
use crate::executor;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line
/// tools.
pub type ExitCode = i32;

/// Sentinel status for iterations that executed nothing: an empty line,
/// an unknown command, or a child that could not be created.
pub const NO_COMMAND: ExitCode = -1;

/// How a command's handler runs.
///
/// Builtins that must mutate the shell's own process state (the working
/// directory, the environment, the loop itself) are `Inline`; everything
/// else is `Forked` so a crash or hang inside a handler cannot take down
/// the interactive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Run the handler directly in the shell process.
    Inline,
    /// Run the handler in a forked child and reap its exit status.
    Forked,
}

/// Handler entry point: arguments (without the command name), the output
/// stream, and the shell context.
pub type Handler = fn(&[&str], &mut dyn Write, &mut Environment) -> ExitCode;

/// One row of the command table.
pub struct CommandSpec {
    /// Name the user types. Unique across the table.
    pub name: &'static str,
    /// Entry point invoked with the remaining arguments.
    pub run: Handler,
    /// Whether the handler runs inline or in a child process.
    pub mode: Mode,
}

/// The process-wide command table, read-only and alive for the whole
/// program. Lookup is a linear scan; first match wins.
pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "cd", run: entry::<builtin::Cd>, mode: Mode::Inline },
    CommandSpec { name: "cp", run: entry::<builtin::Cp>, mode: Mode::Forked },
    CommandSpec { name: "dmesg", run: entry::<builtin::Dmesg>, mode: Mode::Forked },
    CommandSpec { name: "env", run: entry::<builtin::Env>, mode: Mode::Inline },
    CommandSpec { name: "exit", run: entry::<builtin::Exit>, mode: Mode::Inline },
    CommandSpec { name: "help", run: entry::<builtin::Help>, mode: Mode::Forked },
    CommandSpec { name: "id", run: entry::<builtin::Id>, mode: Mode::Forked },
    CommandSpec { name: "jailbreak", run: entry::<builtin::Jailbreak>, mode: Mode::Inline },
    CommandSpec { name: "kill", run: entry::<builtin::Kill>, mode: Mode::Forked },
    CommandSpec { name: "ls", run: entry::<builtin::Ls>, mode: Mode::Forked },
    CommandSpec { name: "mkdir", run: entry::<builtin::Mkdir>, mode: Mode::Forked },
    CommandSpec { name: "mount", run: entry::<builtin::Mount>, mode: Mode::Forked },
    CommandSpec { name: "pwd", run: entry::<builtin::Pwd>, mode: Mode::Forked },
    CommandSpec { name: "rmdir", run: entry::<builtin::Rmdir>, mode: Mode::Forked },
    CommandSpec { name: "sleep", run: entry::<builtin::Sleep>, mode: Mode::Forked },
    CommandSpec { name: "stat", run: entry::<builtin::Stat>, mode: Mode::Forked },
    CommandSpec { name: "uname", run: entry::<builtin::Uname>, mode: Mode::Forked },
];

/// Find a command by exact, case-sensitive name.
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|cmd| cmd.name == name)
}

/// Table sanity check run once at interpreter construction.
pub(crate) fn check_table() {
    for (i, cmd) in COMMANDS.iter().enumerate() {
        debug_assert!(
            COMMANDS[..i].iter().all(|prev| prev.name != cmd.name),
            "duplicate command name: {}",
            cmd.name
        );
    }
}

/// Dispatch one argument vector, writing command output to stdout.
pub(crate) fn execute(argv: &[&str], env: &mut Environment) -> ExitCode {
    execute_with(argv, &mut io::stdout(), env)
}

/// Dispatch one argument vector.
///
/// An empty vector is "nothing to execute" and short-circuits before any
/// table scan. An unknown name prints a user-facing message and keeps the
/// loop going; it is not an error.
pub(crate) fn execute_with(
    argv: &[&str],
    stdout: &mut dyn Write,
    env: &mut Environment,
) -> ExitCode {
    let Some((&name, args)) = argv.split_first() else {
        return NO_COMMAND;
    };

    let Some(cmd) = lookup(name) else {
        let _ = writeln!(stdout, "{name}: command not found");
        return NO_COMMAND;
    };

    log::debug!("dispatching {name} ({:?})", cmd.mode);
    match cmd.mode {
        Mode::Forked => executor::run_forked(cmd.run, args, env),
        Mode::Inline => (cmd.run)(args, stdout, env),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn test_env() -> Environment {
        Environment {
            vars: HashMap::new(),
            current_dir: PathBuf::from("/"),
            should_exit: false,
            last_status: 0,
        }
    }

    #[test]
    fn test_table_has_no_duplicate_names() {
        let mut seen = HashSet::new();
        for cmd in COMMANDS {
            assert!(seen.insert(cmd.name), "duplicate entry: {}", cmd.name);
        }
    }

    #[test]
    fn test_table_registers_the_whole_surface() {
        let names: Vec<&str> = COMMANDS.iter().map(|cmd| cmd.name).collect();
        assert_eq!(
            names,
            [
                "cd", "cp", "dmesg", "env", "exit", "help", "id", "jailbreak", "kill", "ls",
                "mkdir", "mount", "pwd", "rmdir", "sleep", "stat", "uname",
            ]
        );
    }

    #[test]
    fn test_state_mutating_builtins_are_inline() {
        for name in ["cd", "env", "exit", "jailbreak"] {
            let cmd = lookup(name).expect("missing table entry");
            assert_eq!(cmd.mode, Mode::Inline, "{name} must run in-process");
        }
    }

    #[test]
    fn test_everything_else_is_forked() {
        let inline: HashSet<&str> = ["cd", "env", "exit", "jailbreak"].into();
        for cmd in COMMANDS {
            if !inline.contains(cmd.name) {
                assert_eq!(cmd.mode, Mode::Forked, "{} must fork", cmd.name);
            }
        }
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert!(lookup("ls").is_some());
        assert!(lookup("LS").is_none());
        assert!(lookup("Ls").is_none());
    }

    #[test]
    fn test_empty_argv_is_a_noop() {
        let mut env = test_env();
        let mut out = Vec::new();
        let code = execute_with(&[], &mut out, &mut env);
        assert_eq!(code, NO_COMMAND);
        assert!(out.is_empty(), "no-op iterations must print nothing");
    }

    #[test]
    fn test_unknown_command_reports_and_continues() {
        let mut env = test_env();
        let mut out = Vec::new();
        let code = execute_with(&["frobnicate", "--hard"], &mut out, &mut env);
        assert_eq!(code, NO_COMMAND);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "frobnicate: command not found\n"
        );
        assert!(!env.should_exit);
    }

    #[test]
    fn test_inline_dispatch_reaches_the_handler() {
        let mut env = test_env();
        let mut out = Vec::new();
        let code = execute_with(&["exit", "5"], &mut out, &mut env);
        assert_eq!(code, 5);
        assert!(env.should_exit);
    }
}
