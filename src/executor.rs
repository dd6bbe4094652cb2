//! Runs a command handler in a forked child and reaps its exit status.

use std::io::{self, Write};
use std::process;

use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};

use crate::command::{ExitCode, Handler, NO_COMMAND};
use crate::env::Environment;

/// Run `handler` in a freshly forked child, blocking until the child
/// terminates.
///
/// In the child the handler's return value is the only exit path: it is
/// passed straight to `process::exit` after flushing stdout. The parent
/// waits through stop notifications until the child has exited or been
/// killed by a signal. Fork failure is reported to stderr and yields the
/// no-command sentinel without blocking.
pub(crate) fn run_forked(handler: Handler, args: &[&str], env: &mut Environment) -> ExitCode {
    // The child runs the handler and exits without returning to the loop.
    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            let code = handler(args, &mut io::stdout(), env);
            let _ = io::stdout().flush();
            process::exit(code);
        }
        Ok(ForkResult::Parent { child }) => wait_for(child),
        Err(err) => {
            eprintln!("fork: {err}");
            NO_COMMAND
        }
    }
}

/// Wait until `child` reaches a terminal state, translating it into an
/// exit code. Children that die to a signal report `128 + signo`, the
/// usual shell convention.
fn wait_for(child: Pid) -> ExitCode {
    loop {
        match waitpid(child, Some(WaitPidFlag::WUNTRACED)) {
            Ok(WaitStatus::Exited(_, code)) => return code,
            Ok(WaitStatus::Signaled(_, signal, _)) => return 128 + signal as i32,
            // Stopped, not terminated. Keep waiting.
            Ok(status) => log::trace!("child {child} reported {status:?}"),
            Err(Errno::EINTR) => continue,
            Err(err) => {
                eprintln!("waitpid: {err}");
                return NO_COMMAND;
            }
        }
    }
}
