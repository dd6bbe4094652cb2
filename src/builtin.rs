//! Builtin commands known to the shell at compile time.
//!
//! Each builtin is parsed with the [`argh`] crate (`FromArgs`). Whether a
//! builtin runs in-process or in a forked child is decided by the command
//! table, not here.

use crate::command::{COMMANDS, ExitCode};
use crate::env::Environment;
use anyhow::{Context, Result, anyhow};
use argh::{EarlyExit, FromArgs};
use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::{Uid, getegid, geteuid, getgid, getuid, setuid};
use std::env as stdenv;
use std::fs;
use std::io::Write;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// A command implemented inside the shell's own binary.
pub(crate) trait BuiltinCommand: FromArgs {
    /// Canonical name of the command, e.g. "ls" or "cd".
    fn name() -> &'static str;

    /// Executes the command using the provided output stream and context.
    ///
    /// Return value follows shell conventions: 0 for success, non-zero for
    /// error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

/// Adapts a builtin to the command table's handler signature.
///
/// Argument errors and `--help` requests surface through argh's
/// [`EarlyExit`] without running the command; execution errors are printed
/// as `name: reason` and become exit code 1.
pub(crate) fn entry<T: BuiltinCommand>(
    args: &[&str],
    stdout: &mut dyn Write,
    env: &mut Environment,
) -> ExitCode {
    let cmd = match T::from_args(&[T::name()], args) {
        Ok(cmd) => cmd,
        Err(EarlyExit { output, status }) => {
            let _ = writeln!(stdout, "{output}");
            return if status.is_err() { 1 } else { 0 };
        }
    };
    match cmd.execute(stdout, env) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}: {:#}", T::name(), err);
            1
        }
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// With no target, changes to the directory named by HOME.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => {
                if let Some(home) = env.get_var("HOME") {
                    PathBuf::from(home)
                } else {
                    return Err(anyhow!("no target and HOME not set"));
                }
            }
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("can't canonicalize {}", new_dir.display()))?;

        stdenv::set_current_dir(&canonical)
            .with_context(|| format!("can't chdir to {}", canonical.display()))?;
        env.current_dir = canonical;
        let pwd = env.current_dir.display().to_string();
        env.set_var("PWD", pwd);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Copy a file. When the destination is a directory the source keeps its
/// file name.
pub struct Cp {
    #[argh(positional)]
    /// file to copy
    pub source: String,

    #[argh(positional)]
    /// destination file or directory
    pub dest: String,
}

impl BuiltinCommand for Cp {
    fn name() -> &'static str {
        "cp"
    }

    fn execute(self, _stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        let mut dest = PathBuf::from(&self.dest);
        if dest.is_dir() {
            let name = Path::new(&self.source)
                .file_name()
                .ok_or_else(|| anyhow!("invalid source {}", self.source))?;
            dest.push(name);
        }
        fs::copy(&self.source, &dest)
            .with_context(|| format!("can't copy {} to {}", self.source, dest.display()))?;
        Ok(0)
    }
}

const SYSLOG_ACTION_READ_ALL: libc::c_int = 3;
const SYSLOG_ACTION_SIZE_BUFFER: libc::c_int = 10;

#[derive(FromArgs)]
/// Print the kernel ring buffer.
pub struct Dmesg {}

impl BuiltinCommand for Dmesg {
    fn name() -> &'static str {
        "dmesg"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        let len = unsafe { libc::klogctl(SYSLOG_ACTION_SIZE_BUFFER, std::ptr::null_mut(), 0) };
        if len < 0 {
            return Err(anyhow!("klogctl: {}", std::io::Error::last_os_error()));
        }

        let mut buffer = vec![0u8; len as usize];
        let read = unsafe {
            libc::klogctl(
                SYSLOG_ACTION_READ_ALL,
                buffer.as_mut_ptr().cast::<libc::c_char>(),
                len,
            )
        };
        if read < 0 {
            return Err(anyhow!("klogctl: {}", std::io::Error::last_os_error()));
        }

        stdout.write_all(&buffer[..read as usize])?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the environment, one KEY=VALUE per line.
pub struct Env {}

impl BuiltinCommand for Env {
    fn name() -> &'static str {
        "env"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let mut entries: Vec<_> = env.vars.iter().collect();
        entries.sort();
        for (key, val) in entries {
            writeln!(stdout, "{key}={val}")?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Leave the shell.
pub struct Exit {
    #[argh(positional)]
    /// exit status to report; defaults to the last command's status
    pub code: Option<i32>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(self.code.unwrap_or(env.last_status))
    }
}

#[derive(FromArgs)]
/// Display a list of registered commands.
pub struct Help {}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "Available commands are:")?;
        for cmd in COMMANDS {
            writeln!(stdout, "  {}", cmd.name)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print real and effective user and group ids.
pub struct Id {}

impl BuiltinCommand for Id {
    fn name() -> &'static str {
        "id"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        writeln!(
            stdout,
            "uid={} gid={} euid={} egid={}",
            getuid(),
            getgid(),
            geteuid(),
            getegid()
        )?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Escalate this shell process to root privileges.
pub struct Jailbreak {}

impl BuiltinCommand for Jailbreak {
    fn name() -> &'static str {
        "jailbreak"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        if Uid::effective().is_root() {
            writeln!(stdout, "already running as root")?;
            return Ok(0);
        }
        setuid(Uid::from_raw(0)).map_err(|err| anyhow!("setuid: {err}"))?;
        writeln!(stdout, "escalated to root")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Send a signal to one or more processes.
pub struct Kill {
    #[argh(option, short = 's')]
    /// signal number to send; defaults to 15 (SIGTERM)
    pub signal: Option<i32>,

    #[argh(positional)]
    /// target process ids
    pub pids: Vec<i32>,
}

impl BuiltinCommand for Kill {
    fn name() -> &'static str {
        "kill"
    }

    fn execute(self, _stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        if self.pids.is_empty() {
            return Err(anyhow!("missing pid operand"));
        }
        let sig = match self.signal {
            Some(num) => {
                Signal::try_from(num).map_err(|_| anyhow!("invalid signal number {num}"))?
            }
            None => Signal::SIGTERM,
        };
        for pid in self.pids {
            signal::kill(nix::unistd::Pid::from_raw(pid), sig)
                .with_context(|| format!("can't signal pid {pid}"))?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List directory contents.
pub struct Ls {
    #[argh(switch, short = 'a')]
    /// include entries whose names start with a dot
    pub all: bool,

    #[argh(switch, short = 'l')]
    /// long listing with mode and size
    pub long: bool,

    #[argh(positional)]
    /// paths to list; defaults to the current directory
    pub paths: Vec<String>,
}

impl BuiltinCommand for Ls {
    fn name() -> &'static str {
        "ls"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        let Ls { all, long, paths } = self;
        let paths = if paths.is_empty() {
            vec![String::from(".")]
        } else {
            paths
        };

        let label = paths.len() > 1;
        for (i, path) in paths.iter().enumerate() {
            if label {
                if i > 0 {
                    writeln!(stdout)?;
                }
                writeln!(stdout, "{path}:")?;
            }
            list_path(path, all, long, stdout)?;
        }
        Ok(0)
    }
}

fn list_path(path: &str, all: bool, long: bool, stdout: &mut dyn Write) -> Result<()> {
    let meta = fs::symlink_metadata(path).with_context(|| format!("can't access {path}"))?;
    if !meta.is_dir() {
        print_entry(path, Some(&meta), long, stdout)?;
        return Ok(());
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(path).with_context(|| format!("can't open {path}"))? {
        let entry = entry.with_context(|| format!("can't read {path}"))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !all && name.starts_with('.') {
            continue;
        }
        entries.push((name, entry.metadata().ok()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, meta) in &entries {
        print_entry(name, meta.as_ref(), long, stdout)?;
    }
    Ok(())
}

fn print_entry(
    name: &str,
    meta: Option<&fs::Metadata>,
    long: bool,
    stdout: &mut dyn Write,
) -> Result<()> {
    if !long {
        writeln!(stdout, "{name}")?;
        return Ok(());
    }
    match meta {
        Some(meta) => {
            writeln!(stdout, "{} {:>10} {}", mode_string(meta.mode()), meta.len(), name)?
        }
        None => writeln!(stdout, "{} {:>10} {}", "??????????", "?", name)?,
    }
    Ok(())
}

/// Render an st_mode word the way `ls -l` does: a file-type character
/// followed by three rwx triples.
fn mode_string(mode: u32) -> String {
    let kind = match mode & libc::S_IFMT {
        libc::S_IFDIR => 'd',
        libc::S_IFLNK => 'l',
        libc::S_IFCHR => 'c',
        libc::S_IFBLK => 'b',
        libc::S_IFIFO => 'p',
        libc::S_IFSOCK => 's',
        _ => '-',
    };

    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[derive(FromArgs)]
/// Create directories.
pub struct Mkdir {
    #[argh(switch, short = 'p')]
    /// create missing parent directories as needed
    pub parents: bool,

    #[argh(positional)]
    /// directories to create
    pub dirs: Vec<String>,
}

impl BuiltinCommand for Mkdir {
    fn name() -> &'static str {
        "mkdir"
    }

    fn execute(self, _stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        if self.dirs.is_empty() {
            return Err(anyhow!("missing operand"));
        }
        for dir in &self.dirs {
            let result = if self.parents {
                fs::create_dir_all(dir)
            } else {
                fs::create_dir(dir)
            };
            result.with_context(|| format!("can't create {dir}"))?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Mount a filesystem, or list mounted filesystems when run without
/// arguments.
pub struct Mount {
    #[argh(positional)]
    /// device or filesystem source
    pub source: Option<String>,

    #[argh(positional)]
    /// mount point
    pub target: Option<String>,

    #[argh(positional)]
    /// filesystem type
    pub fstype: Option<String>,
}

impl BuiltinCommand for Mount {
    fn name() -> &'static str {
        "mount"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        match (&self.source, &self.target, &self.fstype) {
            (None, None, None) => {
                let mounts = fs::read_to_string("/proc/self/mounts")
                    .context("can't read the mount table")?;
                write!(stdout, "{mounts}")?;
                Ok(0)
            }
            (Some(source), Some(target), Some(fstype)) => {
                nix::mount::mount(
                    Some(source.as_str()),
                    target.as_str(),
                    Some(fstype.as_str()),
                    nix::mount::MsFlags::empty(),
                    None::<&str>,
                )
                .with_context(|| format!("can't mount {source} on {target}"))?;
                Ok(0)
            }
            _ => Err(anyhow!("usage: mount [source target fstype]")),
        }
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Remove empty directories.
pub struct Rmdir {
    #[argh(positional)]
    /// directories to remove
    pub dirs: Vec<String>,
}

impl BuiltinCommand for Rmdir {
    fn name() -> &'static str {
        "rmdir"
    }

    fn execute(self, _stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        if self.dirs.is_empty() {
            return Err(anyhow!("missing operand"));
        }
        for dir in &self.dirs {
            fs::remove_dir(dir).with_context(|| format!("can't remove {dir}"))?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Suspend execution for a number of seconds.
pub struct Sleep {
    #[argh(positional)]
    /// how long to sleep, in whole seconds
    pub seconds: u64,
}

impl BuiltinCommand for Sleep {
    fn name() -> &'static str {
        "sleep"
    }

    fn execute(self, _stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        thread::sleep(Duration::from_secs(self.seconds));
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Display file status.
pub struct Stat {
    #[argh(positional)]
    /// files to inspect
    pub paths: Vec<String>,
}

impl BuiltinCommand for Stat {
    fn name() -> &'static str {
        "stat"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        if self.paths.is_empty() {
            return Err(anyhow!("missing operand"));
        }
        for path in &self.paths {
            let st = nix::sys::stat::stat(path.as_str())
                .with_context(|| format!("can't stat {path}"))?;
            writeln!(stdout, "  File: {path}")?;
            writeln!(
                stdout,
                "  Size: {}  Blocks: {}  Links: {}",
                st.st_size, st.st_blocks, st.st_nlink
            )?;
            writeln!(
                stdout,
                "Access: {:04o}  Uid: {}  Gid: {}",
                st.st_mode & 0o7777,
                st.st_uid,
                st.st_gid
            )?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print system information.
pub struct Uname {
    #[argh(switch, short = 'a')]
    /// print all fields, not just the kernel name
    pub all: bool,
}

impl BuiltinCommand for Uname {
    fn name() -> &'static str {
        "uname"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        let uts = nix::sys::utsname::uname().context("uname")?;
        if self.all {
            writeln!(
                stdout,
                "{} {} {} {} {}",
                uts.sysname().to_string_lossy(),
                uts.nodename().to_string_lossy(),
                uts.release().to_string_lossy(),
                uts.version().to_string_lossy(),
                uts.machine().to_string_lossy()
            )?;
        } else {
            writeln!(stdout, "{}", uts.sysname().to_string_lossy())?;
        }
        Ok(0)
    }
}
