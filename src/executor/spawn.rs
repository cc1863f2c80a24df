//! Process creation for one pipeline stage.
//!
//! After `fork` the child only sets up its descriptors and calls `execv`.
//! It never returns into interpreter code: every failure path ends in
//! `_exit`. The child does not allocate; everything it needs, down to the
//! null-terminated `argv` pointer array, is prepared beforehand in
//! [`PreparedStage`].

use super::pipeline::StageIo;
use super::{ExecError, EXIT_CANNOT_EXECUTE, EXIT_NOT_FOUND, EXIT_REDIRECT_FAILED};
use crate::parser::ast::{Program, Stage};
use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2, fork, ForkResult, Pid};
use std::ffi::{CStr, CString};
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

const STDIN: RawFd = libc::STDIN_FILENO;
const STDOUT: RawFd = libc::STDOUT_FILENO;

/// A stage converted to the C strings `open` and `execv` need.
#[derive(Debug)]
pub struct PreparedStage {
    pub name: CString,
    pub path: CString,
    pub argv: Vec<CString>,
    pub input: Option<CString>,
    pub output: Option<CString>,
    pub append: bool,
    /// Pointers into `argv`'s buffers followed by a null pointer. The
    /// buffers are heap allocated and never change, so the pointers stay
    /// valid for as long as `argv` does.
    exec_argv: Vec<*const libc::c_char>,
}

impl PreparedStage {
    pub fn new(stage: &Stage) -> Result<Self, ExecError> {
        let path = match &stage.program {
            Program::External(path) => path_cstring(path)?,
            Program::Builtin(builtin) => {
                return Err(ExecError::BuiltinInPipeline {
                    name: builtin.name(),
                })
            }
        };

        let argv = stage
            .argv
            .iter()
            .map(|arg| c_string(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        let exec_argv = argv
            .iter()
            .map(|arg| arg.as_ptr())
            .chain(std::iter::once(std::ptr::null()))
            .collect();

        Ok(Self {
            name: c_string(stage.name().as_bytes())?,
            path,
            argv,
            exec_argv,
            input: stage.redirects.input.as_deref().map(path_cstring).transpose()?,
            output: stage.redirects.output.as_deref().map(path_cstring).transpose()?,
            append: stage.redirects.append,
        })
    }

    pub fn display_name(&self) -> String {
        self.name.to_string_lossy().into_owned()
    }
}

fn c_string(bytes: &[u8]) -> Result<CString, ExecError> {
    CString::new(bytes).map_err(|_| ExecError::NulByte {
        arg: String::from_utf8_lossy(bytes).into_owned(),
    })
}

fn path_cstring(path: &Path) -> Result<CString, ExecError> {
    c_string(path.as_os_str().as_bytes())
}

/// Fork a child for `stage`. The parent gets the child's pid; the child
/// execs and never comes back through this function.
///
/// `siblings` are descriptors belonging to other stages that the child must
/// close.
pub fn spawn(stage: &PreparedStage, io: &StageIo, siblings: &[RawFd]) -> Result<Pid, Errno> {
    // SAFETY: the child branch only calls async-signal-safe functions
    // (signal, open, dup2, close, execv, write, _exit) on data prepared before the fork.
    match unsafe { fork() }? {
        ForkResult::Parent { child } => Ok(child),
        ForkResult::Child => exec_child(stage, io, siblings),
    }
}

fn exec_child(stage: &PreparedStage, io: &StageIo, siblings: &[RawFd]) -> ! {
    // The Rust runtime ignores SIGPIPE and an ignored signal survives exec.
    // SAFETY: restoring a default disposition is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let stdin = match &stage.input {
        Some(path) => match open(path.as_c_str(), OFlag::O_RDONLY, Mode::empty()) {
            Ok(fd) => Some(fd),
            Err(errno) => child_exit(path, errno, EXIT_REDIRECT_FAILED),
        },
        None => io.stdin_fd(),
    };

    let stdout = match &stage.output {
        Some(path) => {
            let mode = if stage.append {
                OFlag::O_APPEND
            } else {
                OFlag::O_TRUNC
            };
            let flags = OFlag::O_WRONLY | OFlag::O_CREAT | mode;
            match open(path.as_c_str(), flags, Mode::from_bits_truncate(0o666)) {
                Ok(fd) => Some(fd),
                Err(errno) => child_exit(path, errno, EXIT_REDIRECT_FAILED),
            }
        }
        None => io.stdout_fd(),
    };

    for (fd, target) in [(stdin, STDIN), (stdout, STDOUT)] {
        if let Some(fd) = fd {
            if fd != target {
                if let Err(errno) = dup2(fd, target) {
                    child_exit(&stage.name, errno, EXIT_CANNOT_EXECUTE);
                }
            }
        }
    }

    // The stage's own pipe ends and any opened files now live on 0 and 1.
    let own = [io.stdin_fd(), io.stdout_fd(), stdin, stdout];
    for fd in own.into_iter().flatten().chain(siblings.iter().copied()) {
        if fd != STDIN && fd != STDOUT {
            let _ = close(fd);
        }
    }

    // SAFETY: `path` is a valid C string and `exec_argv` is a
    // null-terminated array of pointers into `argv`, both owned by `stage`.
    unsafe {
        libc::execv(stage.path.as_ptr(), stage.exec_argv.as_ptr());
    }
    let errno = Errno::last();
    let status = if errno == Errno::ENOENT {
        EXIT_NOT_FOUND
    } else {
        EXIT_CANNOT_EXECUTE
    };
    child_exit(&stage.name, errno, status)
}

/// Print `pipesh: SUBJECT: REASON` without allocating and terminate.
fn child_exit(subject: &CStr, errno: Errno, status: i32) -> ! {
    let parts: [&[u8]; 5] = [
        b"pipesh: ",
        subject.to_bytes(),
        b": ",
        errno.desc().as_bytes(),
        b"\n",
    ];
    for part in parts {
        // SAFETY: writing a valid buffer to stderr.
        unsafe {
            libc::write(libc::STDERR_FILENO, part.as_ptr().cast(), part.len());
        }
    }
    // SAFETY: ends the forked child without running the parent's exit handlers.
    unsafe { libc::_exit(status) }
}
