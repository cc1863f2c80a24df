//! Pipeline execution.
//!
//! A pipeline moves through `Built -> Wired -> Spawning -> Running ->
//! Collected`, or ends early in `AbortedBeforeSpawn` (nothing ran) or
//! `AbortedDuringSpawn` (a fork failed after some stages started). Every
//! child that was started is waited for on every path.

pub mod pipeline;
pub mod spawn;

use crate::parser::ast::Pipeline;
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;
use pipeline::{StageIo, Wiring};
use spawn::PreparedStage;
use std::io;
use std::os::fd::RawFd;

/// Reported when a pipeline could not be started, and by a child whose
/// `exec` failed for a reason other than a missing file.
pub const EXIT_CANNOT_EXECUTE: i32 = 126;
/// A child whose executable does not exist.
pub const EXIT_NOT_FOUND: i32 = 127;
/// A child that could not open its redirection file.
pub const EXIT_REDIRECT_FAILED: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Exited(i32),
    /// Terminated by the given signal.
    Signaled(i32),
    NotStarted,
}

impl StageStatus {
    /// Exit code this status contributes when it counts as a failure.
    pub fn failure_code(self) -> Option<i32> {
        match self {
            StageStatus::Exited(0) => None,
            StageStatus::Exited(code) => Some(code),
            StageStatus::Signaled(signal) => Some(128 + signal),
            StageStatus::NotStarted => Some(EXIT_CANNOT_EXECUTE),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("'{name}' is a shell built-in and must be the only command on the line")]
    BuiltinInPipeline { name: &'static str },

    #[error("argument contains a NUL byte: {arg:?}")]
    NulByte { arg: String },

    #[error("could not create pipe: {0}")]
    Pipe(#[source] io::Error),

    #[error("could not start {name}: {source}")]
    Fork {
        name: String,
        #[source]
        source: Errno,
    },
}

impl ExecError {
    /// Resource exhaustion in the interpreter itself. Continuing to read
    /// lines after one of these is pointless.
    pub fn is_fatal(&self) -> bool {
        let errno = match self {
            ExecError::Pipe(e) => e.raw_os_error().map(Errno::from_raw),
            ExecError::Fork { source, .. } => Some(*source),
            _ => None,
        };
        matches!(
            errno,
            Some(Errno::EMFILE | Errno::ENFILE | Errno::ENOMEM | Errno::EAGAIN)
        )
    }
}

#[derive(Debug)]
pub struct PipelineResult {
    /// Status of the right-most failing stage, or 0.
    pub exit_code: i32,
    /// False when nothing was spawned and no built-in ran.
    pub started: bool,
    /// One entry per stage, in pipeline order.
    pub stages: Vec<StageStatus>,
    pub error: Option<ExecError>,
}

impl PipelineResult {
    pub fn success(&self) -> bool {
        self.error.is_none() && self.exit_code == 0
    }

    pub fn aborted(&self) -> bool {
        self.error.is_some()
    }

    fn aborted_before_spawn(stages: usize, error: ExecError) -> Self {
        tracing::debug!(stages, error = %error, "AbortedBeforeSpawn");
        Self {
            exit_code: EXIT_CANNOT_EXECUTE,
            started: false,
            stages: vec![StageStatus::NotStarted; stages],
            error: Some(error),
        }
    }
}

/// The right-most stage that failed decides the code.
pub fn aggregate(stages: &[StageStatus]) -> i32 {
    stages
        .iter()
        .rev()
        .find_map(|status| status.failure_code())
        .unwrap_or(0)
}

#[derive(Debug, Default)]
pub struct Executor;

impl Executor {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, pipeline: &Pipeline) -> PipelineResult {
        self.run_with(pipeline, spawn::spawn)
    }

    /// Run `pipeline`, starting each external stage through `spawner`.
    ///
    /// `spawner` gets the prepared stage, its own pipe ends and the
    /// descriptors of stages not yet started. The first `Err` it returns
    /// stops spawning; stages already started are still waited for.
    pub fn run_with<F>(&self, pipeline: &Pipeline, mut spawner: F) -> PipelineResult
    where
        F: FnMut(&PreparedStage, &StageIo, &[RawFd]) -> Result<Pid, Errno>,
    {
        let n = pipeline.len();
        tracing::debug!(stages = n, "Built");

        if n == 0 {
            return PipelineResult {
                exit_code: 0,
                started: false,
                stages: Vec::new(),
                error: None,
            };
        }

        if let Some(builtin) = pipeline.builtin() {
            if n > 1 {
                return PipelineResult::aborted_before_spawn(
                    n,
                    ExecError::BuiltinInPipeline {
                        name: builtin.name(),
                    },
                );
            }
            let code = builtin.run(pipeline.stages[0].argv.get(1..).unwrap_or_default());
            return PipelineResult {
                exit_code: code,
                started: true,
                stages: vec![StageStatus::Exited(code)],
                error: None,
            };
        }

        let prepared = match pipeline
            .stages
            .iter()
            .map(PreparedStage::new)
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(prepared) => prepared,
            Err(e) => return PipelineResult::aborted_before_spawn(n, e),
        };

        let mut wiring = match Wiring::new(n) {
            Ok(wiring) => wiring,
            Err(e) => return PipelineResult::aborted_before_spawn(n, ExecError::Pipe(e)),
        };
        tracing::debug!(stages = n, pipes = n - 1, "Wired");

        let mut children: Vec<Pid> = Vec::with_capacity(n);
        let mut error = None;

        for (index, stage) in prepared.iter().enumerate() {
            let io = wiring.take(index);
            let siblings = wiring.pending_fds();
            tracing::debug!(stage = index, "Spawning");

            match spawner(stage, &io, &siblings) {
                Ok(pid) => {
                    tracing::debug!(stage = index, pid = pid.as_raw(), "spawned");
                    children.push(pid);
                }
                Err(errno) => {
                    error = Some(ExecError::Fork {
                        name: stage.display_name(),
                        source: errno,
                    });
                    break;
                }
            }
            // `io` drops here: the parent's copies close before the next fork.
        }
        drop(wiring);

        tracing::debug!(children = children.len(), "Running");

        let mut stages = vec![StageStatus::NotStarted; n];
        for (index, pid) in children.iter().enumerate() {
            stages[index] = wait_for(*pid);
        }

        match error {
            Some(error) => {
                let started = !children.is_empty();
                if started {
                    tracing::debug!(stages = n, spawned = children.len(), error = %error, "AbortedDuringSpawn");
                } else {
                    tracing::debug!(stages = n, error = %error, "AbortedBeforeSpawn");
                }
                PipelineResult {
                    exit_code: EXIT_CANNOT_EXECUTE,
                    started,
                    stages,
                    error: Some(error),
                }
            }
            None => {
                let exit_code = aggregate(&stages);
                tracing::debug!(stages = n, exit_code, "Collected");
                PipelineResult {
                    exit_code,
                    started: true,
                    stages,
                    error: None,
                }
            }
        }
    }
}

fn wait_for(pid: Pid) -> StageStatus {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return StageStatus::Exited(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => return StageStatus::Signaled(signal as i32),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(e) => {
                tracing::warn!(pid = pid.as_raw(), error = %e, "waitpid failed");
                return StageStatus::NotStarted;
            }
        }
    }
}
