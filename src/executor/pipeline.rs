//! Pipe wiring between stages.
//!
//! Every pipe endpoint is owned by exactly one stage. The executor takes a
//! stage's endpoints right before forking it and drops them right after,
//! so the orchestrating process never holds a write end longer than it
//! takes to hand it to the child.

use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

/// Pipe endpoints belonging to one stage. `None` means the stream is
/// inherited from the interpreter.
#[derive(Debug, Default)]
pub struct StageIo {
    pub stdin: Option<OwnedFd>,
    pub stdout: Option<OwnedFd>,
}

impl StageIo {
    pub fn stdin_fd(&self) -> Option<RawFd> {
        self.stdin.as_ref().map(AsRawFd::as_raw_fd)
    }

    pub fn stdout_fd(&self) -> Option<RawFd> {
        self.stdout.as_ref().map(AsRawFd::as_raw_fd)
    }

    fn raw_fds(&self) -> impl Iterator<Item = RawFd> {
        self.stdin_fd().into_iter().chain(self.stdout_fd())
    }
}

/// Endpoints for every stage of an `n`-stage pipeline that has not been
/// spawned yet.
#[derive(Debug)]
pub struct Wiring {
    stages: Vec<Option<StageIo>>,
}

impl Wiring {
    /// Create `n - 1` pipes. Pipe `i` carries stage `i`'s stdout to stage
    /// `i + 1`'s stdin. On failure, pipes already created are closed.
    pub fn new(n: usize) -> io::Result<Self> {
        let mut stages: Vec<StageIo> = (0..n).map(|_| StageIo::default()).collect();

        for i in 1..n {
            let (reader, writer) = os_pipe::pipe()?;
            stages[i - 1].stdout = Some(OwnedFd::from(writer));
            stages[i].stdin = Some(OwnedFd::from(reader));
        }

        Ok(Self {
            stages: stages.into_iter().map(Some).collect(),
        })
    }

    /// Hand over stage `index`'s endpoints. A second call for the same
    /// stage yields an empty `StageIo`.
    pub fn take(&mut self, index: usize) -> StageIo {
        self.stages
            .get_mut(index)
            .and_then(Option::take)
            .unwrap_or_default()
    }

    /// Raw descriptors still held for stages not yet taken. A child must
    /// close these; they belong to its siblings.
    pub fn pending_fds(&self) -> Vec<RawFd> {
        self.stages
            .iter()
            .flatten()
            .flat_map(StageIo::raw_fds)
            .collect()
    }

    #[cfg(test)]
    fn open_count(&self) -> usize {
        self.stages.iter().flatten().map(|io| io.raw_fds().count()).sum()
    }
}
