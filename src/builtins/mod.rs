//! Built-in commands. Built-ins run inside the interpreter process because
//! their effect (the working directory) must outlive the command.

use nix::unistd::{getuid, User};
use serde::{Deserialize, Serialize};
use std::env;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Builtin {
    Cd,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cd" => Some(Builtin::Cd),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Cd => "cd",
        }
    }

    pub fn all() -> &'static [Builtin] {
        &[Builtin::Cd]
    }

    /// Run with `args` (not including the command name). Returns the exit
    /// status; failures are reported on stderr.
    pub fn run(self, args: &[String]) -> i32 {
        match self {
            Builtin::Cd => match change_directory(args.first().map(String::as_str)) {
                Ok(dir) => {
                    tracing::debug!(dir = %dir.display(), "changed directory");
                    0
                }
                Err(e) => {
                    eprintln!("cd: {}", e);
                    1
                }
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CdError {
    #[error("could not determine home directory")]
    NoHome,

    #[error("no such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Change the working directory of the interpreter process.
///
/// With no target, goes to the invoking user's home directory. A leading
/// `~` in the target is replaced by that same directory. On failure the
/// working directory is unchanged.
pub fn change_directory(target: Option<&str>) -> Result<PathBuf, CdError> {
    let target = match target {
        None | Some("~") => home_dir()?,
        Some(path) if path.starts_with("~/") => home_dir()?.join(&path[2..]),
        Some(path) => PathBuf::from(path),
    };

    check_directory(&target)?;

    env::set_current_dir(&target).map_err(|source| CdError::Io {
        path: target.clone(),
        source,
    })?;

    Ok(target)
}

fn check_directory(path: &Path) -> Result<(), CdError> {
    match path.metadata() {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(CdError::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(CdError::NotFound(path.to_path_buf()))
        }
        Err(source) => Err(CdError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Home directory from the user database, falling back to `$HOME`.
pub fn home_dir() -> Result<PathBuf, CdError> {
    match User::from_uid(getuid()) {
        Ok(Some(user)) => Ok(user.dir),
        _ => dirs::home_dir().ok_or(CdError::NoHome),
    }
}
