//! Executable resolution.
//!
//! Maps a command name to something the executor can run: the `cd`
//! built-in, a path given verbatim, or the first match found by scanning
//! `PATH` directories in order.

use crate::builtins::Builtin;
use crate::parser::ast::Program;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub program: Program,
    /// Directories on `PATH` that could not be listed. Not fatal.
    pub skipped: Vec<SkippedDir>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDir {
    pub dir: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Could not resolve executable [{name}]")]
    NotFound {
        name: String,
        skipped: Vec<SkippedDir>,
    },

    #[error("Could not resolve executable [{name}]: PATH is not set")]
    PathUnset { name: String },
}

impl ResolveError {
    /// The command that failed to resolve.
    pub fn name(&self) -> &str {
        match self {
            ResolveError::NotFound { name, .. } | ResolveError::PathUnset { name } => name,
        }
    }
}

/// Resolve `name` against `path`, the value of the `PATH` variable.
pub fn resolve(name: &str, path: Option<&str>) -> Result<Resolution, ResolveError> {
    if let Some(builtin) = Builtin::from_name(name) {
        return Ok(Resolution {
            program: Program::Builtin(builtin),
            skipped: Vec::new(),
        });
    }

    if name.contains('/') {
        return Ok(Resolution {
            program: Program::External(PathBuf::from(name)),
            skipped: Vec::new(),
        });
    }

    let path = path.ok_or_else(|| ResolveError::PathUnset {
        name: name.to_string(),
    })?;

    let mut skipped = Vec::new();
    for dir in path_dirs(path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                skipped.push(SkippedDir {
                    dir: PathBuf::from(dir),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let found = entries
            .flatten()
            .any(|entry| entry.file_name().as_encoded_bytes() == name.as_bytes());
        if found {
            let resolved = join(dir, name);
            tracing::debug!(command = name, path = %resolved.display(), "resolved executable");
            return Ok(Resolution {
                program: Program::External(resolved),
                skipped,
            });
        }
    }

    Err(ResolveError::NotFound {
        name: name.to_string(),
        skipped,
    })
}

/// Non-empty `PATH` components in order.
pub fn path_dirs(path: &str) -> impl Iterator<Item = &str> {
    path.split(':').filter(|dir| !dir.is_empty())
}

fn join(dir: &str, name: &str) -> PathBuf {
    if dir.ends_with('/') {
        PathBuf::from(format!("{dir}{name}"))
    } else {
        PathBuf::from(format!("{dir}/{name}"))
    }
}
