use crate::builtins::Builtin;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Classification of one input line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParsedLine {
    /// Blank line or comment. Nothing to do.
    Empty,
    Assignment { name: String, value: String },
    Pipeline(Pipeline),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Left to right; never empty.
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The built-in, if this pipeline contains one anywhere.
    pub fn builtin(&self) -> Option<Builtin> {
        self.stages.iter().find_map(|stage| match stage.program {
            Program::Builtin(builtin) => Some(builtin),
            Program::External(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub program: Program,
    /// `argv[0]` is the command name as typed, not the resolved path.
    pub argv: Vec<String>,
    pub redirects: Redirects,
}

impl Stage {
    pub fn name(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }
}

/// What a stage runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Program {
    Builtin(Builtin),
    External(PathBuf),
}

/// File redirections for one stage. A path here wins over any pipe
/// endpoint the executor would otherwise attach.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirects {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    /// `>>` rather than `>`. Meaningless without `output`.
    pub append: bool,
}

impl Redirects {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }
}
