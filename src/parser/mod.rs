//! Line classification and pipeline parsing.
//!
//! A raw line goes through these steps in order:
//! 1. trim spaces; a blank line or one starting with `#` is [`ParsedLine::Empty`]
//! 2. substitute variable references
//! 3. a line containing `=` anywhere, trailing comment included, is an
//!    assignment; its value ends at the first `#`
//! 4. drop a trailing comment
//! 5. anything else is a pipeline: split on `|`, slice out redirections,
//!    tokenize on spaces, resolve the command name

pub mod ast;

use crate::lexer::{self, LexerError};
use crate::resolver::{self, ResolveError, SkippedDir};
use crate::runtime::Runtime;
use ast::{ParsedLine, Pipeline, Redirects, Stage};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Assignment cannot start with '=' character")]
    AssignmentWithoutName,

    #[error("Variable names must only contain alphabetic characters and '_' chars. Got: {name}")]
    InvalidVariableName { name: String },

    #[error(transparent)]
    Substitution(#[from] LexerError),

    #[error("Empty command in pipeline stage {segment}")]
    EmptyCommand { segment: usize },

    #[error("More than one '{operator}' redirection in one command")]
    DuplicateRedirect { operator: &'static str },

    #[error("Missing file name after '{operator}'")]
    MissingRedirectTarget { operator: &'static str },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl ParseError {
    /// Command the error is about, when there is one.
    pub fn command(&self) -> Option<&str> {
        match self {
            ParseError::Resolve(e) => Some(e.name()),
            _ => None,
        }
    }
}

/// Non-fatal findings collected while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Referenced variable has no value; it was replaced by nothing.
    UnknownVariable(String),
    SkippedPathEntry { dir: PathBuf, reason: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnknownVariable(name) => write!(f, "Could not find variable: <{name}>"),
            Warning::SkippedPathEntry { dir, reason } => {
                write!(f, "PATH directory {} invalid: {reason}", dir.display())
            }
        }
    }
}

impl From<SkippedDir> for Warning {
    fn from(skipped: SkippedDir) -> Self {
        Warning::SkippedPathEntry {
            dir: skipped.dir,
            reason: skipped.reason,
        }
    }
}

pub struct Parser<'r> {
    runtime: &'r Runtime,
    warnings: Vec<Warning>,
}

impl<'r> Parser<'r> {
    pub fn new(runtime: &'r Runtime) -> Self {
        Self {
            runtime,
            warnings: Vec::new(),
        }
    }

    /// Warnings gathered since the last call, oldest first.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    pub fn parse_line(&mut self, line: &str) -> Result<ParsedLine, ParseError> {
        let trimmed = trim_spaces(line);
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(ParsedLine::Empty);
        }

        let expansion = lexer::substitute(trimmed, self.runtime)?;
        self.warnings.extend(
            expansion
                .unresolved
                .into_iter()
                .map(Warning::UnknownVariable),
        );

        let line = trim_spaces(&expansion.line);
        if line.contains('=') {
            return parse_assignment(line);
        }

        let line = trim_spaces(strip_comment(line));
        if line.is_empty() {
            return Ok(ParsedLine::Empty);
        }

        self.parse_pipeline(line).map(ParsedLine::Pipeline)
    }

    fn parse_pipeline(&mut self, line: &str) -> Result<Pipeline, ParseError> {
        let stages = split_pipeline(line)
            .into_iter()
            .enumerate()
            .map(|(index, segment)| self.parse_stage(index + 1, segment))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Pipeline { stages })
    }

    fn parse_stage(&mut self, segment_number: usize, segment: &str) -> Result<Stage, ParseError> {
        let empty = ParseError::EmptyCommand {
            segment: segment_number,
        };
        if segment.is_empty() {
            return Err(empty);
        }

        let (command, redirects) = split_redirects(segment)?;
        let argv = tokenize(command);
        let Some(name) = argv.first() else {
            return Err(empty);
        };

        match resolver::resolve(name, self.runtime.path()) {
            Ok(resolution) => {
                self.warnings
                    .extend(resolution.skipped.into_iter().map(Warning::from));
                Ok(Stage {
                    program: resolution.program,
                    argv,
                    redirects,
                })
            }
            Err(e) => {
                if let ResolveError::NotFound { skipped, .. } = &e {
                    self.warnings
                        .extend(skipped.iter().cloned().map(Warning::from));
                }
                Err(e.into())
            }
        }
    }
}

fn parse_assignment(line: &str) -> Result<ParsedLine, ParseError> {
    let Some((name, rest)) = line.split_once('=') else {
        return Err(ParseError::AssignmentWithoutName);
    };

    let name = trim_spaces(name);
    if name.is_empty() {
        return Err(ParseError::AssignmentWithoutName);
    }
    if !is_variable_name(name) {
        return Err(ParseError::InvalidVariableName {
            name: name.to_string(),
        });
    }

    let value = rest.split('#').next().unwrap_or_default();

    Ok(ParsedLine::Assignment {
        name: name.to_string(),
        value: trim_spaces(value).to_string(),
    })
}

pub fn is_variable_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphabetic() || b == b'_')
}

/// Split a line into trimmed pipeline segments. Always at least one.
pub fn split_pipeline(line: &str) -> Vec<&str> {
    line.split('|').map(trim_spaces).collect()
}

#[derive(Clone, Copy)]
enum Operator {
    Input,
    Output { append: bool },
}

impl Operator {
    fn symbol(self) -> &'static str {
        match self {
            Operator::Input => "<",
            Operator::Output { append: false } => ">",
            Operator::Output { append: true } => ">>",
        }
    }

    fn width(self) -> usize {
        self.symbol().len()
    }
}

/// Separate a segment into its command text and its redirections.
///
/// At most one input and one output operator are allowed, in either order.
/// The first operator's file name runs up to the second operator; the
/// second's runs to the end of the segment.
pub fn split_redirects(segment: &str) -> Result<(&str, Redirects), ParseError> {
    let bytes = segment.as_bytes();
    let mut operators: Vec<(usize, Operator)> = Vec::with_capacity(2);
    let mut seen_input = false;
    let mut seen_output = false;

    let mut i = 0;
    while i < bytes.len() {
        let op = match bytes[i] {
            b'<' => {
                if seen_input {
                    return Err(ParseError::DuplicateRedirect { operator: "<" });
                }
                seen_input = true;
                Operator::Input
            }
            b'>' => {
                let append = bytes.get(i + 1) == Some(&b'>');
                if seen_output {
                    return Err(ParseError::DuplicateRedirect {
                        operator: Operator::Output { append }.symbol(),
                    });
                }
                seen_output = true;
                Operator::Output { append }
            }
            _ => {
                i += 1;
                continue;
            }
        };
        operators.push((i, op));
        i += op.width();
    }

    let command_end = operators.first().map_or(segment.len(), |(at, _)| *at);
    let mut redirects = Redirects::default();

    for (n, &(at, op)) in operators.iter().enumerate() {
        let start = at + op.width();
        let end = operators.get(n + 1).map_or(segment.len(), |(next, _)| *next);
        let target = trim_spaces(&segment[start..end]);
        if target.is_empty() {
            return Err(ParseError::MissingRedirectTarget {
                operator: op.symbol(),
            });
        }

        match op {
            Operator::Input => redirects.input = Some(PathBuf::from(target)),
            Operator::Output { append } => {
                redirects.output = Some(PathBuf::from(target));
                redirects.append = append;
            }
        }
    }

    Ok((&segment[..command_end], redirects))
}

/// Split on single spaces. Runs of spaces produce no empty tokens; tabs are
/// ordinary characters.
fn tokenize(command: &str) -> Vec<String> {
    command
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// A `#` at the start of the line or after a space begins a comment.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'#' && (i == 0 || bytes[i - 1] == b' ') {
            return &line[..i];
        }
    }
    line
}

fn trim_spaces(s: &str) -> &str {
    s.trim_matches(' ')
}
