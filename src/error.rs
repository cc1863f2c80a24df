//! Structured error reports.
//!
//! Every error the interpreter shows the user goes through [`ShellError`],
//! which renders either as a plain message or as a single JSON object
//! (`PIPESH_ERROR_FORMAT=json`).

use crate::config::ErrorFormat;
use crate::executor::{ExecError, EXIT_CANNOT_EXECUTE, EXIT_NOT_FOUND};
use crate::parser::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PARSE_ERROR: &str = "PARSE_ERROR";
pub const RESOLUTION_ERROR: &str = "RESOLUTION_ERROR";
pub const SPAWN_ERROR: &str = "SPAWN_ERROR";
pub const USAGE_ERROR: &str = "USAGE_ERROR";
pub const IO_ERROR: &str = "IO_ERROR";

/// Where in a script or init file an error happened
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceLocation {
    /// 1-based
    pub line: usize,
    pub filename: String,
}

impl SourceLocation {
    pub fn new(filename: impl Into<String>, line: usize) -> Self {
        Self {
            line,
            filename: filename.into(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.line)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShellError {
    pub error_code: String,
    pub message: String,
    pub exit_code: i32,
    /// Command the error is about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl ShellError {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            exit_code,
            command: None,
            location: None,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE_ERROR, message, 1)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(IO_ERROR, message, 1)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error_code":"{}","message":{:?},"exit_code":{}}}"#,
                self.error_code, self.message, self.exit_code
            )
        })
    }

    /// `pipesh: [FILE:LINE: ]MESSAGE`
    pub fn to_text(&self) -> String {
        match &self.location {
            Some(location) => format!("pipesh: {}: {}", location, self.message),
            None => format!("pipesh: {}", self.message),
        }
    }

    pub fn render(&self, format: ErrorFormat) -> String {
        match format {
            ErrorFormat::Text => self.to_text(),
            ErrorFormat::Json => self.to_json(),
        }
    }
}

impl From<&ParseError> for ShellError {
    fn from(err: &ParseError) -> Self {
        match err {
            ParseError::Resolve(e) => {
                Self::new(RESOLUTION_ERROR, err.to_string(), EXIT_NOT_FOUND).with_command(e.name())
            }
            _ => Self::new(PARSE_ERROR, err.to_string(), 2),
        }
    }
}

impl From<&ExecError> for ShellError {
    fn from(err: &ExecError) -> Self {
        let error = Self::new(SPAWN_ERROR, err.to_string(), EXIT_CANNOT_EXECUTE);
        match err {
            ExecError::BuiltinInPipeline { name } => error.with_command(*name),
            ExecError::Fork { name, .. } => error.with_command(name.clone()),
            _ => error,
        }
    }
}
