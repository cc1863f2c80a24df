//! pipesh: a small line-oriented Unix shell.
//!
//! Lines are classified as blank, variable assignments or pipelines.
//! Pipelines run one process per stage, connected by pipes, with optional
//! `<`, `>` and `>>` redirection per stage.

pub mod builtins;
pub mod config;
pub mod correction;
pub mod error;
pub mod executor;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod runtime;
pub mod signal;

pub use executor::{Executor, PipelineResult, StageStatus};
pub use interpreter::{Interpreter, LineOutcome};
pub use parser::{ParseError, Parser};
pub use runtime::Runtime;
