//! Line-at-a-time interpretation shared by the REPL, scripts and the init
//! file.

use crate::config::ErrorFormat;
use crate::correction;
use crate::error::{ShellError, SourceLocation};
use crate::executor::{Executor, PipelineResult};
use crate::parser::ast::ParsedLine;
use crate::parser::{ParseError, Parser};
use crate::resolver::ResolveError;
use crate::runtime::Runtime;
use crate::signal::SignalHandler;
use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug)]
pub enum LineOutcome {
    Empty,
    Assigned { name: String },
    Ran(PipelineResult),
}

pub struct Interpreter {
    runtime: Runtime,
    executor: Executor,
    error_format: ErrorFormat,
    signals: Option<SignalHandler>,
}

impl Interpreter {
    pub fn new(runtime: Runtime, error_format: ErrorFormat) -> Self {
        Self {
            runtime,
            executor: Executor::new(),
            error_format,
            signals: None,
        }
    }

    pub fn with_signal_handler(mut self, signals: SignalHandler) -> Self {
        self.signals = Some(signals);
        self
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    /// Parse and run one line. Warnings go to stderr; errors are returned
    /// for the caller to report.
    pub fn interpret_line(&mut self, line: &str) -> Result<LineOutcome, ParseError> {
        let (parsed, warnings) = {
            let mut parser = Parser::new(&self.runtime);
            let parsed = parser.parse_line(line);
            (parsed, parser.take_warnings())
        };
        for warning in warnings {
            eprintln!("Warning: {}", warning);
        }

        match parsed? {
            ParsedLine::Empty => Ok(LineOutcome::Empty),
            ParsedLine::Assignment { name, value } => {
                tracing::debug!(name = %name, value = %value, "assigned variable");
                self.runtime.set_variable(name.clone(), value);
                Ok(LineOutcome::Assigned { name })
            }
            ParsedLine::Pipeline(pipeline) => {
                let result = self.executor.run(&pipeline);
                if let Some(signals) = &self.signals {
                    // Ctrl-C during the pipeline was meant for the children.
                    signals.take_interrupt();
                }
                Ok(LineOutcome::Ran(result))
            }
        }
    }

    /// Interpret one line and report whatever went wrong.
    ///
    /// Returns the line's status (`None` for blank lines and assignments),
    /// or an error if the interpreter cannot go on.
    pub fn run_line(&mut self, line: &str, location: Option<SourceLocation>) -> Result<Option<i32>> {
        match self.interpret_line(line) {
            Ok(LineOutcome::Ran(result)) => {
                let Some(err) = &result.error else {
                    return Ok(Some(result.exit_code));
                };
                let report = with_location(ShellError::from(err), location);
                self.report(&report);
                if err.is_fatal() {
                    return Err(anyhow!("{}", err));
                }
                Ok(Some(result.exit_code))
            }
            Ok(_) => Ok(None),
            Err(err) => {
                let report = with_location(ShellError::from(&err), location);
                self.report(&report);
                self.suggest(&err);
                Ok(Some(report.exit_code))
            }
        }
    }

    /// Run every line from `reader`.
    ///
    /// Line statuses are only reported, never propagated: reaching the end
    /// of input yields 0. A read failure or a fatal execution error is an
    /// `Err`.
    pub fn run_lines(&mut self, reader: impl BufRead, source_name: &str) -> Result<i32> {
        for (index, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("failed to read {}", source_name))?;
            let location = SourceLocation::new(source_name, index + 1);
            if let Some(status) = self.run_line(&line, Some(location))? {
                tracing::trace!(source = source_name, line = index + 1, status, "line finished");
            }
        }
        Ok(0)
    }

    pub fn run_file(&mut self, path: &Path) -> Result<i32> {
        let file = File::open(path)
            .with_context(|| path.display().to_string())?;
        tracing::debug!(path = %path.display(), "running script");
        self.run_lines(BufReader::new(file), &path.display().to_string())
    }

    pub fn report(&self, error: &ShellError) {
        eprintln!("{}", error.render(self.error_format));
    }

    fn suggest(&self, err: &ParseError) {
        if self.error_format != ErrorFormat::Text {
            return;
        }
        if let ParseError::Resolve(ResolveError::NotFound { name, .. }) = err {
            let suggestions = correction::suggest_command(name, self.runtime.path());
            if let Some(text) = correction::format_suggestions(&suggestions) {
                eprintln!("{}", text);
            }
        }
    }
}

fn with_location(error: ShellError, location: Option<SourceLocation>) -> ShellError {
    match location {
        Some(location) => error.with_location(location),
        None => error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn interpreter() -> Interpreter {
        Interpreter::new(Runtime::new(), ErrorFormat::Text)
    }

    #[test]
    fn test_blank_and_comment_lines_leave_store_unchanged() {
        let mut interp = interpreter();
        for line in ["", "   ", "# X=1", "  #comment"] {
            assert!(matches!(
                interp.interpret_line(line).unwrap(),
                LineOutcome::Empty
            ));
        }
        assert!(interp.runtime().is_empty());
    }

    #[test]
    fn test_assignment_then_substitution() {
        let mut interp = interpreter();
        interp.interpret_line("X=5").unwrap();
        interp.interpret_line("Y=$X$X").unwrap();
        assert_eq!(interp.runtime().get_variable("Y"), Some("55"));
    }

    #[test]
    fn test_reassignment_keeps_single_entry() {
        let mut interp = interpreter();
        interp.interpret_line("X=5").unwrap();
        interp.interpret_line("X=6").unwrap();
        assert_eq!(interp.runtime().len(), 1);
        assert_eq!(interp.runtime().get_variable("X"), Some("6"));
    }

    #[test]
    fn test_parse_error_leaves_store_unchanged() {
        let mut interp = interpreter();
        assert!(interp.interpret_line("1X=5").is_err());
        assert!(interp.runtime().is_empty());
    }

    #[test]
    fn test_run_lines_continues_after_errors() {
        let mut interp = interpreter();
        let script = "A=1\n=bad\nB=2\r\n";
        let status = interp.run_lines(Cursor::new(script), "test").unwrap();
        assert_eq!(status, 0);
        assert_eq!(interp.runtime().get_variable("A"), Some("1"));
        assert_eq!(interp.runtime().get_variable("B"), Some("2"));
    }

    #[test]
    fn test_unresolved_command_status() {
        let mut interp = interpreter();
        interp.interpret_line("PATH=/nonexistent/pipesh").unwrap();
        let status = interp.run_line("not_a_real_cmd", None).unwrap();
        assert_eq!(status, Some(127));
    }

    #[test]
    fn test_clean_end_of_input_is_success() {
        let mut interp = interpreter();
        interp.interpret_line("PATH=/usr/bin:/bin").unwrap();
        let script = "true\nfalse\nnot_a_real_cmd\n=bad\n";
        let status = interp.run_lines(Cursor::new(script), "test").unwrap();
        assert_eq!(status, 0);
    }

    #[test]
    fn test_run_file_missing() {
        let mut interp = interpreter();
        assert!(interp.run_file(Path::new("/nonexistent/init")).is_err());
    }
}
