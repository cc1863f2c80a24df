#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use pipesh::config::{self, Config, Invocation, LOG_VAR};
use pipesh::error::ShellError;
use pipesh::signal::SignalHandler;
use pipesh::{Interpreter, Runtime};
use reedline::{Prompt, PromptHistorySearch, PromptHistorySearchStatus, Reedline, Signal};
use std::borrow::Cow;
use std::env;
use std::io::{self, BufReader};
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    init_tracing();

    let invocation = match config::parse_args(env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(e) => {
            let error = ShellError::usage(e.to_string());
            eprintln!("{}", error.render(config::ErrorFormat::from_env()));
            process::exit(error.exit_code);
        }
    };

    let config = match invocation {
        Invocation::Help => {
            println!("{}", config::help_text());
            return;
        }
        Invocation::Run(config) => config,
    };

    match run(&config) {
        Ok(code) => process::exit(code),
        Err(e) => {
            let error = ShellError::io(format!("{:#}", e));
            eprintln!("{}", error.render(config.error_format));
            process::exit(error.exit_code);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new("pipesh=warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run(config: &Config) -> Result<i32> {
    let signal_handler = SignalHandler::new();
    if let Err(e) = signal_handler.setup() {
        eprintln!("Warning: Failed to setup signal handlers: {}", e);
    }

    let mut interpreter = Interpreter::new(Runtime::new(), config.error_format)
        .with_signal_handler(signal_handler);

    run_init_file(&mut interpreter, config)?;

    if interpreter.runtime().path().is_none() {
        eprintln!("Warning: PATH is not defined; only commands given by path will run");
    }

    match &config.script {
        Some(script) => interpreter.run_file(script),
        None if atty::is(atty::Stream::Stdin) => run_interactive(&mut interpreter),
        None => {
            let stdin = io::stdin();
            interpreter.run_lines(BufReader::new(stdin.lock()), "<stdin>")
        }
    }
}

fn run_init_file(interpreter: &mut Interpreter, config: &Config) -> Result<()> {
    let Some(init_file) = &config.init_file else {
        eprintln!("Warning: no home directory, skipping init file");
        *interpreter.runtime_mut() = Runtime::from_process_path();
        return Ok(());
    };

    if !config.init_explicit && !init_file.exists() {
        eprintln!(
            "Warning: init file {} not found, using PATH from the environment",
            init_file.display()
        );
        *interpreter.runtime_mut() = Runtime::from_process_path();
        return Ok(());
    }

    interpreter
        .run_file(init_file)
        .with_context(|| format!("Failed to run init script: {}", init_file.display()))?;
    Ok(())
}

/// `USER@<CWD> <: `
struct PipeshPrompt {
    user: String,
}

impl PipeshPrompt {
    fn new() -> Self {
        Self {
            user: whoami::username(),
        }
    }

    fn get_prompt_indicator(&self) -> String {
        let cwd = env::current_dir()
            .map(|cwd| cwd.display().to_string())
            .unwrap_or_else(|_| "?".to_string());
        format!("{}@<{}> <: ", self.user, cwd)
    }
}

impl Prompt for PipeshPrompt {
    fn render_prompt_left(&self) -> Cow<str> {
        Cow::Owned(self.get_prompt_indicator())
    }

    fn render_prompt_right(&self) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: reedline::PromptEditMode) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        Cow::Borrowed("> ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };

        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}

fn run_interactive(interpreter: &mut Interpreter) -> Result<i32> {
    let mut line_editor = Reedline::create();
    let prompt = PipeshPrompt::new();

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                interpreter.run_line(&buffer, None)?;
            }
            Ok(Signal::CtrlC) => continue,
            Ok(Signal::CtrlD) => break,
            Err(e) => {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                eprintln!("Error reading line: {}", e);
                break;
            }
        }
    }

    Ok(0)
}
