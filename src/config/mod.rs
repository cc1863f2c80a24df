//! Command-line surface and environment settings.

use std::env;
use std::path::PathBuf;

/// File run before anything else when `-i` is not given, relative to home.
pub const DEFAULT_INIT_FILE: &str = ".pipesh_init";
pub const ERROR_FORMAT_VAR: &str = "PIPESH_ERROR_FORMAT";
pub const LOG_VAR: &str = "PIPESH_LOG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorFormat {
    #[default]
    Text,
    Json,
}

impl ErrorFormat {
    pub fn from_env() -> Self {
        Self::from_value(env::var(ERROR_FORMAT_VAR).ok().as_deref())
    }

    /// `json` in any case selects JSON; anything else is text.
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("json") => ErrorFormat::Json,
            _ => ErrorFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `None` when no init file was given and no home directory is known.
    pub init_file: Option<PathBuf>,
    /// The init file came from `-i`/`--init-file`; failing to open it is fatal.
    pub init_explicit: bool,
    /// Script to run instead of reading stdin.
    pub script: Option<PathBuf>,
    pub error_format: ErrorFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Help,
    Run(Config),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("Missing init file path after argument: '-i'")]
    MissingInitFile,

    #[error("Missing init file path after '--init-file='")]
    EmptyInitFile,

    #[error("Unknown option: '{0}'")]
    UnknownOption(String),
}

/// Parse arguments (without the program name).
pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Invocation, UsageError> {
    let mut init_file: Option<PathBuf> = None;
    let mut script: Option<PathBuf> = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Invocation::Help),
            "-i" => {
                let file = args.next().ok_or(UsageError::MissingInitFile)?;
                init_file = Some(PathBuf::from(file));
            }
            _ if arg.starts_with("--init-file=") => {
                let file = &arg["--init-file=".len()..];
                if file.is_empty() {
                    return Err(UsageError::EmptyInitFile);
                }
                init_file = Some(PathBuf::from(file));
            }
            _ if arg.starts_with('-') && arg != "-" => {
                return Err(UsageError::UnknownOption(arg));
            }
            _ => {
                if let Some(previous) = script.replace(PathBuf::from(&arg)) {
                    tracing::debug!(ignored = %previous.display(), "later script argument wins");
                }
            }
        }
    }

    let init_explicit = init_file.is_some();
    let init_file = init_file.or_else(default_init_file);

    Ok(Invocation::Run(Config {
        init_file,
        init_explicit,
        script,
        error_format: ErrorFormat::from_env(),
    }))
}

pub fn default_init_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_INIT_FILE))
}

pub fn help_text() -> String {
    format!(
        "pipesh v{}\n\
         Usage: pipesh [OPTION]... [SCRIPT-FILE]\n\
         Options:\n  \
         -h, --help                 Display this help message\n  \
         -i FILE, --init-file=FILE  Use a specific init file. Default is ~/{}\n\
         If no script file is given, pipesh reads commands from standard input,\n\
         interactively when it is a terminal.\n\
         \n\
         Environment:\n  \
         {}        Log filter (default: pipesh=warn)\n  \
         {}  Set to 'json' for JSON error reports",
        env!("CARGO_PKG_VERSION"),
        DEFAULT_INIT_FILE,
        LOG_VAR,
        ERROR_FORMAT_VAR,
    )
}
