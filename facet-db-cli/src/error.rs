use colored::Colorize;
use std::fmt;
use std::process;

/// Exit codes for the CLI (success is the normal return from `main`).
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

/// Unified error type for CLI operations.
pub enum CliError {
    /// Error from the selection cache.
    Core(facet_db_core::SelectionError),
    /// Configuration issues.
    Config(String),
    /// Unreadable input or parse failure.
    Input(String),
    /// Argument / usage errors.
    Usage(String),
    /// A swap round trip changed the data.
    Mismatch(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Core(e) => write!(f, "{} {e}", "error:".red().bold()),
            CliError::Config(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::Input(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::Usage(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::Mismatch(msg) => write!(
                f,
                "{} {msg}\n  {} rerun with -v to see the swap log",
                "error:".red().bold(),
                "help:".cyan().bold(),
            ),
        }
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<facet_db_core::SelectionError> for CliError {
    fn from(e: facet_db_core::SelectionError) -> Self {
        match e {
            facet_db_core::SelectionError::Config(msg) => CliError::Config(msg),
            facet_db_core::SelectionError::Json(e) => CliError::Input(format!("JSON parse error: {e}")),
            other => CliError::Core(other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Input(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Input(format!("JSON parse error: {e}"))
    }
}

/// Print error and exit with the appropriate code.
pub fn exit_with_error(err: CliError) -> ! {
    eprintln!("{err}");
    let code = match &err {
        CliError::Usage(_) => EXIT_USAGE,
        _ => EXIT_ERROR,
    };
    process::exit(code)
}

pub type CliResult<T> = std::result::Result<T, CliError>;
