//! Error types for building and dispatching commands.
//!
//! Registration problems live in [`RegistrationError`]; everything that can
//! go wrong once a command line is being handled is a [`DispatchError`].

use thiserror::Error;

use crate::validate::RegistrationError;

/// Failure to rebuild a schema instance from parsed arguments.
///
/// Unreachable for schemas that passed registration and were fed by the
/// parser bridge; seen only when arguments are assembled by hand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// No value was parsed for a declared option.
    #[error("no parsed value for option '{0}'")]
    MissingValue(String),

    /// The parsed value does not fit the field type.
    #[error("parsed value for '{name}' is {found}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A context field was declared but no context was injected.
    #[error("no context injected for field '{0}'")]
    MissingContext(String),

    /// A context field has a type other than `Context`.
    #[error("context field '{name}' has type {found}, expected Context")]
    ContextType { name: String, found: &'static str },
}

/// Errors raised while handling one command line.
///
/// Parse errors come from clap and are rendered as clap renders them; errors
/// from a command body are carried unchanged in [`DispatchError::Run`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Command-line parse failure, or `--help`/`--version` display.
    #[error(transparent)]
    Parse(#[from] clap::Error),

    /// Malformed schema met while preparing a one-off parse.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Instance construction failure.
    #[error("failed to build command: {0}")]
    Build(#[from] BuildError),

    /// The per-invocation async runtime could not start.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// A group's context setup failed.
    #[error("{0:#}")]
    Setup(anyhow::Error),

    /// The command body returned an error.
    #[error("{0:#}")]
    Run(anyhow::Error),
}

impl DispatchError {
    /// Process exit code for this error: clap's own code for parse errors
    /// (0 for help display), 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Parse(err) => u8::try_from(err.exit_code()).unwrap_or(1),
            _ => 1,
        }
    }

    /// The error returned by the command body, if that is what failed.
    pub fn run_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Run(err) => Some(err),
            _ => None,
        }
    }

    /// Prints the error the way users should see it: clap errors (and help)
    /// through clap, everything else as `Error: ...` on stderr.
    pub fn report(&self) {
        match self {
            Self::Parse(err) => {
                let _ = err.print();
            }
            other => eprintln!("Error: {other}"),
        }
    }
}
