//! Error taxonomy for command resolution and dispatch

use thiserror::Error;

use crate::cli::RegistryError;
use crate::config::ConfigError;

/// Errors that end a kit invocation
#[derive(Error, Debug)]
pub enum KitError {
    /// No command matched the given tokens
    #[error("Unknown command '{0}'. Run 'kit help' to see available commands.")]
    CommandNotFound(String),

    /// The command line names an undeclared option or lacks an option value
    #[error("{}", argument_summary(.0))]
    InvalidArguments(#[from] clap::Error),

    /// A command's validator rejected the input
    #[error("{0}")]
    Validation(String),

    /// The executor failed; the error is passed through unchanged
    #[error(transparent)]
    Execution(anyhow::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl KitError {
    /// Errors caused by what the user typed, as opposed to a failed run
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::CommandNotFound(_) | Self::InvalidArguments(_) | Self::Validation(_)
        )
    }
}

/// First line of clap's report, without its own `error:` prefix
fn argument_summary(err: &clap::Error) -> String {
    let text = err.to_string();
    let first = text.lines().next().unwrap_or_default();
    format!(
        "{}. Run 'kit help' to see available options.",
        first.trim_start_matches("error: ")
    )
}

pub type Result<T> = std::result::Result<T, KitError>;
