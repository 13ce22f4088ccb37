//! CLI command implementations.

pub mod backup;
pub mod init;
pub mod inspect;
pub mod journal;
pub mod migrate;
pub mod transfer;
pub mod validate;
pub mod verify;

use std::str::FromStr;
use thiserror::Error;

/// Errors raised by the CLI itself, on top of store errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// `--format` was not `text` or `json`.
    #[error("unknown output format '{0}' (expected text or json)")]
    UnknownFormat(String),

    /// Validation found error-level issues.
    #[error("validation found {0} error(s)")]
    ValidationErrors(usize),

    /// One or more journals do not match their datasets.
    #[error("journal verification failed for {0} dataset(s)")]
    JournalMismatch(usize),
}

/// Output format shared by the reporting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl FromStr for OutputFormat {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(CliError::UnknownFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!(matches!(
            "yaml".parse::<OutputFormat>(),
            Err(CliError::UnknownFormat(f)) if f == "yaml"
        ));
    }
}
