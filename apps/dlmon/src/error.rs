//! CLI error handling

use std::fmt;

use dlmon_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(dlmon_errors::ConfigError),
    /// Monitor or ledger error
    Monitor(dlmon_errors::Error),
    /// Scenario file could not be parsed or refers to unknown entities
    Scenario(String),
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {e}"),
            CliError::Monitor(e) => {
                write!(f, "{}", e.user_message())?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                Ok(())
            }
            CliError::Scenario(msg) => write!(f, "Invalid scenario: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Monitor(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::Scenario(_) => None,
        }
    }
}

impl From<dlmon_errors::ConfigError> for CliError {
    fn from(e: dlmon_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<dlmon_errors::Error> for CliError {
    fn from(e: dlmon_errors::Error) -> Self {
        match e {
            dlmon_errors::Error::Config(config) => CliError::Config(config),
            other => CliError::Monitor(other),
        }
    }
}

impl From<dlmon_errors::MonitorError> for CliError {
    fn from(e: dlmon_errors::MonitorError) -> Self {
        CliError::Monitor(e.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
