#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the dlmon deadlock monitor
//!
//! This crate provides fine-grained error types organized by domain.
//! All error types implement Clone so they can be recorded in event
//! streams and tick reports without losing the original value.

use std::borrow::Cow;

use thiserror::Error;

pub mod config;
pub mod ledger;
pub mod monitor;
pub mod recovery;
pub mod safety;

// Re-export all error types at the root
pub use config::ConfigError;
pub use ledger::{EntityKind, LedgerError};
pub use monitor::MonitorError;
pub use recovery::RecoveryError;
pub use safety::SafetyError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("recovery error: {0}")]
    Recovery(#[from] RecoveryError),

    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),

    #[error("safety error: {0}")]
    Safety(#[from] SafetyError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {message}")]
    Io { message: String },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(ConfigError::ParseError {
            message: err.to_string(),
        })
    }
}

/// Result type alias for dlmon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information without
/// requiring heavyweight envelopes.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for analytics / structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Ledger(err) => err.user_message(),
            Error::Recovery(err) => err.user_message(),
            Error::Monitor(err) => err.user_message(),
            Error::Safety(err) => err.user_message(),
            Error::Config(err) => err.user_message(),
            Error::Io { message } => Cow::Owned(message.clone()),
            Error::Internal(_) => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Ledger(err) => err.user_hint(),
            Error::Monitor(err) => err.user_hint(),
            Error::Safety(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Monitor(err) => err.is_retryable(),
            Error::Io { .. } => true,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Ledger(err) => err.user_code(),
            Error::Recovery(err) => err.user_code(),
            Error::Monitor(err) => err.user_code(),
            Error::Safety(err) => err.user_code(),
            Error::Config(err) => err.user_code(),
            Error::Internal(_) => Some("error.internal"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}
