//! Monitor lifecycle error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum MonitorError {
    #[error("monitoring is already running")]
    AlreadyRunning,

    #[error("no async runtime available to host the monitor loop")]
    NoRuntime,

    #[error("invalid monitor interval: {interval_ms}ms")]
    InvalidInterval { interval_ms: u64 },

    #[error("lock poisoned: {what}")]
    LockPoisoned { what: String },

    #[error("monitor tick failed: {message}")]
    TickFailed { message: String },
}

impl MonitorError {
    pub fn poisoned(what: impl Into<String>) -> Self {
        Self::LockPoisoned { what: what.into() }
    }
}

impl UserFacingError for MonitorError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::AlreadyRunning => Some("Stop monitoring before starting it again."),
            Self::NoRuntime => Some("Start monitoring from within a tokio runtime."),
            Self::InvalidInterval { .. } => Some("Use a monitor interval greater than zero."),
            Self::LockPoisoned { .. } => Some("Reset the system to discard the damaged state."),
            Self::TickFailed { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::TickFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::AlreadyRunning => "monitor.already_running",
            Self::NoRuntime => "monitor.no_runtime",
            Self::InvalidInterval { .. } => "monitor.invalid_interval",
            Self::LockPoisoned { .. } => "monitor.lock_poisoned",
            Self::TickFailed { .. } => "monitor.tick_failed",
        })
    }
}
