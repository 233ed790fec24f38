use serde::{Deserialize, Serialize};

use crate::EventSource;
use dlmon_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code when the error provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod deadlock;
pub mod general;
pub mod ledger;
pub mod monitor;

pub use deadlock::*;
pub use general::*;
pub use ledger::*;
pub use monitor::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Ledger mutations (grants, waits, releases)
    Ledger(LedgerEvent),

    /// Deadlock detection and recovery
    Deadlock(DeadlockEvent),

    /// Monitor loop lifecycle and performance snapshots
    Monitor(MonitorEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Ledger(_) => EventSource::LEDGER,
            Self::Deadlock(_) => EventSource::DEADLOCK,
            Self::Monitor(_) => EventSource::MONITOR,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            // Error-level events
            Self::General(GeneralEvent::Error { .. } | GeneralEvent::OperationFailed { .. })
            | Self::Monitor(MonitorEvent::TickFailed { .. }) => Level::ERROR,

            // Warning-level events
            Self::General(GeneralEvent::Warning { .. })
            | Self::Deadlock(DeadlockEvent::Detected { .. } | DeadlockEvent::Unresolved { .. }) => {
                Level::WARN
            }

            // Debug-level events (per-request chatter, periodic snapshots)
            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Ledger(
                LedgerEvent::Granted { .. }
                | LedgerEvent::Queued { .. }
                | LedgerEvent::Released { .. }
                | LedgerEvent::AutoGranted { .. },
            )
            | Self::Monitor(MonitorEvent::Metrics { .. }) => Level::DEBUG,

            // Default to INFO for most events
            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "dlmon::events::general",
            Self::Ledger(_) => "dlmon::events::ledger",
            Self::Deadlock(_) => "dlmon::events::deadlock",
            Self::Monitor(_) => "dlmon::events::monitor",
        }
    }
}
