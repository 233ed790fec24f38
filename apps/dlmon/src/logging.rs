//! Structured logging integration for events
//!
//! Converts monitor events into tracing records with structured fields so
//! they can be consumed by the JSON subscriber or read on the console.

use dlmon_events::{AppEvent, DeadlockEvent, EventMessage, GeneralEvent, LedgerEvent, MonitorEvent};
use tracing::{debug, error, info, warn};

/// Log an event using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let meta = &message.meta;
    let source = meta.source.as_str();
    let session = meta.session_id.map(|id| id.to_string()).unwrap_or_default();

    match &message.event {
        AppEvent::Ledger(event) => match event {
            LedgerEvent::ProcessRegistered {
                process,
                name,
                priority,
            } => {
                debug!(source, session = %session, process = %process, name = %name, priority = %priority, "Process registered");
            }
            LedgerEvent::ResourceRegistered {
                resource,
                name,
                total,
            } => {
                debug!(source, session = %session, resource = %resource, name = %name, total, "Resource registered");
            }
            LedgerEvent::Granted {
                process,
                resource,
                response_time_us,
            } => {
                debug!(source, session = %session, process = %process, resource = %resource, response_time_us, "Resource granted");
            }
            LedgerEvent::Queued { process, resource } => {
                debug!(source, session = %session, process = %process, resource = %resource, "Request queued");
            }
            LedgerEvent::Denied {
                process,
                resource,
                reason,
            } => {
                info!(source, session = %session, process = %process, resource = %resource, reason = %reason, "Request denied");
            }
            LedgerEvent::Released { process, resource } => {
                debug!(source, session = %session, process = %process, resource = %resource, "Resource released");
            }
            LedgerEvent::AutoGranted { process, resource } => {
                debug!(source, session = %session, process = %process, resource = %resource, "Waiter granted");
            }
            LedgerEvent::SystemReset => {
                info!(source, session = %session, "System reset");
            }
        },

        AppEvent::Deadlock(event) => match event {
            DeadlockEvent::Detected { cycle } => {
                warn!(source, session = %session, cycle = %cycle, size = cycle.len(), "Deadlock detected");
            }
            DeadlockEvent::Resolved {
                cycle,
                victim,
                released,
            } => {
                info!(source, session = %session, cycle = %cycle, victim = %victim, released = released.len(), "Deadlock resolved");
            }
            DeadlockEvent::Unresolved {
                cycle,
                callbacks,
                reason,
            } => {
                warn!(source, session = %session, cycle = %cycle, callbacks, reason = ?reason, "Deadlock left to callbacks");
            }
        },

        AppEvent::Monitor(event) => match event {
            MonitorEvent::Started { interval_ms } => {
                info!(source, session = %session, interval_ms, "Monitoring started");
            }
            MonitorEvent::Stopped => {
                info!(source, session = %session, "Monitoring stopped");
            }
            MonitorEvent::TickFailed { tick, failure } => {
                error!(
                    source,
                    session = %session,
                    tick,
                    code = ?failure.code,
                    message = %failure.message,
                    retryable = failure.retryable,
                    "Monitor tick failed"
                );
            }
            MonitorEvent::Metrics { metrics } => {
                debug!(
                    source,
                    session = %session,
                    processed = metrics.requests_processed,
                    queued = metrics.requests_queued,
                    denied = metrics.requests_denied,
                    deadlocks = metrics.deadlocks_detected,
                    resolved = metrics.deadlocks_resolved,
                    throughput = metrics.throughput,
                    "Performance snapshot"
                );
            }
        },

        AppEvent::General(event) => match event {
            GeneralEvent::Warning { message, context } => {
                warn!(source, session = %session, context = ?context, "{message}");
            }
            GeneralEvent::Error { message, details } => {
                error!(source, session = %session, details = ?details, "{message}");
            }
            GeneralEvent::DebugLog { message, context } => {
                debug!(source, session = %session, context = ?context, "{message}");
            }
            GeneralEvent::OperationStarted { operation } => {
                info!(source, session = %session, operation = %operation, "Operation started");
            }
            GeneralEvent::OperationCompleted { operation, success } => {
                info!(source, session = %session, operation = %operation, success, "Operation completed");
            }
            GeneralEvent::OperationFailed { operation, error } => {
                error!(source, session = %session, operation = %operation, error = %error, "Operation failed");
            }
        },
    }
}
