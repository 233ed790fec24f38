#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for the dlmon deadlock monitor
//!
//! This crate is the outbound notification sink of the monitor. Ledger
//! mutations, deadlock detections, recoveries and periodic performance
//! snapshots are published as [`AppEvent`]s over an unbounded channel.
//! Emission never blocks and never fails: a dropped receiver simply means
//! nobody is listening.
//!
//! ## Architecture
//!
//! - **Domain-driven events**: grouped by functional domain (Ledger, Deadlock, Monitor)
//! - **Unified `EventEmitter` trait**: single API for every emission site
//! - **Tracing integration**: each event carries the log level and target it maps to

pub mod meta;
pub use meta::{EventLevel, EventMeta, EventSource};

pub mod events;
pub use events::{
    AppEvent, DeadlockEvent, FailureContext, GeneralEvent, LedgerEvent, MonitorEvent,
};

use dlmon_types::{DeadlockCycle, MetricsSnapshot, ProcessId, ResourceId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// An event together with its emission metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub meta: EventMeta,
    pub event: AppEvent,
}

impl EventMessage {
    /// Wrap an event with freshly generated metadata
    #[must_use]
    pub fn new(event: AppEvent) -> Self {
        let meta = EventMeta::new(event.log_level(), event.event_source());
        Self { meta, event }
    }
}

/// Type alias for the event sender
pub type EventSender = UnboundedSender<EventMessage>;

/// Type alias for the event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<EventMessage>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout dlmon
///
/// Implemented by the raw [`EventSender`] and by anything that owns an
/// optional sender (the monitor does).
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Session the emitted events belong to, if the emitter tracks one
    fn session_id(&self) -> Option<Uuid> {
        None
    }

    /// Emit an event with explicit metadata
    fn emit_with_meta(&self, meta: EventMeta, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(EventMessage { meta, event });
        }
    }

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if self.event_sender().is_none() {
            return;
        }
        let mut meta = EventMeta::new(event.log_level(), event.event_source());
        meta.session_id = self.session_id();
        self.emit_with_meta(meta, event);
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit a warning event with context
    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    /// Emit an error event
    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }

    /// Emit a ledger event
    fn emit_ledger(&self, event: LedgerEvent) {
        self.emit(AppEvent::Ledger(event));
    }

    /// Emit a deadlock detected event
    fn emit_deadlock_detected(&self, cycle: &DeadlockCycle) {
        self.emit(AppEvent::Deadlock(DeadlockEvent::Detected {
            cycle: cycle.clone(),
        }));
    }

    /// Emit a deadlock resolved event
    fn emit_deadlock_resolved(
        &self,
        cycle: &DeadlockCycle,
        victim: ProcessId,
        released: Vec<ResourceId>,
    ) {
        self.emit(AppEvent::Deadlock(DeadlockEvent::Resolved {
            cycle: cycle.clone(),
            victim,
            released,
        }));
    }

    /// Emit a deadlock unresolved event
    fn emit_deadlock_unresolved(
        &self,
        cycle: &DeadlockCycle,
        callbacks: usize,
        reason: Option<String>,
    ) {
        self.emit(AppEvent::Deadlock(DeadlockEvent::Unresolved {
            cycle: cycle.clone(),
            callbacks,
            reason,
        }));
    }

    /// Emit a performance snapshot
    fn emit_metrics(&self, metrics: MetricsSnapshot) {
        self.emit(AppEvent::Monitor(MonitorEvent::Metrics { metrics }));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}
