//! Event records, deadlock history and derived performance counters

use crate::{DeadlockCycle, ProcessId, ResourceId, SystemSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Kind of a logged ledger or monitor event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Grant,
    Wait,
    AutoGrant,
    Release,
    DeadlockDetected,
    Resolution,
}

/// One entry of the bounded event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub process: ProcessId,
    pub resource: Option<ResourceId>,
    /// Time from the start of the operation to the moment it was logged
    pub response_time: Duration,
}

impl EventRecord {
    #[must_use]
    pub fn new(
        kind: EventKind,
        process: ProcessId,
        resource: Option<ResourceId>,
        response_time: Duration,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            process,
            resource,
            response_time,
        }
    }
}

/// One detected deadlock and how it ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlockRecord {
    pub timestamp: DateTime<Utc>,
    pub cycle: DeadlockCycle,
    /// Terminated process, `None` when the cycle was handed to callbacks
    pub victim: Option<ProcessId>,
}

/// Counters and derived rates exposed by `metrics()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MetricsSnapshot {
    /// Requests granted immediately
    pub requests_processed: u64,
    pub requests_queued: u64,
    pub requests_denied: u64,
    pub auto_grants: u64,
    pub releases: u64,
    pub deadlocks_detected: u64,
    pub deadlocks_resolved: u64,
    pub ticks: u64,
    pub tick_failures: u64,
    /// Mean response time over the most recent events
    pub avg_response_time: Duration,
    /// Requests processed per second of uptime
    pub throughput: f64,
    pub uptime: Duration,
}

/// Full simulation log: bounded event history, deadlock history and state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub captured_at: DateTime<Utc>,
    pub events: Vec<EventRecord>,
    pub deadlock_history: Vec<DeadlockRecord>,
    pub metrics: MetricsSnapshot,
    pub final_state: SystemSnapshot,
    pub total_events: usize,
}
