use dlmon_types::MetricsSnapshot;
use serde::{Deserialize, Serialize};

/// Monitor loop lifecycle and performance events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    Started { interval_ms: u64 },

    Stopped,

    /// A tick failed; the loop keeps running
    TickFailed {
        tick: u64,
        failure: super::FailureContext,
    },

    /// Periodic performance snapshot
    Metrics { metrics: MetricsSnapshot },
}
