use dlmon_types::{DeadlockCycle, ProcessId, ResourceId};
use serde::{Deserialize, Serialize};

/// Deadlock detection and recovery events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeadlockEvent {
    /// A wait cycle was found by a detection scan
    Detected { cycle: DeadlockCycle },

    /// A victim was terminated to break the cycle
    Resolved {
        cycle: DeadlockCycle,
        victim: ProcessId,
        released: Vec<ResourceId>,
    },

    /// Recovery did not break the cycle; it was handed to callbacks
    Unresolved {
        cycle: DeadlockCycle,
        callbacks: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}
