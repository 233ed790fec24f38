use dlmon_types::{DenialReason, Priority, ProcessId, ResourceId};
use serde::{Deserialize, Serialize};

/// Ledger mutations: registrations, grants, waits and releases
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    ProcessRegistered {
        process: ProcessId,
        name: String,
        priority: Priority,
    },

    ResourceRegistered {
        resource: ResourceId,
        name: String,
        total: u32,
    },

    /// Request satisfied immediately
    Granted {
        process: ProcessId,
        resource: ResourceId,
        response_time_us: u64,
    },

    /// Request queued behind the current holders
    Queued {
        process: ProcessId,
        resource: ResourceId,
    },

    /// Request refused without queuing
    Denied {
        process: ProcessId,
        resource: ResourceId,
        reason: DenialReason,
    },

    Released {
        process: ProcessId,
        resource: ResourceId,
    },

    /// Queued waiter granted by the monitor loop
    AutoGranted {
        process: ProcessId,
        resource: ResourceId,
    },

    /// All processes, resources and history cleared
    SystemReset,
}
