//! Results returned by monitor operations

use dlmon_recovery::{PreemptionCandidate, TerminationOption};
use dlmon_types::{DeadlockCycle, ProcessId, Resolution, ResourceId};
use serde::{Deserialize, Serialize};

/// What a single monitor tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Sequence number within the current session (0 when skipped)
    pub tick: u64,
    /// Another tick was still running, so this one did nothing
    pub skipped: bool,
    pub cycle: Option<DeadlockCycle>,
    pub resolution: Option<Resolution>,
    /// Callbacks run because the cycle was not resolved
    pub callbacks_invoked: usize,
    /// Waiters granted after detection and recovery
    pub auto_granted: Vec<(ProcessId, ResourceId)>,
    /// Recovery or callback failure recorded for this tick
    pub failure: Option<String>,
}

impl TickReport {
    pub(crate) fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn resolved(&self) -> bool {
        matches!(self.resolution, Some(Resolution::Resolved { .. }))
    }
}

/// Termination and preemption estimates for one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryAdvice {
    pub cycle: DeadlockCycle,
    pub termination: Vec<TerminationOption>,
    pub preemption: Vec<PreemptionCandidate>,
}
