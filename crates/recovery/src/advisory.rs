//! Cost estimates for termination and preemption
//!
//! Pure functions over a copied [`SystemSnapshot`]; used for reporting,
//! never in the detection path.

use crate::policy::select_victim;
use dlmon_types::{
    DeadlockCycle, Priority, ProcessId, ResourceId, SystemSnapshot, VictimPolicy,
};
use serde::{Deserialize, Serialize};

/// Cost charged per held resource when a process is terminated
pub const TERMINATION_COST_PER_RESOURCE: u64 = 10;

/// A possible victim under one selection policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationOption {
    pub policy: VictimPolicy,
    pub process: ProcessId,
    pub priority: Priority,
    pub reason: String,
    pub cost: u64,
}

/// A resource that could be taken from a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreemptableResource {
    pub resource: ResourceId,
    pub amount: u32,
    pub preemption_cost: u64,
}

/// Everything preemptable from one cycle member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreemptionCandidate {
    pub process: ProcessId,
    pub resources: Vec<PreemptableResource>,
}

impl PreemptionCandidate {
    #[must_use]
    pub fn total_cost(&self) -> u64 {
        self.resources.iter().map(|r| r.preemption_cost).sum()
    }
}

/// Cost of terminating `process`: held resources times a constant
#[must_use]
pub fn termination_cost(snapshot: &SystemSnapshot, process: ProcessId) -> u64 {
    u64::try_from(snapshot.held_count(process))
        .unwrap_or(u64::MAX)
        .saturating_mul(TERMINATION_COST_PER_RESOURCE)
}

/// One termination candidate per victim policy
///
/// Members missing from the snapshot are ignored.
#[must_use]
pub fn termination_options(
    snapshot: &SystemSnapshot,
    cycle: &DeadlockCycle,
) -> Vec<TerminationOption> {
    let candidates: Vec<_> = cycle
        .members()
        .iter()
        .filter_map(|id| snapshot.process(*id))
        .map(|p| (p.id, p.priority, p.held.len()))
        .collect();

    [VictimPolicy::LowestPriority, VictimPolicy::LeastResources]
        .into_iter()
        .filter_map(|policy| {
            let victim = select_victim(policy, candidates.iter().copied())?;
            let priority = snapshot.process(victim)?.priority;
            let reason = match policy {
                VictimPolicy::LowestPriority => "lowest priority process",
                VictimPolicy::LeastResources => "holds least resources",
            };
            Some(TerminationOption {
                policy,
                process: victim,
                priority,
                reason: reason.to_string(),
                cost: termination_cost(snapshot, victim),
            })
        })
        .collect()
}

/// Resources that could be preempted from each cycle member
///
/// Members holding nothing are left out. Preempting an instance costs the
/// holder's priority weight, so taking from high priority work is dearer.
#[must_use]
pub fn preemption_plan(snapshot: &SystemSnapshot, cycle: &DeadlockCycle) -> Vec<PreemptionCandidate> {
    cycle
        .members()
        .iter()
        .filter_map(|id| snapshot.process(*id))
        .filter(|p| !p.held.is_empty())
        .map(|p| {
            let weight = p.priority.weight();
            let resources = p
                .held
                .iter()
                .map(|resource| {
                    let amount = snapshot
                        .allocation_matrix
                        .get(&p.id)
                        .and_then(|row| row.get(resource))
                        .copied()
                        .unwrap_or(1);
                    PreemptableResource {
                        resource: *resource,
                        amount,
                        preemption_cost: u64::from(amount) * weight,
                    }
                })
                .collect();
            PreemptionCandidate {
                process: p.id,
                resources,
            }
        })
        .collect()
}
