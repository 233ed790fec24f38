//! Victim selection shared by the engine and the advisory functions

use dlmon_types::{Priority, ProcessId, VictimPolicy};

/// Ordering key of a candidate; the smallest key is the victim
fn victim_key(
    policy: VictimPolicy,
    id: ProcessId,
    priority: Priority,
    held: usize,
) -> (u64, ProcessId) {
    match policy {
        VictimPolicy::LowestPriority => (priority.weight(), id),
        VictimPolicy::LeastResources => (u64::try_from(held).unwrap_or(u64::MAX), id),
    }
}

/// Pick the victim among `(id, priority, held count)` candidates
///
/// Ties are always broken by the lowest process id.
pub fn select_victim<I>(policy: VictimPolicy, candidates: I) -> Option<ProcessId>
where
    I: IntoIterator<Item = (ProcessId, Priority, usize)>,
{
    candidates
        .into_iter()
        .min_by_key(|(id, priority, held)| victim_key(policy, *id, *priority, *held))
        .map(|(id, _, _)| id)
}
