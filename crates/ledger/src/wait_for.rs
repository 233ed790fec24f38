//! Wait-for relation derived from the ledger
//!
//! An edge `A -> B` means process `A` is queued for a resource that `B`
//! currently holds. The relation is rebuilt from the ledger on demand
//! rather than maintained incrementally.

use crate::ResourceLedger;
use dlmon_types::{ProcessId, ResourceId};
use std::collections::{BTreeMap, BTreeSet};

/// Wait-for graph over the processes that are currently waiting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitForGraph {
    /// Waiting processes, ascending
    waiting: BTreeSet<ProcessId>,
    /// Adjacency list (waiter -> holders), successors sorted and deduplicated
    edges: BTreeMap<ProcessId, Vec<ProcessId>>,
}

impl WaitForGraph {
    /// Build the relation from the current ledger state
    #[must_use]
    pub fn build(ledger: &ResourceLedger) -> Self {
        let mut graph = Self::default();

        for process in ledger.processes().filter(|p| p.is_waiting()) {
            graph.waiting.insert(process.id());
            let mut holders: BTreeSet<ProcessId> = BTreeSet::new();
            for resource_id in process.waiting_for() {
                if let Some(resource) = ledger.resource(*resource_id) {
                    holders.extend(resource.holders().iter().filter(|h| **h != process.id()));
                }
            }
            graph.edges.insert(process.id(), holders.into_iter().collect());
        }

        graph
    }

    /// Add a single edge; used to assemble graphs by hand
    pub fn add_edge(&mut self, waiter: ProcessId, holder: ProcessId) {
        if waiter == holder {
            return;
        }
        self.waiting.insert(waiter);
        let successors = self.edges.entry(waiter).or_default();
        if let Err(pos) = successors.binary_search(&holder) {
            successors.insert(pos, holder);
        }
    }

    /// Processes with at least one outstanding wait, ascending
    #[must_use]
    pub fn waiting(&self) -> &BTreeSet<ProcessId> {
        &self.waiting
    }

    #[must_use]
    pub fn is_waiting(&self, process: ProcessId) -> bool {
        self.waiting.contains(&process)
    }

    /// Holders that `process` waits on, ascending
    #[must_use]
    pub fn successors(&self, process: ProcessId) -> &[ProcessId] {
        self.edges.get(&process).map_or(&[], Vec::as_slice)
    }

    /// All `(waiter, holder)` pairs
    pub fn edges(&self) -> impl Iterator<Item = (ProcessId, ProcessId)> + '_ {
        self.edges
            .iter()
            .flat_map(|(waiter, holders)| holders.iter().map(move |holder| (*waiter, *holder)))
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}

/// Whether queuing `requester` on `resource` would close a two-party cycle
///
/// True when some other holder of `resource` is itself waiting for a
/// resource that `requester` already holds. Unknown ids never close a cycle.
#[must_use]
pub fn closes_two_party_cycle(
    ledger: &ResourceLedger,
    requester: ProcessId,
    resource: ResourceId,
) -> bool {
    let (Some(process), Some(resource)) = (ledger.process(requester), ledger.resource(resource))
    else {
        return false;
    };

    resource
        .holders()
        .iter()
        .filter(|holder| **holder != requester)
        .filter_map(|holder| ledger.process(*holder))
        .any(|holder| {
            holder
                .waiting_for()
                .iter()
                .any(|wanted| process.holds(*wanted))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlmon_types::Priority;

    fn ledger_with(processes: u32, resources: u32) -> ResourceLedger {
        let mut ledger = ResourceLedger::new();
        for i in 0..processes {
            ledger
                .add_process(ProcessId(i), format!("proc-{i}"), Priority::Medium)
                .unwrap();
        }
        for i in 0..resources {
            ledger
                .add_resource(ResourceId(i), format!("res-{i}"), 1)
                .unwrap();
        }
        ledger
    }

    #[test]
    fn test_empty_ledger_has_no_edges() {
        let ledger = ledger_with(3, 3);
        let graph = WaitForGraph::build(&ledger);
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_edges_point_from_waiter_to_holder() {
        let mut ledger = ledger_with(3, 1);
        ledger.request_resource(ProcessId(0), ResourceId(0)).unwrap();
        ledger.request_resource(ProcessId(1), ResourceId(0)).unwrap();
        ledger.request_resource(ProcessId(2), ResourceId(0)).unwrap();

        let graph = WaitForGraph::build(&ledger);
        assert_eq!(graph.waiting().len(), 2);
        assert_eq!(graph.successors(ProcessId(1)), &[ProcessId(0)]);
        assert_eq!(graph.successors(ProcessId(2)), &[ProcessId(0)]);
        assert!(graph.successors(ProcessId(0)).is_empty());
        assert_eq!(
            graph.edges().collect::<Vec<_>>(),
            vec![(ProcessId(1), ProcessId(0)), (ProcessId(2), ProcessId(0))]
        );
    }

    #[test]
    fn test_add_edge_ignores_self_loops_and_duplicates() {
        let mut graph = WaitForGraph::default();
        graph.add_edge(ProcessId(1), ProcessId(1));
        assert!(graph.is_empty());

        graph.add_edge(ProcessId(1), ProcessId(3));
        graph.add_edge(ProcessId(1), ProcessId(2));
        graph.add_edge(ProcessId(1), ProcessId(3));
        assert_eq!(graph.successors(ProcessId(1)), &[ProcessId(2), ProcessId(3)]);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_two_party_pre_check() {
        let mut ledger = ledger_with(2, 2);
        ledger.request_resource(ProcessId(0), ResourceId(0)).unwrap();
        ledger.request_resource(ProcessId(1), ResourceId(1)).unwrap();

        // Nobody waits yet
        assert!(!closes_two_party_cycle(&ledger, ProcessId(0), ResourceId(1)));

        ledger.request_resource(ProcessId(0), ResourceId(1)).unwrap();
        assert!(closes_two_party_cycle(&ledger, ProcessId(1), ResourceId(0)));
        assert!(!closes_two_party_cycle(&ledger, ProcessId(9), ResourceId(0)));
    }
}
