//! Iterative depth-first cycle search

use dlmon_ledger::WaitForGraph;
use dlmon_types::{DeadlockCycle, ProcessId};
use std::collections::BTreeSet;

/// Find the first wait cycle, starting from waiting processes in ascending
/// id order
///
/// When the search reaches a process already on the current path, the
/// cycle is the suffix of the path starting at that process. Only the
/// first cycle found is returned.
#[must_use]
pub fn find_cycle(graph: &WaitForGraph) -> Option<DeadlockCycle> {
    let mut visited: BTreeSet<ProcessId> = BTreeSet::new();
    let mut on_path: BTreeSet<ProcessId> = BTreeSet::new();
    let mut path: Vec<ProcessId> = Vec::new();
    // (node, index of the next successor to explore)
    let mut stack: Vec<(ProcessId, usize)> = Vec::new();

    for &start in graph.waiting() {
        if !visited.insert(start) {
            continue;
        }
        on_path.insert(start);
        path.push(start);
        stack.push((start, 0));

        while let Some(top) = stack.len().checked_sub(1) {
            let (node, next_index) = stack[top];
            let Some(&next) = graph.successors(node).get(next_index) else {
                stack.pop();
                path.pop();
                on_path.remove(&node);
                continue;
            };
            stack[top].1 += 1;

            if on_path.contains(&next) {
                let start_of_cycle = path.iter().position(|p| *p == next).unwrap_or(0);
                return Some(DeadlockCycle::new(path[start_of_cycle..].to_vec()));
            }
            if !graph.is_waiting(next) || !visited.insert(next) {
                continue;
            }
            on_path.insert(next);
            path.push(next);
            stack.push((next, 0));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(u32, u32)]) -> WaitForGraph {
        let mut graph = WaitForGraph::default();
        for (from, to) in edges {
            graph.add_edge(ProcessId(*from), ProcessId(*to));
        }
        graph
    }

    fn ids(raw: &[u32]) -> Vec<ProcessId> {
        raw.iter().copied().map(ProcessId).collect()
    }

    #[test]
    fn test_empty_graph() {
        assert!(find_cycle(&WaitForGraph::default()).is_none());
    }

    #[test]
    fn test_chain_has_no_cycle() {
        // 0 -> 1 -> 2 -> 3, where 3 is not waiting
        assert!(find_cycle(&graph(&[(0, 1), (1, 2), (2, 3)])).is_none());
    }

    #[test]
    fn test_two_cycle() {
        let cycle = find_cycle(&graph(&[(0, 1), (1, 0)])).unwrap();
        assert_eq!(cycle.members(), ids(&[0, 1]).as_slice());
    }

    #[test]
    fn test_cycle_is_path_suffix() {
        // 0 -> 1 -> 2 -> 3 -> 1: the tail 0 is not part of the cycle
        let cycle = find_cycle(&graph(&[(0, 1), (1, 2), (2, 3), (3, 1)])).unwrap();
        assert_eq!(cycle.members(), ids(&[1, 2, 3]).as_slice());
    }

    #[test]
    fn test_diamond_without_cycle() {
        // 0 -> 1, 0 -> 2, 1 -> 3, 2 -> 3, 3 -> 4
        let g = graph(&[(0, 1), (0, 2), (1, 3), (2, 3), (3, 4)]);
        assert!(find_cycle(&g).is_none());
    }

    #[test]
    fn test_cycle_found_from_later_start() {
        // 0 -> 9 (not waiting), separate ring 4 -> 5 -> 6 -> 4
        let g = graph(&[(0, 9), (4, 5), (5, 6), (6, 4)]);
        let cycle = find_cycle(&g).unwrap();
        assert_eq!(cycle.members(), ids(&[4, 5, 6]).as_slice());
    }

    #[test]
    fn test_long_ring_does_not_recurse() {
        let edges: Vec<(u32, u32)> = (0..10_000).map(|i| (i, (i + 1) % 10_000)).collect();
        let cycle = find_cycle(&graph(&edges)).unwrap();
        assert_eq!(cycle.len(), 10_000);
        assert_eq!(cycle.members()[0], ProcessId(0));
    }
}
