//! Point-in-time copies of the ledger for external consumers

use crate::{Priority, ProcessId, ResourceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sparse `(process, resource) -> count` matrix keyed by process
pub type SparseMatrix = BTreeMap<ProcessId, BTreeMap<ResourceId, u32>>;

/// Copied view of a single process record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessView {
    pub id: ProcessId,
    pub name: String,
    pub priority: Priority,
    /// Resources currently held, ascending
    pub held: Vec<ResourceId>,
    /// Resources currently waited on, ascending
    pub waiting_for: Vec<ResourceId>,
    pub created_at: DateTime<Utc>,
}

impl ProcessView {
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        !self.waiting_for.is_empty()
    }
}

/// Copied view of a single resource record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceView {
    pub id: ResourceId,
    pub name: String,
    pub total: u32,
    pub available: u32,
    /// Current holders, ascending
    pub holders: Vec<ProcessId>,
    /// Queued waiters in grant order
    pub waiters: Vec<ProcessId>,
}

/// Consistent copy of all process, resource and matrix state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub captured_at: DateTime<Utc>,
    pub processes: BTreeMap<ProcessId, ProcessView>,
    pub resources: BTreeMap<ResourceId, ResourceView>,
    pub allocation_matrix: SparseMatrix,
    pub request_matrix: SparseMatrix,
}

impl SystemSnapshot {
    /// Snapshot of an empty system
    #[must_use]
    pub fn empty() -> Self {
        Self {
            captured_at: Utc::now(),
            processes: BTreeMap::new(),
            resources: BTreeMap::new(),
            allocation_matrix: BTreeMap::new(),
            request_matrix: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty() && self.resources.is_empty()
    }

    #[must_use]
    pub fn process(&self, id: ProcessId) -> Option<&ProcessView> {
        self.processes.get(&id)
    }

    #[must_use]
    pub fn resource(&self, id: ResourceId) -> Option<&ResourceView> {
        self.resources.get(&id)
    }

    /// Number of resources a process holds (0 for unknown processes)
    #[must_use]
    pub fn held_count(&self, id: ProcessId) -> usize {
        self.processes.get(&id).map_or(0, |p| p.held.len())
    }

    /// Processes that currently wait on at least one resource
    #[must_use]
    pub fn waiting_processes(&self) -> Vec<ProcessId> {
        self.processes
            .values()
            .filter(|p| p.is_waiting())
            .map(|p| p.id)
            .collect()
    }
}
