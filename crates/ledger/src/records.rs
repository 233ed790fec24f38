//! Process and resource records owned by the ledger

use chrono::{DateTime, Utc};
use dlmon_types::{Priority, ProcessId, ProcessView, ResourceId, ResourceView};
use std::collections::{BTreeSet, VecDeque};

/// A registered process
#[derive(Debug, Clone)]
pub struct Process {
    pub(crate) id: ProcessId,
    pub(crate) name: String,
    pub(crate) priority: Priority,
    pub(crate) held: BTreeSet<ResourceId>,
    pub(crate) waiting_for: BTreeSet<ResourceId>,
    pub(crate) created_at: DateTime<Utc>,
}

impl Process {
    pub(crate) fn new(id: ProcessId, name: String, priority: Priority) -> Self {
        Self {
            id,
            name,
            priority,
            held: BTreeSet::new(),
            waiting_for: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ProcessId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Resources currently held, ascending
    #[must_use]
    pub fn held(&self) -> &BTreeSet<ResourceId> {
        &self.held
    }

    /// Resources the process is queued for, ascending
    #[must_use]
    pub fn waiting_for(&self) -> &BTreeSet<ResourceId> {
        &self.waiting_for
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn holds(&self, resource: ResourceId) -> bool {
        self.held.contains(&resource)
    }

    #[must_use]
    pub fn is_waiting(&self) -> bool {
        !self.waiting_for.is_empty()
    }

    pub(crate) fn view(&self) -> ProcessView {
        ProcessView {
            id: self.id,
            name: self.name.clone(),
            priority: self.priority,
            held: self.held.iter().copied().collect(),
            waiting_for: self.waiting_for.iter().copied().collect(),
            created_at: self.created_at,
        }
    }
}

/// A registered resource type with a fungible instance counter
#[derive(Debug, Clone)]
pub struct Resource {
    pub(crate) id: ResourceId,
    pub(crate) name: String,
    pub(crate) total: u32,
    pub(crate) available: u32,
    pub(crate) holders: BTreeSet<ProcessId>,
    /// Waiters in enqueue order; auto-grants are served from the front
    pub(crate) waiters: VecDeque<ProcessId>,
}

impl Resource {
    pub(crate) fn new(id: ResourceId, name: String, total: u32) -> Self {
        Self {
            id,
            name,
            total,
            available: total,
            holders: BTreeSet::new(),
            waiters: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn available(&self) -> u32 {
        self.available
    }

    #[must_use]
    pub fn holders(&self) -> &BTreeSet<ProcessId> {
        &self.holders
    }

    /// Queued waiters in grant order
    pub fn waiters(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.waiters.iter().copied()
    }

    pub(crate) fn view(&self) -> ResourceView {
        ResourceView {
            id: self.id,
            name: self.name.clone(),
            total: self.total,
            available: self.available,
            holders: self.holders.iter().copied().collect(),
            waiters: self.waiters.iter().copied().collect(),
        }
    }
}
