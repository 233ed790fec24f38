//! The resource ledger: registration, requests, releases and auto-grants

use crate::records::{Process, Resource};
use crate::wait_for::closes_two_party_cycle;
use chrono::Utc;
use dlmon_errors::{EntityKind, LedgerError};
use dlmon_types::{
    DenialReason, EventKind, EventRecord, Priority, ProcessId, RequestOutcome, ResourceId,
    SparseMatrix, SystemSnapshot,
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Authoritative process and resource state
///
/// Every mutation is a single call that either completes fully or leaves
/// the ledger untouched. Ledger events (grants, waits, auto-grants,
/// releases) are journaled until the owner drains them.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    processes: BTreeMap<ProcessId, Process>,
    resources: BTreeMap<ResourceId, Resource>,
    journal: Vec<EventRecord>,
}

impl ResourceLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a process
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntity` if the id is already registered.
    pub fn add_process(
        &mut self,
        id: ProcessId,
        name: impl Into<String>,
        priority: Priority,
    ) -> Result<(), LedgerError> {
        if self.processes.contains_key(&id) {
            return Err(LedgerError::duplicate(EntityKind::Process, id));
        }
        let process = Process::new(id, name.into(), priority);
        debug!(process = %id, name = %process.name, %priority, "process registered");
        self.processes.insert(id, process);
        Ok(())
    }

    /// Register a resource with `total` fungible instances
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntity` if the id is already registered.
    pub fn add_resource(
        &mut self,
        id: ResourceId,
        name: impl Into<String>,
        total: u32,
    ) -> Result<(), LedgerError> {
        if self.resources.contains_key(&id) {
            return Err(LedgerError::duplicate(EntityKind::Resource, id));
        }
        let resource = Resource::new(id, name.into(), total);
        debug!(resource = %id, name = %resource.name, total, "resource registered");
        self.resources.insert(id, resource);
        Ok(())
    }

    /// Request one instance of `resource` for `process`
    ///
    /// Grants immediately when an instance is free, otherwise queues the
    /// process behind the current holders. Re-requesting a held resource is
    /// a no-op grant; re-requesting a queued one is denied, as is a wait
    /// that would close an immediate two-party cycle.
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntity` if either id is not registered.
    pub fn request_resource(
        &mut self,
        process: ProcessId,
        resource: ResourceId,
    ) -> Result<RequestOutcome, LedgerError> {
        let started = Instant::now();
        let proc = self.process_record(process)?;
        let available = self.resource_record(resource)?.available;

        if proc.holds(resource) {
            return Ok(RequestOutcome::Granted { already_held: true });
        }
        if proc.waiting_for.contains(&resource) {
            return Ok(RequestOutcome::Denied {
                reason: DenialReason::AlreadyWaiting,
            });
        }

        if available > 0 {
            self.grant(process, resource)?;
            self.record(EventKind::Grant, process, Some(resource), started.elapsed());
            debug!(%process, %resource, "resource granted");
            return Ok(RequestOutcome::Granted { already_held: false });
        }

        if closes_two_party_cycle(self, process, resource) {
            debug!(%process, %resource, "request denied: would deadlock");
            return Ok(RequestOutcome::Denied {
                reason: DenialReason::WouldDeadlock,
            });
        }

        self.enqueue(process, resource)?;
        self.record(EventKind::Wait, process, Some(resource), started.elapsed());
        debug!(%process, %resource, "request queued");
        Ok(RequestOutcome::Queued)
    }

    /// Release one held instance of `resource`
    ///
    /// Returns `false` without changing anything when the process does not
    /// hold the resource. Queued waiters are not served here; see
    /// [`ResourceLedger::retry_waiters`].
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntity` if either id is not registered, or
    /// `Inconsistent` if the release would overflow the instance count.
    pub fn release_resource(
        &mut self,
        process: ProcessId,
        resource: ResourceId,
    ) -> Result<bool, LedgerError> {
        let started = Instant::now();
        if !self.process_record(process)?.holds(resource) {
            self.resource_record(resource)?;
            return Ok(false);
        }

        let res = self
            .resources
            .get_mut(&resource)
            .ok_or_else(|| LedgerError::unknown(EntityKind::Resource, resource))?;
        if res.available >= res.total {
            return Err(LedgerError::Inconsistent {
                message: format!("{resource} released beyond its {} instances", res.total),
            });
        }
        res.available += 1;
        res.holders.remove(&process);

        if let Some(proc) = self.processes.get_mut(&process) {
            proc.held.remove(&resource);
        }

        self.record(EventKind::Release, process, Some(resource), started.elapsed());
        debug!(%process, %resource, "resource released");
        Ok(true)
    }

    /// Grant freed instances to queued waiters
    ///
    /// Resources are visited in ascending id order and each resource serves
    /// its waiters first-in first-out. Returns the `(process, resource)`
    /// pairs that were granted.
    pub fn retry_waiters(&mut self) -> Vec<(ProcessId, ResourceId)> {
        let started = Instant::now();
        let mut granted = Vec::new();

        for resource in self.resources.values_mut() {
            while resource.available > 0 {
                let Some(waiter) = resource.waiters.pop_front() else {
                    break;
                };
                let Some(process) = self.processes.get_mut(&waiter) else {
                    continue;
                };
                process.waiting_for.remove(&resource.id);
                process.held.insert(resource.id);
                resource.holders.insert(waiter);
                resource.available -= 1;
                granted.push((waiter, resource.id));
            }
        }

        for (process, resource) in &granted {
            self.record(
                EventKind::AutoGrant,
                *process,
                Some(*resource),
                started.elapsed(),
            );
            debug!(%process, %resource, "queued request auto-granted");
        }
        granted
    }

    /// Drop every outstanding wait of `process`
    ///
    /// Returns the resources the process was queued for, ascending.
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntity` if the process is not registered.
    pub fn cancel_waits(&mut self, process: ProcessId) -> Result<Vec<ResourceId>, LedgerError> {
        let proc = self
            .processes
            .get_mut(&process)
            .ok_or_else(|| LedgerError::unknown(EntityKind::Process, process))?;
        let cancelled: Vec<ResourceId> = std::mem::take(&mut proc.waiting_for)
            .into_iter()
            .collect();

        for resource in &cancelled {
            if let Some(res) = self.resources.get_mut(resource) {
                res.waiters.retain(|w| *w != process);
            }
        }
        if !cancelled.is_empty() {
            debug!(%process, count = cancelled.len(), "outstanding waits cancelled");
        }
        Ok(cancelled)
    }

    /// Append an externally produced record to the journal
    pub fn record_event(&mut self, record: EventRecord) {
        self.journal.push(record);
    }

    /// Take all journaled event records, oldest first
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.journal)
    }

    /// Remove every process, resource and pending journal entry
    pub fn reset(&mut self) {
        self.processes.clear();
        self.resources.clear();
        self.journal.clear();
        info!("ledger reset");
    }

    #[must_use]
    pub fn process(&self, id: ProcessId) -> Option<&Process> {
        self.processes.get(&id)
    }

    #[must_use]
    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    /// Registered processes, ascending by id
    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    /// Registered resources, ascending by id
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    #[must_use]
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty() && self.resources.is_empty()
    }

    /// Processes with at least one outstanding wait, ascending
    #[must_use]
    pub fn waiting_processes(&self) -> Vec<ProcessId> {
        self.processes
            .values()
            .filter(|p| p.is_waiting())
            .map(Process::id)
            .collect()
    }

    /// Copy out the full state, deriving the allocation and request matrices
    #[must_use]
    pub fn snapshot(&self) -> SystemSnapshot {
        let mut allocation_matrix = SparseMatrix::new();
        let mut request_matrix = SparseMatrix::new();

        for process in self.processes.values() {
            if !process.held.is_empty() {
                allocation_matrix.insert(
                    process.id,
                    process.held.iter().map(|r| (*r, 1)).collect(),
                );
            }
            if !process.waiting_for.is_empty() {
                request_matrix.insert(
                    process.id,
                    process.waiting_for.iter().map(|r| (*r, 1)).collect(),
                );
            }
        }

        SystemSnapshot {
            captured_at: Utc::now(),
            processes: self
                .processes
                .iter()
                .map(|(id, p)| (*id, p.view()))
                .collect(),
            resources: self
                .resources
                .iter()
                .map(|(id, r)| (*id, r.view()))
                .collect(),
            allocation_matrix,
            request_matrix,
        }
    }

    /// Check every cross-record invariant
    ///
    /// # Errors
    ///
    /// Returns `Inconsistent` describing the first violation found.
    pub fn verify(&self) -> Result<(), LedgerError> {
        for resource in self.resources.values() {
            let held = u32::try_from(resource.holders.len()).unwrap_or(u32::MAX);
            if resource.available.checked_add(held) != Some(resource.total) {
                return Err(inconsistent(format!(
                    "{}: available {} + held {held} != total {}",
                    resource.id, resource.available, resource.total
                )));
            }
            for holder in &resource.holders {
                if !self.processes.get(holder).is_some_and(|p| p.holds(resource.id)) {
                    return Err(inconsistent(format!(
                        "{} lists holder {holder} which does not hold it",
                        resource.id
                    )));
                }
            }
            for waiter in &resource.waiters {
                if !self
                    .processes
                    .get(waiter)
                    .is_some_and(|p| p.waiting_for.contains(&resource.id))
                {
                    return Err(inconsistent(format!(
                        "{} queues {waiter} which is not waiting for it",
                        resource.id
                    )));
                }
            }
        }

        for process in self.processes.values() {
            if let Some(both) = process.held.intersection(&process.waiting_for).next() {
                return Err(inconsistent(format!(
                    "{} both holds and waits for {both}",
                    process.id
                )));
            }
            for resource in &process.held {
                if !self
                    .resources
                    .get(resource)
                    .is_some_and(|r| r.holders.contains(&process.id))
                {
                    return Err(inconsistent(format!(
                        "{} holds {resource} without being listed as a holder",
                        process.id
                    )));
                }
            }
            for resource in &process.waiting_for {
                if !self
                    .resources
                    .get(resource)
                    .is_some_and(|r| r.waiters.contains(&process.id))
                {
                    return Err(inconsistent(format!(
                        "{} waits for {resource} without being queued",
                        process.id
                    )));
                }
            }
        }
        Ok(())
    }

    fn process_record(&self, id: ProcessId) -> Result<&Process, LedgerError> {
        self.processes
            .get(&id)
            .ok_or_else(|| LedgerError::unknown(EntityKind::Process, id))
    }

    fn resource_record(&self, id: ResourceId) -> Result<&Resource, LedgerError> {
        self.resources
            .get(&id)
            .ok_or_else(|| LedgerError::unknown(EntityKind::Resource, id))
    }

    fn grant(&mut self, process: ProcessId, resource: ResourceId) -> Result<(), LedgerError> {
        let res = self
            .resources
            .get_mut(&resource)
            .ok_or_else(|| LedgerError::unknown(EntityKind::Resource, resource))?;
        let proc = self
            .processes
            .get_mut(&process)
            .ok_or_else(|| LedgerError::unknown(EntityKind::Process, process))?;

        res.available -= 1;
        res.holders.insert(process);
        proc.held.insert(resource);
        Ok(())
    }

    fn enqueue(&mut self, process: ProcessId, resource: ResourceId) -> Result<(), LedgerError> {
        let res = self
            .resources
            .get_mut(&resource)
            .ok_or_else(|| LedgerError::unknown(EntityKind::Resource, resource))?;
        let proc = self
            .processes
            .get_mut(&process)
            .ok_or_else(|| LedgerError::unknown(EntityKind::Process, process))?;

        res.waiters.push_back(process);
        proc.waiting_for.insert(resource);
        Ok(())
    }

    fn record(
        &mut self,
        kind: EventKind,
        process: ProcessId,
        resource: Option<ResourceId>,
        response_time: Duration,
    ) {
        self.journal
            .push(EventRecord::new(kind, process, resource, response_time));
    }
}

fn inconsistent(message: String) -> LedgerError {
    LedgerError::Inconsistent { message }
}
