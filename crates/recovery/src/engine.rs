//! Victim termination against the live ledger

use crate::policy::select_victim;
use dlmon_errors::RecoveryError;
use dlmon_ledger::ResourceLedger;
use dlmon_types::{DeadlockCycle, EventKind, EventRecord, ProcessId, Resolution, VictimPolicy};
use std::time::Instant;
use tracing::{info, warn};

/// Terminates one cycle member to break a deadlock
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryEngine {
    policy: VictimPolicy,
}

impl RecoveryEngine {
    #[must_use]
    pub fn new(policy: VictimPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> VictimPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: VictimPolicy) {
        self.policy = policy;
    }

    /// Choose the member of `cycle` to terminate
    ///
    /// # Errors
    ///
    /// Returns `UnknownVictim` if a cycle member is not registered.
    pub fn choose_victim(
        &self,
        ledger: &ResourceLedger,
        cycle: &DeadlockCycle,
    ) -> Result<Option<ProcessId>, RecoveryError> {
        let mut candidates = Vec::with_capacity(cycle.len());
        for member in cycle.members() {
            let process = ledger.process(*member).ok_or_else(|| RecoveryError::UnknownVictim {
                id: member.to_string(),
            })?;
            candidates.push((process.id(), process.priority(), process.held().len()));
        }
        Ok(select_victim(self.policy, candidates))
    }

    /// Break `cycle` by terminating the selected victim
    ///
    /// The victim's held resources are released one by one and its pending
    /// waits are cleared; it is not re-queued. Queued waiters of the freed
    /// resources are served by the next waiter retry, not here. An empty
    /// cycle yields [`Resolution::NoCycle`].
    ///
    /// # Errors
    ///
    /// Returns `UnknownVictim` if a cycle member is not registered, or
    /// `ReleaseFailed` if the ledger refuses to release a held resource.
    pub fn auto_resolve(
        &self,
        ledger: &mut ResourceLedger,
        cycle: &DeadlockCycle,
    ) -> Result<Resolution, RecoveryError> {
        let started = Instant::now();
        let Some(victim) = self.choose_victim(ledger, cycle)? else {
            return Ok(Resolution::NoCycle);
        };

        let held: Vec<_> = ledger
            .process(victim)
            .map(|p| p.held().iter().copied().collect())
            .unwrap_or_default();

        let mut released = Vec::with_capacity(held.len());
        for resource in held {
            match ledger.release_resource(victim, resource) {
                Ok(true) => released.push(resource),
                Ok(false) => {
                    return Err(RecoveryError::ReleaseFailed {
                        process: victim.to_string(),
                        resource: resource.to_string(),
                        message: "resource was not held".to_string(),
                    })
                }
                Err(e) => {
                    warn!(%victim, %resource, error = %e, "release during recovery failed");
                    return Err(RecoveryError::ReleaseFailed {
                        process: victim.to_string(),
                        resource: resource.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let cancelled_waits =
            ledger
                .cancel_waits(victim)
                .map_err(|_| RecoveryError::UnknownVictim {
                    id: victim.to_string(),
                })?;

        ledger.record_event(EventRecord::new(
            EventKind::Resolution,
            victim,
            None,
            started.elapsed(),
        ));
        info!(
            %cycle,
            %victim,
            released = released.len(),
            cancelled = cancelled_waits.len(),
            "deadlock resolved by terminating victim"
        );

        Ok(Resolution::Resolved {
            victim,
            released,
            cancelled_waits,
        })
    }
}
