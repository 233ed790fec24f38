//! Results of ledger requests, detection and recovery

use crate::{ProcessId, ResourceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a request was refused without being queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The process is already queued for this resource
    AlreadyWaiting,
    /// Queuing would close a wait cycle with the current holder
    WouldDeadlock,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyWaiting => write!(f, "already waiting"),
            Self::WouldDeadlock => write!(f, "would deadlock"),
        }
    }
}

/// Outcome of `request_resource`. Requests never block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RequestOutcome {
    Granted { already_held: bool },
    Queued,
    Denied { reason: DenialReason },
}

impl RequestOutcome {
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    #[must_use]
    pub const fn is_queued(&self) -> bool {
        matches!(self, Self::Queued)
    }

    #[must_use]
    pub const fn denial(&self) -> Option<DenialReason> {
        match self {
            Self::Denied { reason } => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted { already_held: true } => write!(f, "granted (already held)"),
            Self::Granted { already_held: false } => write!(f, "granted"),
            Self::Queued => write!(f, "queued"),
            Self::Denied { reason } => write!(f, "denied ({reason})"),
        }
    }
}

/// Ordered wait cycle: each process waits on a resource held by the next,
/// and the last waits on the first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeadlockCycle(Vec<ProcessId>);

impl DeadlockCycle {
    #[must_use]
    pub fn new(members: Vec<ProcessId>) -> Self {
        Self(members)
    }

    #[must_use]
    pub fn members(&self) -> &[ProcessId] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, process: ProcessId) -> bool {
        self.0.contains(&process)
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<ProcessId> {
        self.0
    }
}

impl From<Vec<ProcessId>> for DeadlockCycle {
    fn from(members: Vec<ProcessId>) -> Self {
        Self(members)
    }
}

impl fmt::Display for DeadlockCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for member in &self.0 {
            if !first {
                write!(f, " -> ")?;
            }
            write!(f, "{member}")?;
            first = false;
        }
        if let Some(head) = self.0.first() {
            write!(f, " -> {head}")?;
        }
        Ok(())
    }
}

/// Result of a recovery attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Resolution {
    /// The victim was terminated: its holdings released and its waits dropped
    Resolved {
        victim: ProcessId,
        released: Vec<ResourceId>,
        cancelled_waits: Vec<ResourceId>,
    },
    /// Nothing to resolve (empty cycle)
    NoCycle,
}

impl Resolution {
    #[must_use]
    pub const fn victim(&self) -> Option<ProcessId> {
        match self {
            Self::Resolved { victim, .. } => Some(*victim),
            Self::NoCycle => None,
        }
    }
}
