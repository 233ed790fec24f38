//! Safety check applied to a ledger snapshot

use crate::banker::check_safety;
use dlmon_errors::SafetyError;
use dlmon_types::{ProcessId, ResourceId, SparseMatrix, SystemSnapshot};
use serde::{Deserialize, Serialize};

/// Dense matrices built from a snapshot
///
/// Rows follow `processes` and columns follow `resources`, both ascending.
/// The need of a process is its outstanding request row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SafetyMatrices {
    pub processes: Vec<ProcessId>,
    pub resources: Vec<ResourceId>,
    pub allocation: Vec<Vec<u32>>,
    pub need: Vec<Vec<u32>>,
    pub available: Vec<u32>,
}

impl SafetyMatrices {
    #[must_use]
    pub fn from_snapshot(snapshot: &SystemSnapshot) -> Self {
        let processes: Vec<ProcessId> = snapshot.processes.keys().copied().collect();
        let resources: Vec<ResourceId> = snapshot.resources.keys().copied().collect();
        let dense = |matrix: &SparseMatrix| -> Vec<Vec<u32>> {
            processes
                .iter()
                .map(|p| {
                    let row = matrix.get(p);
                    resources
                        .iter()
                        .map(|r| row.and_then(|row| row.get(r)).copied().unwrap_or(0))
                        .collect()
                })
                .collect()
        };

        Self {
            allocation: dense(&snapshot.allocation_matrix),
            need: dense(&snapshot.request_matrix),
            available: snapshot.resources.values().map(|r| r.available).collect(),
            processes,
            resources,
        }
    }
}

/// Safety verdict expressed in process ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyAssessment {
    pub safe: bool,
    pub sequence: Vec<ProcessId>,
    /// Processes that cannot finish; in a deadlock these include every
    /// cycle member
    pub unfinished: Vec<ProcessId>,
}

/// Run the safety check on a snapshot
///
/// # Errors
///
/// Returns a `SafetyError` only if the snapshot is internally inconsistent.
pub fn assess(snapshot: &SystemSnapshot) -> Result<SafetyAssessment, SafetyError> {
    let matrices = SafetyMatrices::from_snapshot(snapshot);
    let verdict = check_safety(&matrices.allocation, &matrices.need, &matrices.available)?;
    let to_ids = |indices: Vec<usize>| -> Vec<ProcessId> {
        indices
            .into_iter()
            .filter_map(|i| matrices.processes.get(i).copied())
            .collect()
    };

    Ok(SafetyAssessment {
        safe: verdict.safe,
        sequence: to_ids(verdict.sequence),
        unfinished: to_ids(verdict.unfinished),
    })
}
