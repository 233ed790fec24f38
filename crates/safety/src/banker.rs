//! Matrix form of the safety algorithm

use dlmon_errors::SafetyError;
use serde::{Deserialize, Serialize};

/// One process finishing during the safety walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyStep {
    pub process: usize,
    pub work_before: Vec<u32>,
    pub work_after: Vec<u32>,
}

/// Outcome of [`check_safety`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub safe: bool,
    /// Completion order found; complete only when `safe`
    pub sequence: Vec<usize>,
    /// Processes that could not finish, ascending
    pub unfinished: Vec<usize>,
    pub steps: Vec<SafetyStep>,
}

/// Outcome of [`check_request`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RequestDecision {
    /// Granting keeps the state safe; `sequence` witnesses it
    Granted { sequence: Vec<usize> },
    ExceedsNeed,
    ExceedsAvailable,
    /// Granting would leave no safe completion order
    Unsafe,
}

impl RequestDecision {
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// Run the safety algorithm
///
/// Each round picks the first unfinished process, in index order, whose
/// need fits in the current work vector.
///
/// # Errors
///
/// Returns `DimensionMismatch` when the matrices disagree on the number of
/// processes or resources.
pub fn check_safety(
    allocation: &[Vec<u32>],
    need: &[Vec<u32>],
    available: &[u32],
) -> Result<SafetyVerdict, SafetyError> {
    validate(allocation, need, available)?;

    let mut work: Vec<u32> = available.to_vec();
    let mut finished = vec![false; allocation.len()];
    let mut sequence = Vec::with_capacity(allocation.len());
    let mut steps = Vec::with_capacity(allocation.len());

    while sequence.len() < allocation.len() {
        let runnable = (0..allocation.len())
            .find(|&i| !finished[i] && fits(&need[i], &work));
        let Some(process) = runnable else {
            break;
        };

        let work_before = work.clone();
        for (w, held) in work.iter_mut().zip(&allocation[process]) {
            *w = w.saturating_add(*held);
        }
        finished[process] = true;
        sequence.push(process);
        steps.push(SafetyStep {
            process,
            work_before,
            work_after: work.clone(),
        });
    }

    let unfinished: Vec<usize> = (0..allocation.len()).filter(|i| !finished[*i]).collect();
    Ok(SafetyVerdict {
        safe: unfinished.is_empty(),
        sequence,
        unfinished,
        steps,
    })
}

/// Decide a request with the banker's rule
///
/// The request is tentatively allocated and kept only if the resulting
/// state is still safe. Inputs are not modified.
///
/// # Errors
///
/// Returns `DimensionMismatch` for inconsistent matrices or request length,
/// and `ProcessOutOfRange` for an invalid process index.
pub fn check_request(
    allocation: &[Vec<u32>],
    need: &[Vec<u32>],
    available: &[u32],
    process: usize,
    request: &[u32],
) -> Result<RequestDecision, SafetyError> {
    validate(allocation, need, available)?;
    if process >= allocation.len() {
        return Err(SafetyError::ProcessOutOfRange {
            index: process,
            processes: allocation.len(),
        });
    }
    expect_len("request", available.len(), request.len())?;

    if request.iter().zip(&need[process]).any(|(r, n)| r > n) {
        return Ok(RequestDecision::ExceedsNeed);
    }
    if !fits(request, available) {
        return Ok(RequestDecision::ExceedsAvailable);
    }

    let mut allocation = allocation.to_vec();
    let mut need = need.to_vec();
    let mut available = available.to_vec();
    for (j, amount) in request.iter().enumerate() {
        available[j] -= amount;
        allocation[process][j] += amount;
        need[process][j] -= amount;
    }

    let verdict = check_safety(&allocation, &need, &available)?;
    Ok(if verdict.safe {
        RequestDecision::Granted {
            sequence: verdict.sequence,
        }
    } else {
        RequestDecision::Unsafe
    })
}

fn fits(demand: &[u32], work: &[u32]) -> bool {
    demand.iter().zip(work).all(|(d, w)| d <= w)
}

fn validate(allocation: &[Vec<u32>], need: &[Vec<u32>], available: &[u32]) -> Result<(), SafetyError> {
    expect_len("need", allocation.len(), need.len())?;
    for (i, (alloc_row, need_row)) in allocation.iter().zip(need).enumerate() {
        expect_len(&format!("allocation row {i}"), available.len(), alloc_row.len())?;
        expect_len(&format!("need row {i}"), available.len(), need_row.len())?;
    }
    Ok(())
}

fn expect_len(what: &str, expected: usize, actual: usize) -> Result<(), SafetyError> {
    if expected == actual {
        Ok(())
    } else {
        Err(SafetyError::DimensionMismatch {
            what: what.to_string(),
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The classic five-process, three-resource textbook state
    fn textbook() -> (Vec<Vec<u32>>, Vec<Vec<u32>>, Vec<u32>) {
        let allocation = vec![
            vec![0, 1, 0],
            vec![2, 0, 0],
            vec![3, 0, 2],
            vec![2, 1, 1],
            vec![0, 0, 2],
        ];
        let max = [
            [7, 5, 3],
            [3, 2, 2],
            [9, 0, 2],
            [2, 2, 2],
            [4, 3, 3],
        ];
        let need = allocation
            .iter()
            .zip(max)
            .map(|(a, m)| a.iter().zip(m).map(|(a, m)| m - a).collect())
            .collect();
        (allocation, need, vec![3, 3, 2])
    }

    #[test]
    fn test_textbook_state_is_safe() {
        let (allocation, need, available) = textbook();
        let verdict = check_safety(&allocation, &need, &available).unwrap();
        assert!(verdict.safe);
        assert_eq!(verdict.sequence, vec![1, 3, 0, 2, 4]);
        assert!(verdict.unfinished.is_empty());
        assert_eq!(verdict.steps[0].work_before, vec![3, 3, 2]);
        assert_eq!(verdict.steps[0].work_after, vec![5, 3, 2]);
    }

    #[test]
    fn test_unsafe_state_reports_unfinished() {
        let allocation = vec![vec![1, 0], vec![0, 1]];
        let need = vec![vec![0, 1], vec![1, 0]];
        let verdict = check_safety(&allocation, &need, &[0, 0]).unwrap();
        assert!(!verdict.safe);
        assert!(verdict.sequence.is_empty());
        assert_eq!(verdict.unfinished, vec![0, 1]);
    }

    #[test]
    fn test_textbook_requests() {
        let (allocation, need, available) = textbook();
        // P1 asks for (1, 0, 2): granted
        assert!(check_request(&allocation, &need, &available, 1, &[1, 0, 2])
            .unwrap()
            .is_granted());
        // P4 asks for more than it needs
        assert_eq!(
            check_request(&allocation, &need, &available, 4, &[5, 0, 0]).unwrap(),
            RequestDecision::ExceedsNeed
        );
        // P0 asks for (0, 2, 0): fits but leaves the state unsafe
        assert_eq!(
            check_request(&allocation, &need, &[2, 3, 0], 0, &[0, 2, 0]).unwrap(),
            RequestDecision::Unsafe
        );
    }

    #[test]
    fn test_dimension_checks() {
        let err = check_safety(&[vec![1, 0]], &[vec![1]], &[0, 0]).unwrap_err();
        assert!(matches!(err, SafetyError::DimensionMismatch { .. }));

        let err = check_safety(&[vec![1, 0]], &[], &[0, 0]).unwrap_err();
        assert_eq!(
            err,
            SafetyError::DimensionMismatch {
                what: "need".to_string(),
                expected: 1,
                actual: 0
            }
        );

        let err = check_request(&[vec![0]], &[vec![1]], &[1], 3, &[1]).unwrap_err();
        assert_eq!(
            err,
            SafetyError::ProcessOutOfRange {
                index: 3,
                processes: 1
            }
        );
    }

    #[test]
    fn test_empty_system_is_safe() {
        let verdict = check_safety(&[], &[], &[]).unwrap();
        assert!(verdict.safe);
        assert!(verdict.sequence.is_empty());
    }
}
