#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Deadlock cycle detection over the wait-for relation
//!
//! [`CycleDetector`] rebuilds the wait-for graph from the ledger and runs a
//! depth-first search restricted to waiting processes. Scans are throttled:
//! a call made sooner than the minimum interval after the previous scan
//! reports no cycle without looking at the ledger.

mod detector;
mod dfs;

pub use detector::{CycleDetector, Detection, DEFAULT_MIN_INTERVAL};
pub use dfs::find_cycle;

// The graph and the synchronous two-party check live with the ledger
pub use dlmon_ledger::{closes_two_party_cycle, WaitForGraph};
