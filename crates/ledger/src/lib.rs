#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Resource ledger for the dlmon deadlock monitor
//!
//! The ledger is the authoritative record of registered processes and
//! resources: who holds what, who waits for what, and how many instances
//! of each resource remain. Requests never block. A request is granted,
//! queued behind the current holders, or denied when queuing would close
//! an immediate two-party wait cycle.
//!
//! Allocation and request matrices are not stored; they are derived from
//! the process and resource records whenever a snapshot is taken.

mod ledger;
mod records;
pub mod wait_for;

pub use ledger::ResourceLedger;
pub use records::{Process, Resource};
pub use wait_for::{closes_two_party_cycle, WaitForGraph};
