#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Deadlock recovery for dlmon
//!
//! [`RecoveryEngine`] breaks a detected cycle by terminating one member:
//! every resource it holds is released back to the ledger and all of its
//! outstanding waits are dropped. The advisory functions in [`advisory`]
//! estimate termination and preemption costs over a copied snapshot and
//! never touch live state.

pub mod advisory;
mod engine;
mod policy;

pub use advisory::{
    preemption_plan, termination_cost, termination_options, PreemptableResource,
    PreemptionCandidate, TerminationOption, TERMINATION_COST_PER_RESOURCE,
};
pub use engine::RecoveryEngine;
pub use policy::select_victim;
