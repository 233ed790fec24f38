#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Banker's safety check
//!
//! A state is safe when every process can finish in some order using the
//! available instances plus whatever earlier finishers hand back. The
//! matrix functions work on dense `process x resource` rows; [`assess`]
//! applies the same check to a ledger snapshot, treating each process's
//! outstanding requests as its remaining need.

mod banker;
mod snapshot;

pub use banker::{check_request, check_safety, RequestDecision, SafetyStep, SafetyVerdict};
pub use snapshot::{assess, SafetyAssessment, SafetyMatrices};
