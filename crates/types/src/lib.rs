#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the dlmon deadlock monitor
//!
//! This crate provides the data model shared by every other crate:
//! identifiers, priorities, request outcomes, snapshots and event records.

pub mod ids;
pub mod metrics;
pub mod outcome;
pub mod priority;
pub mod snapshot;

// Re-export commonly used types
pub use ids::{IdParseError, ProcessId, ResourceId};
pub use metrics::{DeadlockRecord, EventKind, EventLog, EventRecord, MetricsSnapshot};
pub use outcome::{DeadlockCycle, DenialReason, RequestOutcome, Resolution};
pub use priority::{Priority, VictimPolicy};
pub use snapshot::{ProcessView, ResourceView, SparseMatrix, SystemSnapshot};
pub use uuid::Uuid;

use serde::{Deserialize, Serialize};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Table
    }
}

impl clap::ValueEnum for OutputFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Table, Self::Json]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Table => clap::builder::PossibleValue::new("table"),
            Self::Json => clap::builder::PossibleValue::new("json"),
        })
    }
}
