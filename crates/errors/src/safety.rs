//! Safety check error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SafetyError {
    #[error("{what} has {actual} entries, expected {expected}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("process index {index} out of range for {processes} processes")]
    ProcessOutOfRange { index: usize, processes: usize },
}

impl UserFacingError for SafetyError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        Some("Allocation, need and available must agree on process and resource counts.")
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::DimensionMismatch { .. } => "safety.dimension_mismatch",
            Self::ProcessOutOfRange { .. } => "safety.process_out_of_range",
        })
    }
}
