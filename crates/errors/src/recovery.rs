//! Deadlock recovery error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum RecoveryError {
    #[error("cycle member is not a registered process: {id}")]
    UnknownVictim { id: String },

    #[error("failed to release {resource} held by {process}: {message}")]
    ReleaseFailed {
        process: String,
        resource: String,
        message: String,
    },
}

impl UserFacingError for RecoveryError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::UnknownVictim { .. } => "recovery.unknown_victim",
            Self::ReleaseFailed { .. } => "recovery.release_failed",
        })
    }
}
