//! Resource ledger error types

use std::borrow::Cow;
use std::fmt;

use crate::UserFacingError;
use thiserror::Error;

/// Which registry an identifier was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKind {
    Process,
    Resource,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Process => write!(f, "process"),
            Self::Resource => write!(f, "resource"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum LedgerError {
    #[error("unknown {entity}: {id}")]
    UnknownEntity { entity: EntityKind, id: String },

    #[error("{entity} already registered: {id}")]
    DuplicateEntity { entity: EntityKind, id: String },

    #[error("invalid ledger state: {message}")]
    InvalidState { message: String },

    /// An internal invariant no longer holds; the ledger must be reset.
    #[error("ledger inconsistent: {message}")]
    Inconsistent { message: String },
}

impl LedgerError {
    pub fn unknown(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::UnknownEntity {
            entity,
            id: id.to_string(),
        }
    }

    pub fn duplicate(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::DuplicateEntity {
            entity,
            id: id.to_string(),
        }
    }
}

impl UserFacingError for LedgerError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnknownEntity { .. } => {
                Some("Register the process or resource before referencing it.")
            }
            Self::DuplicateEntity { .. } => {
                Some("Pick an unused id or reset the system before re-registering.")
            }
            Self::Inconsistent { .. } => Some("Reset the system to recover a consistent ledger."),
            Self::InvalidState { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::UnknownEntity { .. } => "ledger.unknown_entity",
            Self::DuplicateEntity { .. } => "ledger.duplicate_entity",
            Self::InvalidState { .. } => "ledger.invalid_state",
            Self::Inconsistent { .. } => "ledger.inconsistent",
        })
    }
}
