//! Error types for registry operations.

use thiserror::Error;

use crate::Amount;
use crate::ledger::{ErrorKind, LedgerError};
use crate::model::GroupId;

/// Top-level error returned by [`Registry`](super::Registry) and
/// [`GroupHandle`](super::GroupHandle) operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("creation fee is {required}, only {paid} was paid")]
    InsufficientFee { required: Amount, paid: Amount },

    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),

    #[error("{0}")]
    Ledger(#[from] LedgerError),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::InvalidInput(_) => ErrorKind::InvalidInput,
            RegistryError::InsufficientFee { .. } => ErrorKind::InsufficientFee,
            RegistryError::GroupNotFound(_) => ErrorKind::NotFound,
            RegistryError::LockPoisoned(_) => ErrorKind::Internal,
            RegistryError::Ledger(e) => e.kind(),
        }
    }
}
