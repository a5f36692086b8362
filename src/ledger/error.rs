//! Error types for ledger operations.

use thiserror::Error;

use crate::Amount;
use crate::model::Address;

/// Coarse classification of every failure the crate reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Unauthorized,
    NotFound,
    AlreadyMember,
    AlreadyInactive,
    GroupInactive,
    NoDebt,
    OverPayment,
    InsufficientFee,
    /// A lock was poisoned by a panic in another thread.
    Internal,
}

/// Error returned by the write and read operations of a [`Ledger`](super::Ledger).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{caller} is not allowed to {action}")]
    Unauthorized {
        caller: Address,
        action: &'static str,
    },

    #[error("{0} is not a member of this group")]
    NotFound(Address),

    #[error("{0} is already a member of this group")]
    AlreadyMember(Address),

    #[error("group is already inactive")]
    AlreadyInactive,

    #[error("group is inactive")]
    GroupInactive,

    #[error("{debtor} owes nothing to {creditor}")]
    NoDebt { debtor: Address, creditor: Address },

    #[error("{debtor} owes {creditor} {owed}, cannot settle {offered}")]
    OverPayment {
        debtor: Address,
        creditor: Address,
        owed: Amount,
        offered: Amount,
    },
}

impl LedgerError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        LedgerError::InvalidInput(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidInput(_) => ErrorKind::InvalidInput,
            LedgerError::Unauthorized { .. } => ErrorKind::Unauthorized,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::AlreadyMember(_) => ErrorKind::AlreadyMember,
            LedgerError::AlreadyInactive => ErrorKind::AlreadyInactive,
            LedgerError::GroupInactive => ErrorKind::GroupInactive,
            LedgerError::NoDebt { .. } => ErrorKind::NoDebt,
            LedgerError::OverPayment { .. } => ErrorKind::OverPayment,
        }
    }
}
