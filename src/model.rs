//! Core domain types shared by the registry and the ledgers it creates.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::Amount;

/// Registry-assigned group identifier.
pub type GroupId = u64;

/// Per-ledger expense sequence number.
pub type ExpenseId = u64;

/// Per-ledger settlement sequence number.
pub type SettlementId = u64;

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

pub(crate) fn unix_now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Opaque identity of a participant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Address(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Address(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Address(value)
    }
}

/// Opaque 32-byte reference to an off-ledger receipt. All zeroes means absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReceiptHash([u8; 32]);

impl ReceiptHash {
    pub const ABSENT: ReceiptHash = ReceiptHash([0; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        ReceiptHash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_absent(&self) -> bool {
        self.0 == [0; 32]
    }
}

impl fmt::Display for ReceiptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for ReceiptHash {
    type Err = hex::FromHexError;

    /// Parse 64 hex digits, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)?;
        Ok(ReceiptHash(bytes))
    }
}

/// Signal published once a write operation has committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    GroupCreated {
        group: GroupId,
        owner: Address,
    },
    MemberAdded {
        group: GroupId,
        member: Address,
        nickname: String,
    },
    ExpenseAdded {
        group: GroupId,
        id: ExpenseId,
        paid_by: Address,
        total_amount: Amount,
    },
    DebtSettled {
        group: GroupId,
        debtor: Address,
        creditor: Address,
        amount: Amount,
    },
    GroupDeactivated {
        group: GroupId,
    },
}

impl Event {
    /// The group the event belongs to.
    pub fn group(&self) -> GroupId {
        match self {
            Event::GroupCreated { group, .. }
            | Event::MemberAdded { group, .. }
            | Event::ExpenseAdded { group, .. }
            | Event::DebtSettled { group, .. }
            | Event::GroupDeactivated { group } => *group,
        }
    }
}

/// A write request, as submitted by `caller`.
#[derive(Debug, Clone)]
pub enum Command {
    /// Create a ledger owned by the caller, paying `payment` towards the creation fee.
    CreateGroup {
        caller: Address,
        name: String,
        nickname: String,
        payment: Amount,
    },
    /// Owner-only: admit a new member.
    AddMember {
        caller: Address,
        group: GroupId,
        member: Address,
        nickname: String,
    },
    /// Record an expense fronted by the caller and split among `participants`.
    AddExpense {
        caller: Address,
        group: GroupId,
        description: String,
        amount: Amount,
        participants: Vec<Address>,
        receipt: ReceiptHash,
    },
    /// Pay down the caller's debt to `creditor`.
    SettleDebt {
        caller: Address,
        group: GroupId,
        creditor: Address,
        amount: Amount,
    },
    /// Owner-only: freeze the ledger for good.
    DeactivateGroup { caller: Address, group: GroupId },
}

/// One slice of an ordered collection, plus the collection's full length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T: Clone> Page<T> {
    /// Take at most `limit` items starting at `offset`. An offset past the end yields an empty page.
    pub fn slice(all: &[T], offset: usize, limit: usize) -> Self {
        let items = all.iter().skip(offset).take(limit).cloned().collect();
        Page {
            items,
            total: all.len(),
        }
    }
}

/// Summary of a ledger, as shown in group listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub id: GroupId,
    pub name: String,
    pub owner: Address,
    pub created_at: Timestamp,
    pub active: bool,
    pub member_count: usize,
}
