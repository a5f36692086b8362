use crate::Amount;
use crate::model::{Address, ExpenseId, ReceiptHash, SettlementId, Timestamp};

/// Position of a member in join order. Doubles as its key in the debt matrix.
pub type MemberIndex = usize;

/// A participant of a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub address: Address,
    /// Set once when the member is added; there is no rename.
    pub nickname: String,
    pub active: bool,
    pub join_index: MemberIndex,
    pub joined_at: Timestamp,
}

impl Member {
    pub(crate) fn new(
        address: Address,
        nickname: String,
        join_index: MemberIndex,
        joined_at: Timestamp,
    ) -> Self {
        Self {
            address,
            nickname,
            active: true,
            join_index,
            joined_at,
        }
    }
}

/// An immutable entry of the expense log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,
    pub total_amount: Amount,
    /// The member who fronted the full amount.
    pub paid_by: Address,
    pub participants: Vec<Address>,
    pub receipt: ReceiptHash,
    pub timestamp: Timestamp,
}

/// An immutable entry of the settlement log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub id: SettlementId,
    pub debtor: Address,
    pub creditor: Address,
    pub amount: Amount,
    pub timestamp: Timestamp,
}

/// A non-zero directed debt between two members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtEdge {
    pub debtor: Address,
    pub creditor: Address,
    pub amount: Amount,
}
