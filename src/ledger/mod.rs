//! Per-group expense ledger.
//!
//! A ledger owns one group's members, its append-only expense and settlement
//! logs, and the sparse pairwise debt matrix derived from them. Every write
//! either commits completely and returns the [`Event`] describing it, or fails
//! without touching any state.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::amount::{Amount, Balance};
use crate::model::{
    Address, Event, ExpenseId, GroupId, GroupInfo, Page, ReceiptHash, Timestamp, unix_now,
};

mod debts;
use debts::DebtMatrix;

mod state;
pub use state::{DebtEdge, Expense, Member, MemberIndex, Settlement};

mod error;
pub use error::{ErrorKind, LedgerError};

/// One group's complete state.
#[derive(Debug)]
pub struct Ledger {
    id: GroupId,
    name: String,
    owner: Address,
    active: bool,
    created_at: Timestamp,
    members: Vec<Member>,
    /// Address -> position in `members`
    member_index: HashMap<Address, MemberIndex>,
    expenses: Vec<Expense>,
    settlements: Vec<Settlement>,
    debts: DebtMatrix,
}

/// Write API
impl Ledger {
    /// Create a ledger whose owner is also its first member.
    pub(crate) fn new(
        id: GroupId,
        name: impl Into<String>,
        owner: Address,
        owner_nickname: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        let name = name.into();
        let owner_nickname = owner_nickname.into();
        if owner.is_empty() {
            return Err(LedgerError::invalid("owner address is empty"));
        }
        if name.trim().is_empty() {
            return Err(LedgerError::invalid("group name is blank"));
        }
        if owner_nickname.trim().is_empty() {
            return Err(LedgerError::invalid("nickname is blank"));
        }

        let created_at = unix_now();
        let mut ledger = Self {
            id,
            name,
            owner: owner.clone(),
            active: true,
            created_at,
            members: Vec::new(),
            member_index: HashMap::new(),
            expenses: Vec::new(),
            settlements: Vec::new(),
            debts: DebtMatrix::new(),
        };
        ledger.push_member(owner, owner_nickname, created_at);
        Ok(ledger)
    }

    /// Owner-only: admit `member` under `nickname`.
    pub fn add_member(
        &mut self,
        caller: &Address,
        member: Address,
        nickname: impl Into<String>,
    ) -> Result<Event, LedgerError> {
        self.ensure_active()?;
        self.ensure_owner(caller, "add members")?;

        if member.is_empty() {
            return Err(LedgerError::invalid("member address is empty"));
        }
        let nickname = nickname.into();
        if nickname.trim().is_empty() {
            return Err(LedgerError::invalid("nickname is blank"));
        }
        if self.member_index.contains_key(&member) {
            return Err(LedgerError::AlreadyMember(member));
        }

        self.push_member(member.clone(), nickname.clone(), unix_now());

        Ok(Event::MemberAdded {
            group: self.id,
            member,
            nickname,
        })
    }

    /// Record an expense fronted by `caller` and split equally among `participants`.
    ///
    /// Each participant owes `total / n`. The remainder `total % n` is carried by
    /// the payer when the payer participates, and otherwise by the first listed
    /// participant. Every non-payer share is netted against debt the payer
    /// already owes that participant.
    pub fn add_expense(
        &mut self,
        caller: &Address,
        description: impl Into<String>,
        total_amount: Amount,
        participants: &[Address],
        receipt: ReceiptHash,
    ) -> Result<Event, LedgerError> {
        self.ensure_active()?;
        let payer = self.active_caller(caller, "add expenses")?;

        if total_amount.is_zero() {
            return Err(LedgerError::invalid("expense amount must be positive"));
        }
        let (share, remainder) = total_amount
            .split(participants.len())
            .ok_or_else(|| LedgerError::invalid("expense has no participants"))?;

        let mut seen = HashSet::with_capacity(participants.len());
        let mut indices = Vec::with_capacity(participants.len());
        for participant in participants {
            let idx = self.active_member(participant)?;
            if !seen.insert(idx) {
                return Err(LedgerError::invalid(format!(
                    "{participant} is listed twice as participant"
                )));
            }
            indices.push(idx);
        }

        let remainder_holder = if seen.contains(&payer) {
            payer
        } else {
            indices[0]
        };

        // Plan every edge first so an overflow leaves the matrix untouched
        let mut updates = Vec::with_capacity(indices.len());
        for &idx in indices.iter().filter(|&&idx| idx != payer) {
            let owed = if idx == remainder_holder {
                share
                    .checked_add(remainder)
                    .ok_or_else(|| LedgerError::invalid("share overflow"))?
            } else {
                share
            };
            if owed.is_zero() {
                continue;
            }
            let update = self.debts.plan_charge(idx, payer, owed).ok_or_else(|| {
                LedgerError::invalid(format!(
                    "debt of {participant} would overflow",
                    participant = self.members[idx].address
                ))
            })?;
            updates.push((idx, update));
        }

        for (idx, update) in updates {
            if !update.netted().is_zero() {
                debug!(
                    group = self.id,
                    debtor = %self.members[idx].address,
                    creditor = %caller,
                    netted = %update.netted(),
                    "netted against opposite debt"
                );
            }
            self.debts.apply(update);
        }

        let id = self.expenses.len() as ExpenseId;
        self.expenses.push(Expense {
            id,
            description: description.into(),
            total_amount,
            paid_by: caller.clone(),
            participants: participants.to_vec(),
            receipt,
            timestamp: unix_now(),
        });
        self.debug_check_conservation();

        Ok(Event::ExpenseAdded {
            group: self.id,
            id,
            paid_by: caller.clone(),
            total_amount,
        })
    }

    /// Pay `amount` of the caller's debt to `creditor`.
    ///
    /// Partial settlement is allowed; paying more than is owed is rejected.
    pub fn settle_debt(
        &mut self,
        caller: &Address,
        creditor: &Address,
        amount: Amount,
    ) -> Result<Event, LedgerError> {
        self.ensure_active()?;
        let debtor_idx = self.active_caller(caller, "settle debts")?;
        if creditor.is_empty() {
            return Err(LedgerError::invalid("creditor address is empty"));
        }
        let creditor_idx = self.active_member(creditor)?;

        if debtor_idx == creditor_idx {
            return Err(LedgerError::invalid("cannot settle a debt with oneself"));
        }
        if amount.is_zero() {
            return Err(LedgerError::invalid("settlement amount must be positive"));
        }

        let owed = self.debts.get(debtor_idx, creditor_idx);
        if owed.is_zero() {
            return Err(LedgerError::NoDebt {
                debtor: caller.clone(),
                creditor: creditor.clone(),
            });
        }
        if amount > owed {
            return Err(LedgerError::OverPayment {
                debtor: caller.clone(),
                creditor: creditor.clone(),
                owed,
                offered: amount,
            });
        }

        self.debts.reduce(debtor_idx, creditor_idx, amount);
        self.settlements.push(Settlement {
            id: self.settlements.len() as u64,
            debtor: caller.clone(),
            creditor: creditor.clone(),
            amount,
            timestamp: unix_now(),
        });
        self.debug_check_conservation();

        Ok(Event::DebtSettled {
            group: self.id,
            debtor: caller.clone(),
            creditor: creditor.clone(),
            amount,
        })
    }

    /// Owner-only: make the ledger permanently read-only.
    pub fn deactivate(&mut self, caller: &Address) -> Result<Event, LedgerError> {
        self.ensure_owner(caller, "deactivate the group")?;
        if !self.active {
            return Err(LedgerError::AlreadyInactive);
        }
        self.active = false;
        Ok(Event::GroupDeactivated { group: self.id })
    }
}

/// Read API
impl Ledger {
    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn info(&self) -> GroupInfo {
        GroupInfo {
            id: self.id,
            name: self.name.clone(),
            owner: self.owner.clone(),
            created_at: self.created_at,
            active: self.active,
            member_count: self.members.len(),
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_member(&self, address: &Address) -> bool {
        self.member_index.contains_key(address)
    }

    pub fn member_info(&self, address: &Address) -> Result<&Member, LedgerError> {
        self.index_of(address).map(|idx| &self.members[idx])
    }

    /// Members in join order.
    pub fn members(&self) -> impl Iterator<Item = &Member> + '_ {
        self.members.iter()
    }

    pub fn members_paginated(&self, offset: usize, limit: usize) -> Page<Address> {
        let items = self
            .members
            .iter()
            .skip(offset)
            .take(limit)
            .map(|m| m.address.clone())
            .collect();
        Page {
            items,
            total: self.members.len(),
        }
    }

    pub fn expense_count(&self) -> usize {
        self.expenses.len()
    }

    pub fn expense(&self, id: ExpenseId) -> Option<&Expense> {
        usize::try_from(id).ok().and_then(|idx| self.expenses.get(idx))
    }

    /// The full expense log in insertion order.
    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn expenses_paginated(&self, offset: usize, limit: usize) -> Page<Expense> {
        Page::slice(&self.expenses, offset, limit)
    }

    pub fn settlements_paginated(&self, offset: usize, limit: usize) -> Page<Settlement> {
        Page::slice(&self.settlements, offset, limit)
    }

    /// Amounts owed to `address` minus amounts `address` owes.
    pub fn balance(&self, address: &Address) -> Result<Balance, LedgerError> {
        let idx = self.index_of(address)?;
        Ok(self.debts.balance(idx))
    }

    /// Exactly how much `debtor` owes `creditor`. Zero for unknown addresses.
    pub fn debt_to(&self, debtor: &Address, creditor: &Address) -> Amount {
        match (
            self.member_index.get(debtor),
            self.member_index.get(creditor),
        ) {
            (Some(&d), Some(&c)) => self.debts.get(d, c),
            _ => Amount::ZERO,
        }
    }

    /// Every non-zero debt edge.
    pub fn debts(&self) -> Vec<DebtEdge> {
        self.debts
            .edges()
            .map(|(debtor, creditor, amount)| DebtEdge {
                debtor: self.members[debtor].address.clone(),
                creditor: self.members[creditor].address.clone(),
                amount,
            })
            .collect()
    }

    /// Net balance of every member, in join order.
    pub fn balances(&self) -> Vec<(&Member, Balance)> {
        self.members
            .iter()
            .zip(self.debts.balances(self.members.len()))
            .collect()
    }

    /// Sum of all members' balances. Always zero.
    pub fn total_balance(&self) -> Balance {
        self.debts.balances(self.members.len()).into_iter().sum()
    }
}

/// Private API
impl Ledger {
    fn push_member(&mut self, address: Address, nickname: String, joined_at: Timestamp) {
        let idx = self.members.len();
        self.member_index.insert(address.clone(), idx);
        self.members
            .push(Member::new(address, nickname, idx, joined_at));
    }

    fn index_of(&self, address: &Address) -> Result<MemberIndex, LedgerError> {
        self.member_index
            .get(address)
            .copied()
            .ok_or_else(|| LedgerError::NotFound(address.clone()))
    }

    /// Resolve a referenced address to an active member.
    fn active_member(&self, address: &Address) -> Result<MemberIndex, LedgerError> {
        let idx = self.index_of(address)?;
        if !self.members[idx].active {
            return Err(LedgerError::NotFound(address.clone()));
        }
        Ok(idx)
    }

    /// Resolve the caller to an active member, or reject the call.
    fn active_caller(
        &self,
        caller: &Address,
        action: &'static str,
    ) -> Result<MemberIndex, LedgerError> {
        self.active_member(caller)
            .map_err(|_| LedgerError::Unauthorized {
                caller: caller.clone(),
                action,
            })
    }

    fn ensure_active(&self) -> Result<(), LedgerError> {
        if self.active {
            Ok(())
        } else {
            Err(LedgerError::GroupInactive)
        }
    }

    fn ensure_owner(&self, caller: &Address, action: &'static str) -> Result<(), LedgerError> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                caller: caller.clone(),
                action,
            })
        }
    }

    fn debug_check_conservation(&self) {
        debug_assert!(
            self.total_balance().is_zero(),
            "group {} balances do not sum to zero",
            self.id
        );
    }
}
