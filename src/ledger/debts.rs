//! Sparse directed debt matrix.
//!
//! Only non-zero edges are stored, keyed by `(debtor, creditor)` member index.
//! Between any pair of members at most one direction is non-zero.

use std::collections::{BTreeMap, BTreeSet};

use crate::amount::{Amount, Balance};

use super::state::MemberIndex;

#[derive(Debug, Default)]
pub struct DebtMatrix {
    edges: BTreeMap<(MemberIndex, MemberIndex), Amount>,
    // same edges keyed by (creditor, debtor)
    incoming: BTreeSet<(MemberIndex, MemberIndex)>,
}

/// The new values of both directions between a pair, computed but not yet written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeUpdate {
    debtor: MemberIndex,
    creditor: MemberIndex,
    forward: Amount,
    reverse: Amount,
    netted: Amount,
}

impl EdgeUpdate {
    /// Part of the charge that cancelled out debt running the other way.
    pub fn netted(&self) -> Amount {
        self.netted
    }
}

impl DebtMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// `debt[debtor][creditor]`, zero when absent.
    pub fn get(&self, debtor: MemberIndex, creditor: MemberIndex) -> Amount {
        self.edges
            .get(&(debtor, creditor))
            .copied()
            .unwrap_or_default()
    }

    /// Compute the effect of `debtor` owing `creditor` a further `amount`,
    /// netted against any debt running the other way.
    /// Returns `None` if the resulting edge would overflow.
    pub fn plan_charge(
        &self,
        debtor: MemberIndex,
        creditor: MemberIndex,
        amount: Amount,
    ) -> Option<EdgeUpdate> {
        let existing = self.get(debtor, creditor);
        let opposite = self.get(creditor, debtor);

        let (forward, reverse) = match opposite.checked_sub(amount) {
            Some(left) => (existing, left),
            None => {
                // amount > opposite: the opposite edge is cleared, the rest carries over
                let carried = amount.checked_sub(opposite)?;
                (existing.checked_add(carried)?, Amount::ZERO)
            }
        };

        Some(EdgeUpdate {
            debtor,
            creditor,
            forward,
            reverse,
            netted: amount.min(opposite),
        })
    }

    /// Write a planned update.
    pub fn apply(&mut self, update: EdgeUpdate) {
        self.set(update.debtor, update.creditor, update.forward);
        self.set(update.creditor, update.debtor, update.reverse);
    }

    /// Reduce `debt[debtor][creditor]` by `amount`. The caller checks `amount` does not exceed the edge.
    pub fn reduce(&mut self, debtor: MemberIndex, creditor: MemberIndex, amount: Amount) {
        let left = self
            .get(debtor, creditor)
            .checked_sub(amount)
            .unwrap_or_default();
        self.set(debtor, creditor, left);
    }

    /// Net balance of every member, indexed by member index.
    pub fn balances(&self, member_count: usize) -> Vec<Balance> {
        let mut balances = vec![Balance::ZERO; member_count];
        for (&(debtor, creditor), &amount) in &self.edges {
            balances[creditor] += amount;
            balances[debtor] -= amount;
        }
        balances
    }

    /// Net balance of one member, touching only that member's edges.
    pub fn balance(&self, member: MemberIndex) -> Balance {
        let mut balance = Balance::ZERO;
        for (_, &amount) in self.edges.range((member, 0)..=(member, MemberIndex::MAX)) {
            balance -= amount;
        }
        for &(_, debtor) in self.incoming.range((member, 0)..=(member, MemberIndex::MAX)) {
            balance += self.get(debtor, member);
        }
        balance
    }

    /// All non-zero edges, ordered by `(debtor, creditor)`.
    pub fn edges(&self) -> impl Iterator<Item = (MemberIndex, MemberIndex, Amount)> + '_ {
        self.edges.iter().map(|(&(d, c), &a)| (d, c, a))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    fn set(&mut self, debtor: MemberIndex, creditor: MemberIndex, amount: Amount) {
        if amount.is_zero() {
            self.edges.remove(&(debtor, creditor));
            self.incoming.remove(&(creditor, debtor));
        } else {
            self.edges.insert((debtor, creditor), amount);
            self.incoming.insert((creditor, debtor));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(units: u64) -> Amount {
        Amount::from_units(units)
    }

    fn charge(matrix: &mut DebtMatrix, debtor: MemberIndex, creditor: MemberIndex, units: u64) {
        let update = matrix.plan_charge(debtor, creditor, amt(units)).unwrap();
        matrix.apply(update);
    }

    #[test]
    fn empty_matrix_reads_zero() {
        let matrix = DebtMatrix::new();
        assert_eq!(matrix.get(0, 1), Amount::ZERO);
        assert!(matrix.is_empty());
    }

    #[test]
    fn charge_accumulates_on_same_direction() {
        let mut matrix = DebtMatrix::new();
        charge(&mut matrix, 1, 0, 40);
        charge(&mut matrix, 1, 0, 60);
        assert_eq!(matrix.get(1, 0), amt(100));
        assert_eq!(matrix.get(0, 1), Amount::ZERO);
        assert_eq!(matrix.len(), 1);
    }

    #[test]
    fn charge_nets_against_larger_opposite_edge() {
        // debt[A][B] = 50, then B owes A 80 => debt[B][A] = 30, debt[A][B] cleared
        let mut matrix = DebtMatrix::new();
        charge(&mut matrix, 0, 1, 50);
        charge(&mut matrix, 1, 0, 80);
        assert_eq!(matrix.get(0, 1), Amount::ZERO);
        assert_eq!(matrix.get(1, 0), amt(30));
        assert_eq!(matrix.len(), 1);
    }

    #[test]
    fn charge_nets_against_smaller_charge() {
        let mut matrix = DebtMatrix::new();
        charge(&mut matrix, 0, 1, 80);
        charge(&mut matrix, 1, 0, 50);
        assert_eq!(matrix.get(0, 1), amt(30));
        assert_eq!(matrix.get(1, 0), Amount::ZERO);
    }

    #[test]
    fn exactly_opposite_charges_cancel_out() {
        let mut matrix = DebtMatrix::new();
        charge(&mut matrix, 0, 1, 50);
        charge(&mut matrix, 1, 0, 50);
        assert!(matrix.is_empty());
    }

    #[test]
    fn netted_reports_cancelled_amount() {
        let mut matrix = DebtMatrix::new();
        charge(&mut matrix, 0, 1, 50);
        let update = matrix.plan_charge(1, 0, amt(80)).unwrap();
        assert_eq!(update.netted(), amt(50));
    }

    #[test]
    fn plan_charge_detects_overflow_without_writing() {
        let mut matrix = DebtMatrix::new();
        charge(&mut matrix, 1, 0, u64::MAX);
        assert!(matrix.plan_charge(1, 0, amt(1)).is_none());
        assert_eq!(matrix.get(1, 0), amt(u64::MAX));
    }

    #[test]
    fn reduce_clears_edge_at_zero() {
        let mut matrix = DebtMatrix::new();
        charge(&mut matrix, 1, 0, 100);
        matrix.reduce(1, 0, amt(40));
        assert_eq!(matrix.get(1, 0), amt(60));
        matrix.reduce(1, 0, amt(60));
        assert!(matrix.is_empty());
    }

    #[test]
    fn balances_sum_to_zero() {
        let mut matrix = DebtMatrix::new();
        charge(&mut matrix, 1, 0, 100);
        charge(&mut matrix, 2, 0, 100);
        charge(&mut matrix, 2, 1, 30);

        let balances = matrix.balances(3);
        assert_eq!(balances[0], Balance::from_units(200));
        assert_eq!(balances[1], Balance::from_units(-70));
        assert_eq!(balances[2], Balance::from_units(-130));
        assert!(balances.iter().copied().sum::<Balance>().is_zero());

        for (idx, balance) in balances.iter().enumerate() {
            assert_eq!(matrix.balance(idx), *balance);
        }
    }

    #[test]
    fn single_balance_tracks_cleared_edges() {
        let mut matrix = DebtMatrix::new();
        charge(&mut matrix, 0, 1, 50);
        charge(&mut matrix, 2, 1, 20);
        charge(&mut matrix, 1, 0, 50);
        matrix.reduce(2, 1, amt(20));

        assert!(matrix.is_empty());
        for idx in 0..3 {
            assert_eq!(matrix.balance(idx), Balance::ZERO);
        }

        charge(&mut matrix, 2, 1, 5);
        assert_eq!(matrix.balance(1), Balance::from_units(5));
        assert_eq!(matrix.balance(2), Balance::from_units(-5));
    }
}
