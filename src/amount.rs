use std::fmt;
use std::iter::Sum;

/// Non-negative quantity of money, counted in the smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_units(units: u64) -> Self {
        Amount(units)
    }

    pub const fn units(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    pub fn saturating_add(self, rhs: Self) -> Self {
        Amount(self.0.saturating_add(rhs.0))
    }

    /// Split into `parts` equal shares using integer division.
    /// Returns `(share, remainder)`; `None` when `parts` is zero.
    pub fn split(self, parts: usize) -> Option<(Amount, Amount)> {
        let parts = u64::try_from(parts).ok().filter(|p| *p > 0)?;
        Some((Amount(self.0 / parts), Amount(self.0 % parts)))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Amount(units)
    }
}

/// Signed net position of a member: positive when owed money, negative when owing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Balance(i128);

impl Balance {
    pub const ZERO: Balance = Balance(0);

    pub const fn from_units(units: i128) -> Self {
        Balance(units)
    }

    pub const fn units(self) -> i128 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::AddAssign<Amount> for Balance {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += i128::from(rhs.0);
    }
}

impl std::ops::SubAssign<Amount> for Balance {
    fn sub_assign(&mut self, rhs: Amount) {
        self.0 -= i128::from(rhs.0);
    }
}

impl std::ops::Add for Balance {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Balance(self.0 + rhs.0)
    }
}

impl Sum for Balance {
    fn sum<I: Iterator<Item = Balance>>(iter: I) -> Self {
        iter.fold(Balance::ZERO, |acc, b| acc + b)
    }
}
