//! # Reward Ledger
//!
//! Per-holder ancestor reward balances with a cached running total.
//!
//! The ledger maintains one invariant at all times:
//!
//! ```text
//! total == Σ balance_of(holder)
//! ```
//!
//! Every mutation computes its new values with checked arithmetic before
//! writing anything, so a failed call leaves the ledger untouched.

use crate::error::{RegistryError, Result};
use crate::types::{Address, Amount};
use std::collections::BTreeMap;

/// Accrued ancestor rewards for one settlement currency
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewardLedger {
    balances: BTreeMap<Address, Amount>,
    total: Amount,
}

impl RewardLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted parts, verifying the cached total
    pub fn from_parts(balances: BTreeMap<Address, Amount>, total: Amount) -> Result<Self> {
        let sum = balances
            .values()
            .try_fold(0u128, |acc, v| acc.checked_add(*v))
            .ok_or(RegistryError::ArithmeticOverflow)?;
        if sum != total {
            return Err(RegistryError::CorruptState(format!(
                "reward total {} does not match sum of balances {}",
                total, sum
            )));
        }
        let balances = balances.into_iter().filter(|(_, v)| *v > 0).collect();
        Ok(Self { balances, total })
    }

    /// Check that crediting `amount` to `holder` would not overflow
    pub fn ensure_credit(&self, holder: &Address, amount: Amount) -> Result<()> {
        self.checked_credit(holder, amount).map(|_| ())
    }

    fn checked_credit(&self, holder: &Address, amount: Amount) -> Result<(Amount, Amount)> {
        let balance = self
            .balance_of(holder)
            .checked_add(amount)
            .ok_or(RegistryError::ArithmeticOverflow)?;
        let total = self
            .total
            .checked_add(amount)
            .ok_or(RegistryError::ArithmeticOverflow)?;
        Ok((balance, total))
    }

    /// Credit `amount` to `holder`, returning the new balance
    pub fn credit(&mut self, holder: &Address, amount: Amount) -> Result<Amount> {
        let (balance, total) = self.checked_credit(holder, amount)?;
        if balance > 0 {
            self.balances.insert(*holder, balance);
        }
        self.total = total;
        Ok(balance)
    }

    /// Balance accrued by `holder`
    pub fn balance_of(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Sum of all outstanding balances
    pub fn total(&self) -> Amount {
        self.total
    }

    /// Zero the holder's balance and return it for payout
    ///
    /// The balance is gone once this returns; callers release funds
    /// afterwards and do not re-credit if that release fails.
    pub fn withdraw(&mut self, holder: &Address) -> Result<Amount> {
        let amount = self.balance_of(holder);
        if amount == 0 {
            return Err(RegistryError::NothingToWithdraw);
        }
        let total = self.total.checked_sub(amount).ok_or_else(|| {
            RegistryError::CorruptState(format!(
                "reward total {} below balance {}",
                self.total, amount
            ))
        })?;
        self.balances.remove(holder);
        self.total = total;
        Ok(amount)
    }

    /// Non-zero balances in address order
    pub fn entries(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    /// Clone of the balance table
    pub fn balances(&self) -> BTreeMap<Address, Amount> {
        self.balances.clone()
    }

    /// Number of holders with a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }
}
