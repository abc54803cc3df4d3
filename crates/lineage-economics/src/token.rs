//! # External Token
//!
//! The fungible-token ledger the registry pulls token payments from and
//! pushes token withdrawals through. The registry only ever sees the
//! [`ExternalToken`] trait; [`TokenLedger`] is an in-process implementation
//! used by the node's local mode and by tests.

use lineage_core::{Address, Amount, RegistryError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fungible token interface
pub trait ExternalToken: Send + Sync {
    /// Ticker symbol
    fn symbol(&self) -> &str;

    /// Fractional digits; also the precision of the reference unit
    fn decimals(&self) -> u8;

    /// Balance held by `owner`
    fn balance_of(&self, owner: &Address) -> Amount;

    /// Move `amount` from `src` to `dst`; `false` when the token refuses
    fn transfer_from(&self, src: &Address, dst: &Address, amount: Amount) -> bool;
}

/// Serializable state of a [`TokenLedger`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: Amount,
    pub balances: BTreeMap<Address, Amount>,
}

/// In-process token ledger
pub struct TokenLedger {
    symbol: String,
    decimals: u8,
    /// Account balances
    balances: RwLock<BTreeMap<Address, Amount>>,
    /// Total minted minus burned
    total_supply: RwLock<Amount>,
    /// Accounts whose outgoing transfers are refused
    frozen: RwLock<Vec<Address>>,
}

impl TokenLedger {
    /// Create an empty ledger
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
            balances: RwLock::new(BTreeMap::new()),
            total_supply: RwLock::new(0),
            frozen: RwLock::new(Vec::new()),
        }
    }

    /// Restore from a snapshot, checking the supply against the balances
    pub fn from_snapshot(snapshot: TokenSnapshot) -> Result<Self> {
        let sum = snapshot
            .balances
            .values()
            .try_fold(0u128, |acc, v| acc.checked_add(*v))
            .ok_or(RegistryError::ArithmeticOverflow)?;
        if sum != snapshot.total_supply {
            return Err(RegistryError::CorruptState(format!(
                "token supply {} does not match balances {}",
                snapshot.total_supply, sum
            )));
        }
        Ok(Self {
            symbol: snapshot.symbol,
            decimals: snapshot.decimals,
            balances: RwLock::new(snapshot.balances),
            total_supply: RwLock::new(snapshot.total_supply),
            frozen: RwLock::new(Vec::new()),
        })
    }

    pub fn snapshot(&self) -> TokenSnapshot {
        TokenSnapshot {
            symbol: self.symbol.clone(),
            decimals: self.decimals,
            total_supply: *self.total_supply.read(),
            balances: self.balances.read().clone(),
        }
    }

    /// Create `amount` new tokens in `to`
    pub fn mint(&self, to: &Address, amount: Amount) -> Result<Amount> {
        let mut supply = self.total_supply.write();
        let new_supply = supply
            .checked_add(amount)
            .ok_or(RegistryError::ArithmeticOverflow)?;

        let mut balances = self.balances.write();
        let balance = balances.entry(*to).or_insert(0);
        let new_balance = balance
            .checked_add(amount)
            .ok_or(RegistryError::ArithmeticOverflow)?;

        *balance = new_balance;
        *supply = new_supply;
        tracing::debug!(symbol = %self.symbol, to = %to, amount, "minted");
        Ok(new_balance)
    }

    /// Refuse outgoing transfers from `account` until thawed
    pub fn freeze(&self, account: &Address) {
        let mut frozen = self.frozen.write();
        if !frozen.contains(account) {
            frozen.push(*account);
        }
    }

    pub fn thaw(&self, account: &Address) {
        self.frozen.write().retain(|a| a != account);
    }

    pub fn total_supply(&self) -> Amount {
        *self.total_supply.read()
    }
}

impl ExternalToken for TokenLedger {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.read().get(owner).copied().unwrap_or(0)
    }

    fn transfer_from(&self, src: &Address, dst: &Address, amount: Amount) -> bool {
        if self.frozen.read().contains(src) {
            tracing::debug!(src = %src, "transfer refused: account frozen");
            return false;
        }

        let mut balances = self.balances.write();
        let available = balances.get(src).copied().unwrap_or(0);
        if available < amount {
            return false;
        }
        if src == dst {
            return true;
        }
        let received = balances.get(dst).copied().unwrap_or(0);
        let Some(new_received) = received.checked_add(amount) else {
            return false;
        };

        balances.insert(*src, available - amount);
        balances.insert(*dst, new_received);
        true
    }
}

impl std::fmt::Debug for TokenLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenLedger")
            .field("symbol", &self.symbol)
            .field("decimals", &self.decimals)
            .field("total_supply", &self.total_supply())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> TokenLedger {
        TokenLedger::new("USDX", 6)
    }

    #[test]
    fn test_mint_and_balance() {
        let token = ledger();
        let alice = Address::from_label("alice");

        token.mint(&alice, 1_000).unwrap();
        assert_eq!(token.balance_of(&alice), 1_000);
        assert_eq!(token.total_supply(), 1_000);
        assert_eq!(token.symbol(), "USDX");
        assert_eq!(token.decimals(), 6);
    }

    #[test]
    fn test_transfer_from() {
        let token = ledger();
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        token.mint(&alice, 1_000).unwrap();

        assert!(token.transfer_from(&alice, &bob, 300));
        assert_eq!(token.balance_of(&alice), 700);
        assert_eq!(token.balance_of(&bob), 300);

        // more than available is refused without side effects
        assert!(!token.transfer_from(&alice, &bob, 701));
        assert_eq!(token.balance_of(&alice), 700);
    }

    #[test]
    fn test_frozen_account_cannot_send() {
        let token = ledger();
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        token.mint(&alice, 10).unwrap();

        token.freeze(&alice);
        assert!(!token.transfer_from(&alice, &bob, 5));

        token.thaw(&alice);
        assert!(token.transfer_from(&alice, &bob, 5));
    }

    #[test]
    fn test_snapshot_roundtrip_checks_supply() {
        let token = ledger();
        let alice = Address::from_label("alice");
        token.mint(&alice, 42).unwrap();

        let snapshot = token.snapshot();
        let restored = TokenLedger::from_snapshot(snapshot.clone()).unwrap();
        assert_eq!(restored.balance_of(&alice), 42);

        let mut broken = snapshot;
        broken.total_supply = 41;
        assert!(matches!(
            TokenLedger::from_snapshot(broken),
            Err(RegistryError::CorruptState(_))
        ));
    }
}
