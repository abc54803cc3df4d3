//! Native settlement payout rail

use lineage_core::{Address, Amount};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Releases native currency held by the registry
///
/// Implementations must not call back into the registry.
pub trait NativePayout: Send + Sync {
    /// Send `amount` to `to`; `false` if the transfer did not happen
    fn send(&self, to: &Address, amount: Amount) -> bool;
}

/// Payout rail that credits an in-process balance table
///
/// Used by the node's local mode and by tests; can be switched into a
/// failing state to exercise payout failures.
#[derive(Debug, Default)]
pub struct InMemoryPayout {
    paid: RwLock<BTreeMap<Address, Amount>>,
    failing: AtomicBool,
}

impl InMemoryPayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `send` fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Total received by `account`
    pub fn paid_to(&self, account: &Address) -> Amount {
        self.paid.read().get(account).copied().unwrap_or(0)
    }
}

impl NativePayout for InMemoryPayout {
    fn send(&self, to: &Address, amount: Amount) -> bool {
        if self.failing.load(Ordering::SeqCst) {
            tracing::debug!(%to, amount, "payout rail rejected transfer");
            return false;
        }
        let mut paid = self.paid.write();
        let entry = paid.entry(*to).or_insert(0);
        match entry.checked_add(amount) {
            Some(next) => {
                *entry = next;
                true
            }
            None => false,
        }
    }
}
