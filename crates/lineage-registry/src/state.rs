//! Registry state held behind the registry lock

use crate::access::AccessControl;
use lineage_core::{Address, Amount, EventRecord, RegistryError, RegistryEvent, Result, RewardLedger};
use lineage_economics::{CurrencyStrategy, FeeConfig, DEFAULT_MAX_NAME_LENGTH};
use lineage_storage::{FeeSection, LedgerSection, PolicySection, SnapshotV2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name acceptance and lookup policy
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePolicy {
    /// Maximum name length in bytes; `None` disables the check
    pub max_name_length: Option<usize>,
    /// `holder_of` fails for unknown names instead of returning `None`
    pub strict_lookup: bool,
}

impl Default for NamePolicy {
    fn default() -> Self {
        Self {
            max_name_length: Some(DEFAULT_MAX_NAME_LENGTH),
            strict_lookup: false,
        }
    }
}

impl NamePolicy {
    pub fn check_length(&self, name: &str) -> Result<()> {
        match self.max_name_length {
            Some(max) if name.len() > max => Err(RegistryError::NameTooLong {
                length: name.len(),
                max,
            }),
            _ => Ok(()),
        }
    }
}

/// Everything the registry owns
#[derive(Clone, Debug)]
pub struct RegistryState {
    pub(crate) access: AccessControl,
    pub(crate) fees: FeeConfig,
    pub(crate) policy: NamePolicy,
    pub(crate) registrations: BTreeMap<String, Address>,
    pub(crate) native_rewards: RewardLedger,
    pub(crate) token_rewards: RewardLedger,
    /// Native funds received from registrations and not yet paid out
    pub(crate) native_custody: Amount,
    events: Vec<EventRecord>,
    next_sequence: u64,
}

impl RegistryState {
    /// Fresh state with no registrations
    pub fn new(admin: Address, fees: FeeConfig, policy: NamePolicy) -> Self {
        Self {
            access: AccessControl::new(admin),
            fees,
            policy,
            registrations: BTreeMap::new(),
            native_rewards: RewardLedger::new(),
            token_rewards: RewardLedger::new(),
            native_custody: 0,
            events: Vec::new(),
            next_sequence: 0,
        }
    }

    /// Restore from a persisted snapshot, re-validating fees and ledgers
    pub fn from_snapshot(snapshot: SnapshotV2) -> Result<Self> {
        let fees = FeeConfig::new(
            snapshot.fees.registration_fee,
            snapshot.fees.reward_amount,
            snapshot.fees.strategy,
        )?;
        let native_rewards =
            RewardLedger::from_parts(snapshot.native_rewards.balances, snapshot.native_rewards.total)?;
        let token_rewards =
            RewardLedger::from_parts(snapshot.token_rewards.balances, snapshot.token_rewards.total)?;

        if snapshot.native_custody < native_rewards.total() {
            return Err(RegistryError::CorruptState(format!(
                "native custody {} below outstanding rewards {}",
                snapshot.native_custody,
                native_rewards.total()
            )));
        }
        if fees.strategy() == CurrencyStrategy::Native && token_rewards.total() > 0 {
            return Err(RegistryError::CorruptState(
                "token rewards outstanding under the native strategy".to_string(),
            ));
        }

        Ok(Self {
            access: AccessControl::new(snapshot.admin),
            fees,
            policy: NamePolicy {
                max_name_length: snapshot.policy.max_name_length,
                strict_lookup: snapshot.policy.strict_lookup,
            },
            registrations: snapshot.registrations,
            native_rewards,
            token_rewards,
            native_custody: snapshot.native_custody,
            events: Vec::new(),
            next_sequence: 0,
        })
    }

    pub fn to_snapshot(&self) -> SnapshotV2 {
        SnapshotV2 {
            admin: self.access.admin(),
            fees: FeeSection {
                registration_fee: self.fees.registration_fee(),
                reward_amount: self.fees.reward_amount(),
                strategy: self.fees.strategy(),
            },
            policy: PolicySection {
                max_name_length: self.policy.max_name_length,
                strict_lookup: self.policy.strict_lookup,
            },
            registrations: self.registrations.clone(),
            native_rewards: LedgerSection {
                balances: self.native_rewards.balances(),
                total: self.native_rewards.total(),
            },
            token_rewards: LedgerSection {
                balances: self.token_rewards.balances(),
                total: self.token_rewards.total(),
            },
            native_custody: self.native_custody,
        }
    }

    pub fn strategy(&self) -> CurrencyStrategy {
        self.fees.strategy()
    }

    pub fn admin(&self) -> Address {
        self.access.admin()
    }

    pub(crate) fn emit(&mut self, event: RegistryEvent) {
        tracing::debug!(sequence = self.next_sequence, event = event.name(), "registry event");
        self.events.push(EventRecord::new(self.next_sequence, event));
        self.next_sequence += 1;
    }

    pub(crate) fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub(crate) fn drain_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> RegistryState {
        let fees = FeeConfig::new(15, 1, CurrencyStrategy::Native).unwrap();
        RegistryState::new(Address::from_label("admin"), fees, NamePolicy::default())
    }

    #[test]
    fn test_length_policy_counts_bytes() {
        let policy = NamePolicy {
            max_name_length: Some(4),
            strict_lookup: false,
        };
        assert!(policy.check_length("abcd").is_ok());
        // two bytes per character
        assert_eq!(
            policy.check_length("ééé"),
            Err(RegistryError::NameTooLong { length: 6, max: 4 })
        );

        let unbounded = NamePolicy {
            max_name_length: None,
            strict_lookup: false,
        };
        assert!(unbounded.check_length(&"a".repeat(1000)).is_ok());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut state = state();
        let holder = Address::from_label("holder");
        state.registrations.insert("com".to_string(), holder);
        state.native_rewards.credit(&holder, 1).unwrap();
        state.native_custody = 15;

        let restored = RegistryState::from_snapshot(state.to_snapshot()).unwrap();
        assert_eq!(restored.to_snapshot(), state.to_snapshot());
    }

    #[test]
    fn test_restore_rejects_bad_totals() {
        let mut snapshot = state().to_snapshot();
        snapshot.native_rewards.balances.insert(Address::from_label("x"), 3);
        snapshot.native_rewards.total = 2;
        snapshot.native_custody = 10;

        assert!(matches!(
            RegistryState::from_snapshot(snapshot),
            Err(RegistryError::CorruptState(_))
        ));
    }

    #[test]
    fn test_restore_rejects_custody_shortfall() {
        let mut snapshot = state().to_snapshot();
        snapshot.native_rewards.balances.insert(Address::from_label("x"), 3);
        snapshot.native_rewards.total = 3;
        snapshot.native_custody = 2;

        assert!(matches!(
            RegistryState::from_snapshot(snapshot),
            Err(RegistryError::CorruptState(_))
        ));
    }

    #[test]
    fn test_restore_revalidates_fees() {
        let mut snapshot = state().to_snapshot();
        snapshot.fees.registration_fee = 0;
        assert_eq!(
            RegistryState::from_snapshot(snapshot).map(|_| ()),
            Err(RegistryError::InvalidFeeValue)
        );
    }

    #[test]
    fn test_events_are_sequenced() {
        let mut state = state();
        state.emit(RegistryEvent::FeeChanged { new_fee: 20 });
        state.emit(RegistryEvent::FeeChanged { new_fee: 25 });

        let sequences: Vec<u64> = state.events().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1]);
        assert_eq!(state.drain_events().len(), 2);
        assert!(state.events().is_empty());

        state.emit(RegistryEvent::FeeChanged { new_fee: 30 });
        assert_eq!(state.events()[0].sequence, 2);
    }
}
