//! Versioned state schema
//!
//! One explicit type per release. Loading always yields the latest schema;
//! older snapshots are migrated one release at a time.
//!
//! | Version | Adds |
//! |---------|------|
//! | 1 | registrations, native reward ledger, fee and reward, custody |
//! | 2 | currency strategy, token reward ledger, strict lookup policy |

use crate::{Result, StorageError};
use lineage_core::{Address, Amount};
use lineage_economics::CurrencyStrategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema version written by this release
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Release 1: native currency only
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotV1 {
    pub admin: Address,
    pub registration_fee: Amount,
    pub reward_amount: Amount,
    pub max_name_length: Option<usize>,
    pub registrations: BTreeMap<String, Address>,
    pub reward_balances: BTreeMap<Address, Amount>,
    pub total_rewards: Amount,
    /// Native funds held by the registry
    pub native_custody: Amount,
}

/// Reward ledger section
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSection {
    pub balances: BTreeMap<Address, Amount>,
    pub total: Amount,
}

/// Fee section
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSection {
    pub registration_fee: Amount,
    pub reward_amount: Amount,
    pub strategy: CurrencyStrategy,
}

/// Name policy section
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySection {
    pub max_name_length: Option<usize>,
    pub strict_lookup: bool,
}

/// Release 2: adds the currency strategy and a token reward ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotV2 {
    pub admin: Address,
    pub fees: FeeSection,
    pub policy: PolicySection,
    pub registrations: BTreeMap<String, Address>,
    pub native_rewards: LedgerSection,
    pub token_rewards: LedgerSection,
    pub native_custody: Amount,
}

/// Any snapshot this release can read
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionedSnapshot {
    V1(SnapshotV1),
    V2(SnapshotV2),
}

impl VersionedSnapshot {
    /// Decode a payload written under `version`
    pub fn from_payload(version: u32, payload: &str) -> Result<Self> {
        match version {
            1 => Ok(Self::V1(serde_json::from_str(payload)?)),
            2 => Ok(Self::V2(serde_json::from_str(payload)?)),
            other => Err(StorageError::UnsupportedVersion(other)),
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            Self::V1(_) => 1,
            Self::V2(_) => 2,
        }
    }

    /// Migrate to the latest schema
    pub fn into_latest(self) -> SnapshotV2 {
        match self {
            Self::V1(v1) => migrate_v1_to_v2(v1),
            Self::V2(v2) => v2,
        }
    }
}

impl From<SnapshotV2> for VersionedSnapshot {
    fn from(snapshot: SnapshotV2) -> Self {
        Self::V2(snapshot)
    }
}

/// Release 1 → 2: native-only strategy, lenient lookups, empty token ledger
pub fn migrate_v1_to_v2(v1: SnapshotV1) -> SnapshotV2 {
    tracing::info!(
        registrations = v1.registrations.len(),
        "migrating registry state from schema 1 to 2"
    );
    SnapshotV2 {
        admin: v1.admin,
        fees: FeeSection {
            registration_fee: v1.registration_fee,
            reward_amount: v1.reward_amount,
            strategy: CurrencyStrategy::Native,
        },
        policy: PolicySection {
            max_name_length: v1.max_name_length,
            strict_lookup: false,
        },
        registrations: v1.registrations,
        native_rewards: LedgerSection {
            balances: v1.reward_balances,
            total: v1.total_rewards,
        },
        token_rewards: LedgerSection::default(),
        native_custody: v1.native_custody,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_v1() -> SnapshotV1 {
        let x = Address::from_label("x");
        let y = Address::from_label("y");
        let mut registrations = BTreeMap::new();
        registrations.insert("com".to_string(), x);
        registrations.insert("org.com".to_string(), y);
        let mut reward_balances = BTreeMap::new();
        reward_balances.insert(x, 1);
        SnapshotV1 {
            admin: Address::from_label("admin"),
            registration_fee: 15,
            reward_amount: 1,
            max_name_length: Some(32),
            registrations,
            reward_balances,
            total_rewards: 1,
            native_custody: 30,
        }
    }

    #[test]
    fn test_migration_keeps_registrations_and_balances() {
        let v1 = sample_v1();
        let v2 = migrate_v1_to_v2(v1.clone());

        assert_eq!(v2.registrations, v1.registrations);
        assert_eq!(v2.native_rewards.balances, v1.reward_balances);
        assert_eq!(v2.native_rewards.total, 1);
        assert_eq!(v2.native_custody, 30);
        assert_eq!(v2.fees.strategy, CurrencyStrategy::Native);
        assert!(v2.token_rewards.balances.is_empty());
        assert!(!v2.policy.strict_lookup);
    }

    #[test]
    fn test_payload_dispatch_by_version() {
        let json = serde_json::to_string(&sample_v1()).unwrap();

        let back = VersionedSnapshot::from_payload(1, &json).unwrap();
        assert_eq!(back.version(), 1);
        assert_eq!(back.into_latest().registrations.len(), 2);

        // a v1 payload does not parse as v2
        assert!(matches!(
            VersionedSnapshot::from_payload(2, &json),
            Err(StorageError::Serialization(_))
        ));
        assert!(matches!(
            VersionedSnapshot::from_payload(9, &json),
            Err(StorageError::UnsupportedVersion(9))
        ));
    }
}
