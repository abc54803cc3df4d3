//! Registry events for audit and indexing consumers

use crate::types::{Address, Amount, Currency};
use serde::{Deserialize, Serialize};

/// Observable effect of a committed registry operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A name was claimed
    NameRegistered { name: String, holder: Address },

    /// Registration fee changed
    FeeChanged { new_fee: Amount },

    /// Reward amount changed
    RewardAmountChanged { new_amount: Amount },

    /// Nearest registered ancestor was credited
    RewardAccrued {
        ancestor_name: String,
        holder: Address,
        amount: Amount,
        new_balance: Amount,
        currency: Currency,
    },

    /// Accrued rewards were zeroed for payout
    RewardWithdrawn {
        holder: Address,
        amount: Amount,
        currency: Currency,
    },

    /// Collected fees were released to the administrator
    FeesWithdrawn {
        to: Address,
        amount: Amount,
        currency: Currency,
    },

    /// Administrator identity replaced
    AdminTransferred { previous: Address, new: Address },
}

impl RegistryEvent {
    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::NameRegistered { .. } => "NameRegistered",
            Self::FeeChanged { .. } => "FeeChanged",
            Self::RewardAmountChanged { .. } => "RewardAmountChanged",
            Self::RewardAccrued { .. } => "RewardAccrued",
            Self::RewardWithdrawn { .. } => "RewardWithdrawn",
            Self::FeesWithdrawn { .. } => "FeesWithdrawn",
            Self::AdminTransferred { .. } => "AdminTransferred",
        }
    }
}

/// Event with its position in the registry history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number
    pub sequence: u64,

    /// Unix timestamp (seconds)
    pub timestamp: i64,

    /// The event
    pub event: RegistryEvent,
}

impl EventRecord {
    pub fn new(sequence: u64, event: RegistryEvent) -> Self {
        Self {
            sequence,
            timestamp: chrono::Utc::now().timestamp(),
            event,
        }
    }
}
