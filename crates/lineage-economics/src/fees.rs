//! # Fee Configuration
//!
//! Registration fee, ancestor reward and the currency strategy they are
//! denominated under. Only the administrator mutates a `FeeConfig`, and
//! every mutation must actually change the value.

use lineage_core::{Amount, Currency, RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How fees are denominated and settled
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyStrategy {
    /// Fee and reward in native units, paid in native currency
    #[default]
    Native,
    /// Fee and reward in reference (token) units; paid either in native
    /// currency at the oracle rate or directly in tokens
    Dual,
}

impl CurrencyStrategy {
    /// Whether registrations may be paid in `currency`
    pub fn accepts(&self, currency: Currency) -> bool {
        match self {
            Self::Native => currency == Currency::Native,
            Self::Dual => true,
        }
    }

    /// Whether native payments need an oracle conversion
    pub fn is_oracle_priced(&self) -> bool {
        matches!(self, Self::Dual)
    }
}

impl fmt::Display for CurrencyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Dual => f.write_str("dual"),
        }
    }
}

impl FromStr for CurrencyStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "dual" => Ok(Self::Dual),
            other => Err(format!("unknown currency strategy: {}", other)),
        }
    }
}

/// Current fee state
///
/// Persisted values are restored through [`FeeConfig::new`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeeConfig {
    registration_fee: Amount,
    reward_amount: Amount,
    strategy: CurrencyStrategy,
}

impl FeeConfig {
    /// Create a validated fee configuration
    pub fn new(registration_fee: Amount, reward_amount: Amount, strategy: CurrencyStrategy) -> Result<Self> {
        if registration_fee == 0 {
            return Err(RegistryError::InvalidFeeValue);
        }
        if reward_amount == 0 {
            return Err(RegistryError::InvalidRewardValue);
        }
        if reward_amount > registration_fee {
            return Err(RegistryError::RewardExceedsFee {
                reward: reward_amount,
                fee: registration_fee,
            });
        }
        Ok(Self {
            registration_fee,
            reward_amount,
            strategy,
        })
    }

    /// Registration fee in the strategy's unit of account
    pub fn registration_fee(&self) -> Amount {
        self.registration_fee
    }

    /// Ancestor reward in the strategy's unit of account
    pub fn reward_amount(&self) -> Amount {
        self.reward_amount
    }

    pub fn strategy(&self) -> CurrencyStrategy {
        self.strategy
    }

    /// Replace the registration fee
    pub fn set_registration_fee(&mut self, new_fee: Amount) -> Result<()> {
        if new_fee == 0 {
            return Err(RegistryError::InvalidFeeValue);
        }
        if new_fee == self.registration_fee {
            return Err(RegistryError::FeeUnchanged(new_fee));
        }
        if self.reward_amount > new_fee {
            return Err(RegistryError::RewardExceedsFee {
                reward: self.reward_amount,
                fee: new_fee,
            });
        }
        self.registration_fee = new_fee;
        Ok(())
    }

    /// Replace the ancestor reward
    pub fn set_reward_amount(&mut self, new_amount: Amount) -> Result<()> {
        if new_amount == 0 {
            return Err(RegistryError::InvalidRewardValue);
        }
        if new_amount == self.reward_amount {
            return Err(RegistryError::RewardUnchanged(new_amount));
        }
        if new_amount > self.registration_fee {
            return Err(RegistryError::RewardExceedsFee {
                reward: new_amount,
                fee: self.registration_fee,
            });
        }
        self.reward_amount = new_amount;
        Ok(())
    }

    /// Same fee and reward under another strategy
    pub fn with_strategy(mut self, strategy: CurrencyStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}
