//! # Name Registry
//!
//! Owns the name table and both reward ledgers. Every operation runs to
//! completion under one lock; collaborators (payout rail, token, oracle)
//! are called while it is held.
//!
//! ## Registration
//!
//! ```text
//! validate (duplicate, length, payment)
//!   └─► find nearest registered ancestor
//!         └─► check the credit fits
//!               └─► [token only] pull payment
//!                     └─► commit: name, custody, reward, events
//! ```
//!
//! Nothing is written before the last fallible step, so a failed
//! registration leaves no trace.
//!
//! ## Withdrawal
//!
//! Reward withdrawals zero the ledger entry first and release funds
//! second. A failed release is reported once and the entry stays zeroed.

use crate::payout::NativePayout;
use crate::state::{NamePolicy, RegistryState};
use lineage_core::hierarchy::nearest_registered_ancestor;
use lineage_core::{
    Address, Amount, Currency, EventRecord, RegistryError, RegistryEvent, Result, RewardLedger,
};
use lineage_economics::{
    CurrencyConverter, CurrencyStrategy, ExternalToken, FeeConfig, PriceOracle,
};
use lineage_storage::SnapshotV2;
use parking_lot::Mutex;
use std::sync::Arc;

/// Token and oracle collaborators required by the dual-currency strategy
#[derive(Clone)]
pub struct TokenSettlement {
    token: Arc<dyn ExternalToken>,
    converter: CurrencyConverter,
    /// Account the registry holds tokens under
    account: Address,
}

impl TokenSettlement {
    pub fn new(token: Arc<dyn ExternalToken>, oracle: Arc<dyn PriceOracle>, account: Address) -> Self {
        let converter = CurrencyConverter::new(oracle, token.clone());
        Self {
            token,
            converter,
            account,
        }
    }
}

impl std::fmt::Debug for TokenSettlement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettlement")
            .field("token", &self.token.symbol())
            .field("converter", &self.converter)
            .field("account", &self.account)
            .finish()
    }
}

/// Hierarchical name registry
pub struct NameRegistry {
    state: Mutex<RegistryState>,
    payout: Arc<dyn NativePayout>,
    settlement: Option<TokenSettlement>,
}

/// Reward credit computed during validation and applied on commit
struct PendingReward {
    ancestor_name: String,
    holder: Address,
    amount: Amount,
}

impl NameRegistry {
    /// Build a registry around `state`
    ///
    /// The dual-currency strategy needs a token settlement.
    pub fn new(
        state: RegistryState,
        payout: Arc<dyn NativePayout>,
        settlement: Option<TokenSettlement>,
    ) -> Result<Self> {
        if state.fees.strategy() == CurrencyStrategy::Dual && settlement.is_none() {
            return Err(RegistryError::UnsupportedCurrency(Currency::Token));
        }
        tracing::info!(
            admin = %state.access.admin(),
            strategy = %state.fees.strategy(),
            registrations = state.registrations.len(),
            "name registry ready"
        );
        Ok(Self {
            state: Mutex::new(state),
            payout,
            settlement,
        })
    }

    /// Native-currency registry with an empty table
    pub fn native(
        admin: Address,
        fees: FeeConfig,
        policy: NamePolicy,
        payout: Arc<dyn NativePayout>,
    ) -> Result<Self> {
        let fees = fees.with_strategy(CurrencyStrategy::Native);
        Self::new(RegistryState::new(admin, fees, policy), payout, None)
    }

    /// Dual-currency registry with an empty table
    pub fn dual(
        admin: Address,
        fees: FeeConfig,
        policy: NamePolicy,
        payout: Arc<dyn NativePayout>,
        settlement: TokenSettlement,
    ) -> Result<Self> {
        let fees = fees.with_strategy(CurrencyStrategy::Dual);
        Self::new(RegistryState::new(admin, fees, policy), payout, Some(settlement))
    }

    // ---- Registration ----

    /// Claim `name` for `caller`, paying `payment` native units
    pub fn register(&self, caller: &Address, name: &str, payment: Amount) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_available(&state, name)?;

        let required = self.native_fee(&state)?;
        if payment != required {
            return Err(RegistryError::FeeMismatch {
                required,
                provided: payment,
            });
        }
        let custody = state
            .native_custody
            .checked_add(payment)
            .ok_or(RegistryError::ArithmeticOverflow)?;

        let reward_amount = self.native_reward(&state)?;
        let reward = Self::pending_reward(&state, &state.native_rewards, name, reward_amount)?;

        state.native_custody = custody;
        Self::commit_registration(&mut state, caller, name, reward, Currency::Native)?;
        tracing::info!(%name, holder = %caller, fee = payment, "name registered");
        Ok(())
    }

    /// Claim `name` for `caller`, paying the fee in external tokens
    pub fn register_with_token(&self, caller: &Address, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        let settlement = self.token_settlement(&state)?;
        // a self-transfer moves nothing
        if *caller == settlement.account {
            return Err(RegistryError::SettlementAccountCaller);
        }
        Self::check_available(&state, name)?;

        let fee = state.fees.registration_fee();
        let available = settlement.token.balance_of(caller);
        if available < fee {
            return Err(RegistryError::InsufficientExternalBalance {
                required: fee,
                available,
            });
        }

        let reward_amount = state.fees.reward_amount();
        let reward = Self::pending_reward(&state, &state.token_rewards, name, reward_amount)?;

        if !settlement.token.transfer_from(caller, &settlement.account, fee) {
            tracing::warn!(%name, holder = %caller, fee, "token payment failed");
            return Err(RegistryError::TransferFailed { amount: fee });
        }

        Self::commit_registration(&mut state, caller, name, reward, Currency::Token)?;
        tracing::info!(%name, holder = %caller, fee, symbol = settlement.token.symbol(), "name registered with token");
        Ok(())
    }

    fn check_available(state: &RegistryState, name: &str) -> Result<()> {
        if state.registrations.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        state.policy.check_length(name)
    }

    fn pending_reward(
        state: &RegistryState,
        ledger: &RewardLedger,
        name: &str,
        amount: Amount,
    ) -> Result<Option<PendingReward>> {
        let Some(ancestor) =
            nearest_registered_ancestor(name, |candidate| state.registrations.contains_key(candidate))
        else {
            return Ok(None);
        };
        let Some(holder) = state.registrations.get(ancestor).copied() else {
            return Ok(None);
        };
        ledger.ensure_credit(&holder, amount)?;
        Ok(Some(PendingReward {
            ancestor_name: ancestor.to_string(),
            holder,
            amount,
        }))
    }

    fn commit_registration(
        state: &mut RegistryState,
        caller: &Address,
        name: &str,
        reward: Option<PendingReward>,
        currency: Currency,
    ) -> Result<()> {
        state.registrations.insert(name.to_string(), *caller);
        state.emit(RegistryEvent::NameRegistered {
            name: name.to_string(),
            holder: *caller,
        });

        if let Some(reward) = reward {
            let ledger = match currency {
                Currency::Native => &mut state.native_rewards,
                Currency::Token => &mut state.token_rewards,
            };
            let new_balance = ledger.credit(&reward.holder, reward.amount)?;
            tracing::info!(
                ancestor = %reward.ancestor_name,
                holder = %reward.holder,
                amount = reward.amount,
                new_balance,
                %currency,
                "ancestor reward accrued"
            );
            state.emit(RegistryEvent::RewardAccrued {
                ancestor_name: reward.ancestor_name,
                holder: reward.holder,
                amount: reward.amount,
                new_balance,
                currency,
            });
        }
        Ok(())
    }

    // ---- Lookups ----

    /// Holder of `name`
    ///
    /// Unknown names yield `Ok(None)`, or `NotRegistered` under the strict
    /// lookup policy.
    pub fn holder_of(&self, name: &str) -> Result<Option<Address>> {
        let state = self.state.lock();
        match state.registrations.get(name) {
            Some(holder) => Ok(Some(*holder)),
            None if state.policy.strict_lookup => Err(RegistryError::NotRegistered(name.to_string())),
            None => Ok(None),
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.state.lock().registrations.contains_key(name)
    }

    /// Registrations in name order
    pub fn registrations(&self) -> Vec<(String, Address)> {
        self.state
            .lock()
            .registrations
            .iter()
            .map(|(name, holder)| (name.clone(), *holder))
            .collect()
    }

    pub fn registration_count(&self) -> usize {
        self.state.lock().registrations.len()
    }

    // ---- Fees ----

    /// Registration fee in the strategy's unit of account
    pub fn current_fee(&self) -> Amount {
        self.state.lock().fees.registration_fee()
    }

    /// Ancestor reward in the strategy's unit of account
    pub fn current_reward_amount(&self) -> Amount {
        self.state.lock().fees.reward_amount()
    }

    /// Native payment `register` currently requires
    pub fn quote_fee(&self) -> Result<Amount> {
        let state = self.state.lock();
        self.native_fee(&state)
    }

    pub fn strategy(&self) -> CurrencyStrategy {
        self.state.lock().fees.strategy()
    }

    pub fn policy(&self) -> NamePolicy {
        self.state.lock().policy.clone()
    }

    fn native_fee(&self, state: &RegistryState) -> Result<Amount> {
        self.to_native(state, state.fees.registration_fee())
    }

    fn native_reward(&self, state: &RegistryState) -> Result<Amount> {
        self.to_native(state, state.fees.reward_amount())
    }

    fn to_native(&self, state: &RegistryState, amount: Amount) -> Result<Amount> {
        match state.fees.strategy() {
            CurrencyStrategy::Native => Ok(amount),
            CurrencyStrategy::Dual => self
                .token_settlement(state)?
                .converter
                .reference_to_settlement(amount),
        }
    }

    fn token_settlement(&self, state: &RegistryState) -> Result<&TokenSettlement> {
        if !state.fees.strategy().accepts(Currency::Token) {
            return Err(RegistryError::UnsupportedCurrency(Currency::Token));
        }
        self.settlement
            .as_ref()
            .ok_or(RegistryError::UnsupportedCurrency(Currency::Token))
    }

    // ---- Administration ----

    pub fn admin(&self) -> Address {
        self.state.lock().access.admin()
    }

    pub fn change_fee(&self, caller: &Address, new_fee: Amount) -> Result<()> {
        let mut state = self.state.lock();
        state.access.ensure_admin(caller)?;
        state.fees.set_registration_fee(new_fee)?;
        state.emit(RegistryEvent::FeeChanged { new_fee });
        tracing::info!(new_fee, "registration fee changed");
        Ok(())
    }

    pub fn change_reward_amount(&self, caller: &Address, new_amount: Amount) -> Result<()> {
        let mut state = self.state.lock();
        state.access.ensure_admin(caller)?;
        state.fees.set_reward_amount(new_amount)?;
        state.emit(RegistryEvent::RewardAmountChanged { new_amount });
        tracing::info!(new_amount, "reward amount changed");
        Ok(())
    }

    pub fn transfer_admin(&self, caller: &Address, new_admin: Address) -> Result<()> {
        let mut state = self.state.lock();
        let previous = state.access.transfer(caller, new_admin)?;
        state.emit(RegistryEvent::AdminTransferred {
            previous,
            new: new_admin,
        });
        tracing::info!(%previous, new = %new_admin, "administrator transferred");
        Ok(())
    }

    /// Release native fees not owed to ancestors, returning the amount sent
    ///
    /// Withdrawable is everything held minus outstanding native rewards. A
    /// zero amount is still sent.
    pub fn withdraw_collected_fees(&self, caller: &Address) -> Result<Amount> {
        let mut state = self.state.lock();
        state.access.ensure_admin(caller)?;

        let outstanding = state.native_rewards.total();
        let amount = state.native_custody.checked_sub(outstanding).ok_or_else(|| {
            RegistryError::CorruptState(format!(
                "native custody {} below outstanding rewards {}",
                state.native_custody, outstanding
            ))
        })?;

        if !self.payout.send(caller, amount) {
            tracing::warn!(to = %caller, amount, "fee payout failed");
            return Err(RegistryError::WithdrawFailed { amount });
        }
        state.native_custody = outstanding;
        state.emit(RegistryEvent::FeesWithdrawn {
            to: *caller,
            amount,
            currency: Currency::Native,
        });
        tracing::info!(to = %caller, amount, "collected fees withdrawn");
        Ok(amount)
    }

    /// Release token fees not owed to ancestors, returning the amount sent
    pub fn withdraw_collected_token_fees(&self, caller: &Address) -> Result<Amount> {
        let mut state = self.state.lock();
        state.access.ensure_admin(caller)?;
        let settlement = self.token_settlement(&state)?;

        let held = settlement.token.balance_of(&settlement.account);
        let outstanding = state.token_rewards.total();
        let amount = held.checked_sub(outstanding).ok_or_else(|| {
            RegistryError::CorruptState(format!(
                "token holdings {} below outstanding rewards {}",
                held, outstanding
            ))
        })?;
        if amount == 0 {
            return Err(RegistryError::NothingToWithdraw);
        }

        if !settlement.token.transfer_from(&settlement.account, caller, amount) {
            tracing::warn!(to = %caller, amount, "token fee payout failed");
            return Err(RegistryError::WithdrawFailed { amount });
        }
        state.emit(RegistryEvent::FeesWithdrawn {
            to: *caller,
            amount,
            currency: Currency::Token,
        });
        tracing::info!(to = %caller, amount, "collected token fees withdrawn");
        Ok(amount)
    }

    // ---- Rewards ----

    /// Withdraw the caller's accrued rewards in `currency`
    ///
    /// The balance is zeroed before funds are released. If the release
    /// fails the call returns `WithdrawFailed` and the balance is not
    /// restored.
    pub fn withdraw_reward(&self, caller: &Address, currency: Currency) -> Result<Amount> {
        let mut state = self.state.lock();
        let settlement = match currency {
            Currency::Native => None,
            Currency::Token => Some(self.token_settlement(&state)?),
        };

        let amount = match currency {
            Currency::Native => state.native_rewards.withdraw(caller)?,
            Currency::Token => state.token_rewards.withdraw(caller)?,
        };
        state.emit(RegistryEvent::RewardWithdrawn {
            holder: *caller,
            amount,
            currency,
        });

        let released = match settlement {
            None => self.payout.send(caller, amount),
            Some(settlement) => settlement.token.transfer_from(&settlement.account, caller, amount),
        };
        if !released {
            tracing::warn!(
                holder = %caller,
                amount,
                %currency,
                "reward payout failed after the balance was zeroed; amount is not re-credited"
            );
            return Err(RegistryError::WithdrawFailed { amount });
        }

        if currency == Currency::Native {
            // custody always covers outstanding rewards, so this cannot go below zero
            state.native_custody = state.native_custody.saturating_sub(amount);
        }
        tracing::info!(holder = %caller, amount, %currency, "reward withdrawn");
        Ok(amount)
    }

    pub fn reward_balance_of(&self, currency: Currency, holder: &Address) -> Amount {
        let state = self.state.lock();
        match currency {
            Currency::Native => state.native_rewards.balance_of(holder),
            Currency::Token => state.token_rewards.balance_of(holder),
        }
    }

    pub fn total_outstanding_rewards(&self, currency: Currency) -> Amount {
        let state = self.state.lock();
        match currency {
            Currency::Native => state.native_rewards.total(),
            Currency::Token => state.token_rewards.total(),
        }
    }

    /// Native funds currently held
    pub fn native_custody(&self) -> Amount {
        self.state.lock().native_custody
    }

    // ---- History & persistence ----

    pub fn events(&self) -> Vec<EventRecord> {
        self.state.lock().events().to_vec()
    }

    /// Take the event history, leaving it empty
    pub fn drain_events(&self) -> Vec<EventRecord> {
        self.state.lock().drain_events()
    }

    /// Persistable copy of the current state
    pub fn snapshot(&self) -> SnapshotV2 {
        self.state.lock().to_snapshot()
    }
}

impl std::fmt::Debug for NameRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("NameRegistry")
            .field("admin", &state.access.admin())
            .field("strategy", &state.fees.strategy())
            .field("registrations", &state.registrations.len())
            .field("settlement", &self.settlement)
            .finish()
    }
}
