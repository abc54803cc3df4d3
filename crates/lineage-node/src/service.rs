//! Persisted registry service
//!
//! Opens the stores named by the configuration, restores or creates the
//! registry state, wires the collaborators for the configured currency
//! strategy and writes state back after every mutating call.
//!
//! Native payouts go through an in-process rail; released amounts are
//! visible through [`RegistryService::payout`] until the process exits.

use crate::config::{ConfigError, NodeConfig};
use lineage_core::{Address, Amount, Currency, RegistryError};
use lineage_economics::{CurrencyStrategy, ExternalToken, StaticPriceOracle, TokenLedger};
use lineage_registry::{InMemoryPayout, NameRegistry, RegistryState, TokenSettlement};
use lineage_storage::{StateStore, StorageError, TokenStore};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Service errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Summary of the registry for status output
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub admin: Address,
    pub strategy: CurrencyStrategy,
    pub registration_fee: Amount,
    pub reward_amount: Amount,
    /// Native payment `register` currently requires
    pub quoted_native_fee: Option<Amount>,
    pub registrations: usize,
    pub native_custody: Amount,
    pub outstanding_native_rewards: Amount,
    pub outstanding_token_rewards: Amount,
    pub token_symbol: Option<String>,
}

/// Registry wired to its stores and collaborators
pub struct RegistryService {
    config: NodeConfig,
    registry: NameRegistry,
    state_store: StateStore,
    token_store: TokenStore,
    token: Option<Arc<TokenLedger>>,
    payout: Arc<InMemoryPayout>,
}

impl RegistryService {
    /// Open the file-backed service described by `config`
    pub fn open(config: NodeConfig) -> Result<Self> {
        let state_store = StateStore::open(config.storage.state_path());
        let token_store = TokenStore::open(config.storage.token_path());
        Self::with_stores(config, state_store, token_store)
    }

    /// Service whose stores live only in this process
    pub fn in_memory(config: NodeConfig) -> Result<Self> {
        Self::with_stores(config, StateStore::in_memory(), TokenStore::in_memory())
    }

    pub fn with_stores(config: NodeConfig, state_store: StateStore, token_store: TokenStore) -> Result<Self> {
        config.validate()?;

        let state = match state_store.load()? {
            Some(loaded) => {
                let state = RegistryState::from_snapshot(loaded.snapshot)?;
                if let Some(version) = loaded.migrated_from {
                    tracing::info!(from = version, "registry state migrated");
                    state_store.save(&state.to_snapshot())?;
                }
                state
            }
            None => {
                tracing::info!("no persisted state; starting a new registry");
                let state = RegistryState::new(
                    config.admin()?,
                    config.fee_config()?,
                    config.registry.policy(),
                );
                state_store.save(&state.to_snapshot())?;
                state
            }
        };

        let strategy = state.strategy();
        if strategy != config.fees.currency {
            tracing::warn!(
                persisted = %strategy,
                configured = %config.fees.currency,
                "persisted currency strategy differs from configuration; using persisted"
            );
        }

        let (token, settlement) = match strategy {
            CurrencyStrategy::Native => (None, None),
            CurrencyStrategy::Dual => {
                let token = match token_store.load()? {
                    Some(snapshot) => TokenLedger::from_snapshot(snapshot)?,
                    None => TokenLedger::new(config.token.symbol.clone(), config.token.decimals),
                };
                let token = Arc::new(token);
                let oracle = Arc::new(
                    StaticPriceOracle::new(config.oracle.quote())
                        .with_description(config.oracle.description.clone()),
                );
                let settlement = TokenSettlement::new(token.clone(), oracle, config.token.account);
                (Some(token), Some(settlement))
            }
        };

        let payout = Arc::new(InMemoryPayout::new());
        let registry = NameRegistry::new(state, payout.clone(), settlement)?;
        Ok(Self {
            config,
            registry,
            state_store,
            token_store,
            token,
            payout,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Read access to the registry
    pub fn registry(&self) -> &NameRegistry {
        &self.registry
    }

    pub fn token(&self) -> Option<&Arc<TokenLedger>> {
        self.token.as_ref()
    }

    pub fn payout(&self) -> &Arc<InMemoryPayout> {
        &self.payout
    }

    /// Run `op` against the registry, then persist
    ///
    /// State is written even when `op` fails: a failed withdrawal has
    /// already zeroed the ledger entry. A storage failure takes precedence
    /// over the operation's own error, which is logged.
    pub fn mutate<T>(&self, op: impl FnOnce(&NameRegistry) -> lineage_core::Result<T>) -> Result<T> {
        let outcome = op(&self.registry);
        let persisted = self.persist();
        self.log_events();

        if let Err(err) = persisted {
            if let Err(op_err) = &outcome {
                tracing::warn!(error = %op_err, "registry operation failed");
            }
            tracing::error!(error = %err, "registry state not persisted");
            return Err(err);
        }
        Ok(outcome?)
    }

    fn log_events(&self) {
        for record in self.registry.drain_events() {
            match serde_json::to_string(&record.event) {
                Ok(detail) => tracing::info!(
                    sequence = record.sequence,
                    event = record.event.name(),
                    %detail,
                    "registry event"
                ),
                Err(err) => tracing::warn!(
                    sequence = record.sequence,
                    event = record.event.name(),
                    error = %err,
                    "registry event not serializable"
                ),
            }
        }
    }

    /// Write registry state and the token ledger
    pub fn persist(&self) -> Result<()> {
        self.state_store.save(&self.registry.snapshot())?;
        if let Some(token) = &self.token {
            self.token_store.save(&token.snapshot())?;
        }
        Ok(())
    }

    pub fn register(&self, caller: &Address, name: &str, payment: Amount) -> Result<()> {
        self.mutate(|registry| registry.register(caller, name, payment))
    }

    pub fn register_with_token(&self, caller: &Address, name: &str) -> Result<()> {
        self.mutate(|registry| registry.register_with_token(caller, name))
    }

    pub fn change_fee(&self, caller: &Address, new_fee: Amount) -> Result<()> {
        self.mutate(|registry| registry.change_fee(caller, new_fee))
    }

    pub fn change_reward_amount(&self, caller: &Address, new_amount: Amount) -> Result<()> {
        self.mutate(|registry| registry.change_reward_amount(caller, new_amount))
    }

    pub fn transfer_admin(&self, caller: &Address, new_admin: Address) -> Result<()> {
        self.mutate(|registry| registry.transfer_admin(caller, new_admin))
    }

    pub fn withdraw_collected_fees(&self, caller: &Address) -> Result<Amount> {
        self.mutate(|registry| registry.withdraw_collected_fees(caller))
    }

    pub fn withdraw_collected_token_fees(&self, caller: &Address) -> Result<Amount> {
        self.mutate(|registry| registry.withdraw_collected_token_fees(caller))
    }

    pub fn withdraw_reward(&self, caller: &Address, currency: Currency) -> Result<Amount> {
        self.mutate(|registry| registry.withdraw_reward(caller, currency))
    }

    /// Mint local tokens to `to`; the local ledger has no mint authority
    pub fn mint_tokens(&self, to: &Address, amount: Amount) -> Result<Amount> {
        let token = self
            .token
            .as_ref()
            .ok_or(RegistryError::UnsupportedCurrency(Currency::Token))?;
        let balance = token.mint(to, amount)?;
        self.persist()?;
        Ok(balance)
    }

    pub fn token_balance_of(&self, owner: &Address) -> Result<Amount> {
        let token = self
            .token
            .as_ref()
            .ok_or(RegistryError::UnsupportedCurrency(Currency::Token))?;
        Ok(token.balance_of(owner))
    }

    pub fn status(&self) -> ServiceStatus {
        let registry = &self.registry;
        ServiceStatus {
            admin: registry.admin(),
            strategy: registry.strategy(),
            registration_fee: registry.current_fee(),
            reward_amount: registry.current_reward_amount(),
            quoted_native_fee: registry.quote_fee().ok(),
            registrations: registry.registration_count(),
            native_custody: registry.native_custody(),
            outstanding_native_rewards: registry.total_outstanding_rewards(Currency::Native),
            outstanding_token_rewards: registry.total_outstanding_rewards(Currency::Token),
            token_symbol: self.token.as_ref().map(|t| t.symbol().to_string()),
        }
    }
}

impl std::fmt::Debug for RegistryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryService")
            .field("registry", &self.registry)
            .field("state_store", &self.state_store)
            .finish()
    }
}
