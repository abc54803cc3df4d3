//! Node configuration types
//!
//! Loaded from `lineage.toml`. Every field has a default, so a file only
//! needs the sections it changes:
//!
//! ```toml
//! [registry]
//! admin = "<64 hex chars>"
//! max_name_length = 32        # 0 disables the limit
//! strict_lookup = false
//!
//! [fees]
//! currency = "native"         # or "dual"
//! registration_fee = 15000000000000000
//! reward_amount = 1000000000000000
//!
//! [oracle]
//! price = 200000000000        # reference units per native coin
//! decimals = 8
//!
//! [token]
//! symbol = "USDX"
//! decimals = 6
//!
//! [storage]
//! data_dir = "~/.lineage"
//!
//! [logging]
//! level = "info"
//! format = "text"             # or "json"
//! ```
//!
//! Under the dual strategy `registration_fee` and `reward_amount` are in
//! token units. TOML integers stop at `i64::MAX`; larger fees and prices
//! are written as decimal strings (`registration_fee = "20000000000000000000"`).

use lineage_core::{Address, Amount, RegistryError};
use lineage_economics::{
    CurrencyStrategy, FeeConfig, PriceQuote, DEFAULT_MAX_NAME_LENGTH, DEFAULT_PRICE_DECIMALS,
    DEFAULT_REGISTRATION_FEE, DEFAULT_REWARD_AMOUNT, DEFAULT_TOKEN_DECIMALS,
};
use lineage_registry::NamePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("registry.admin must be set to a non-zero address")]
    MissingAdmin,

    #[error("Invalid fee settings: {0}")]
    InvalidFees(RegistryError),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Complete node configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Administrator and name policy
    #[serde(default)]
    pub registry: RegistrySettings,

    /// Fee model
    #[serde(default)]
    pub fees: FeeSettings,

    /// Built-in static price oracle
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Local token ledger
    #[serde(default)]
    pub token: TokenConfig,

    /// Storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NodeConfig {
    /// Read and parse a TOML configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Local configuration with `admin` and everything else at defaults
    pub fn local(admin: Address, data_dir: impl Into<String>) -> Self {
        Self {
            registry: RegistrySettings {
                admin: Some(admin),
                ..Default::default()
            },
            storage: StorageConfig {
                data_dir: data_dir.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Reject configurations the service cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.admin()?;
        self.fee_config()?;
        if self.fees.currency == CurrencyStrategy::Dual {
            let quote = self.oracle.quote();
            quote
                .normalized(self.token.decimals)
                .map_err(|_| ConfigError::InvalidValue {
                    field: "oracle.price",
                    value: self.oracle.price.to_string(),
                })?;
            if self.token.account.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: "token.account",
                    value: self.token.account.to_hex(),
                });
            }
        }
        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "logging.format",
                    value: other.to_string(),
                })
            }
        }
        if self.storage.state_file.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage.state_file",
                value: String::new(),
            });
        }
        Ok(())
    }

    pub fn admin(&self) -> Result<Address, ConfigError> {
        match self.registry.admin {
            Some(admin) if !admin.is_zero() => Ok(admin),
            _ => Err(ConfigError::MissingAdmin),
        }
    }

    pub fn fee_config(&self) -> Result<FeeConfig, ConfigError> {
        FeeConfig::new(
            self.fees.registration_fee,
            self.fees.reward_amount,
            self.fees.currency,
        )
        .map_err(ConfigError::InvalidFees)
    }
}

/// Registry settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Administrator address (hex)
    #[serde(default)]
    pub admin: Option<Address>,

    /// Maximum name length in bytes; 0 disables the limit
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,

    /// Fail lookups of unknown names
    #[serde(default)]
    pub strict_lookup: bool,
}

fn default_max_name_length() -> usize {
    DEFAULT_MAX_NAME_LENGTH
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            admin: None,
            max_name_length: default_max_name_length(),
            strict_lookup: false,
        }
    }
}

impl RegistrySettings {
    pub fn policy(&self) -> NamePolicy {
        NamePolicy {
            max_name_length: (self.max_name_length > 0).then_some(self.max_name_length),
            strict_lookup: self.strict_lookup,
        }
    }
}

/// Fee settings, used when no state has been persisted yet
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeeSettings {
    /// Currency strategy
    #[serde(default)]
    pub currency: CurrencyStrategy,

    /// Registration fee
    #[serde(default = "default_registration_fee", with = "wide_int")]
    pub registration_fee: Amount,

    /// Ancestor reward
    #[serde(default = "default_reward_amount", with = "wide_int")]
    pub reward_amount: Amount,
}

fn default_registration_fee() -> Amount {
    DEFAULT_REGISTRATION_FEE
}

fn default_reward_amount() -> Amount {
    DEFAULT_REWARD_AMOUNT
}

impl Default for FeeSettings {
    fn default() -> Self {
        Self {
            currency: CurrencyStrategy::Native,
            registration_fee: default_registration_fee(),
            reward_amount: default_reward_amount(),
        }
    }
}

/// Static oracle configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Reference units per native coin, scaled by `decimals`
    #[serde(default = "default_price", with = "wide_int")]
    pub price: i128,

    /// Fractional digits of `price`
    #[serde(default = "default_price_decimals")]
    pub decimals: u8,

    #[serde(default = "default_oracle_description")]
    pub description: String,
}

fn default_price() -> i128 {
    2_000 * 10i128.pow(DEFAULT_PRICE_DECIMALS as u32)
}

fn default_price_decimals() -> u8 {
    DEFAULT_PRICE_DECIMALS
}

fn default_oracle_description() -> String {
    "static reference/native price".to_string()
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            price: default_price(),
            decimals: default_price_decimals(),
            description: default_oracle_description(),
        }
    }
}

impl OracleConfig {
    pub fn quote(&self) -> PriceQuote {
        PriceQuote::new(self.price, self.decimals)
    }
}

/// Local token ledger configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_token_symbol")]
    pub symbol: String,

    #[serde(default = "default_token_decimals")]
    pub decimals: u8,

    /// Account the registry holds tokens under
    #[serde(default = "default_token_account")]
    pub account: Address,
}

fn default_token_symbol() -> String {
    "USDX".to_string()
}

fn default_token_decimals() -> u8 {
    DEFAULT_TOKEN_DECIMALS
}

fn default_token_account() -> Address {
    Address::from_label("lineage-registry")
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            symbol: default_token_symbol(),
            decimals: default_token_decimals(),
            account: default_token_account(),
        }
    }
}

/// Storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory; a leading `~` is expanded
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Registry snapshot file, relative to `data_dir`
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Token ledger file, relative to `data_dir`
    #[serde(default = "default_token_file")]
    pub token_file: String,
}

fn default_data_dir() -> String {
    "~/.lineage".to_string()
}

fn default_state_file() -> String {
    "state.json".to_string()
}

fn default_token_file() -> String {
    "token.json".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            state_file: default_state_file(),
            token_file: default_token_file(),
        }
    }
}

impl StorageConfig {
    pub fn data_dir(&self) -> PathBuf {
        expand_path(Path::new(&self.data_dir))
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir().join(&self.state_file)
    }

    pub fn token_path(&self) -> PathBuf {
        self.data_dir().join(&self.token_file)
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Color output
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            color: true,
        }
    }
}

/// 128-bit config integers as TOML integers, or decimal strings past `i64`
mod wide_int {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::fmt::Display;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(i64),
        Text(String),
    }

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Copy + TryInto<i64> + Display,
        S: Serializer,
    {
        match (*value).try_into() {
            Ok(small) => serializer.serialize_i64(small),
            Err(_) => serializer.collect_str(value),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: TryFrom<i64> + FromStr,
        <T as TryFrom<i64>>::Error: Display,
        <T as FromStr>::Err: Display,
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Int(value) => {
                T::try_from(value).map_err(|e| D::Error::custom(format!("{value}: {e}")))
            }
            Repr::Text(text) => {
                let digits = text.trim().replace('_', "");
                digits
                    .parse()
                    .map_err(|e| D::Error::custom(format!("{text:?}: {e}")))
            }
        }
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_path(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(rest) = path_str.strip_prefix('~') {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest.trim_start_matches('/'));
            }
        }
    }
    path.to_path_buf()
}
