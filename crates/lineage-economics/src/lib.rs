//! # Lineage Economics - Fees, Pricing & Settlement
//!
//! Everything that decides how much a registration costs and in which
//! currency it is paid.
//!
//! ## Currency strategies
//!
//! | Strategy | Fee denominated in | `register` pays | `register_with_token` pays |
//! |----------|--------------------|-----------------|----------------------------|
//! | Native | native units | the fee, exactly | unsupported |
//! | Dual | reference units (token) | fee converted at the oracle rate | the fee, in tokens |
//!
//! ## Conversion
//!
//! ```text
//! normalized = price scaled to token decimals
//! native     = amount * 10^18 / normalized      (floor)
//! ```
//!
//! The conversion runs on every call; quotes are never cached.

pub mod fees;
pub mod pricing;
pub mod token;

// Re-exports
pub use fees::{CurrencyStrategy, FeeConfig};
pub use pricing::{CurrencyConverter, PriceOracle, PriceQuote, StaticPriceOracle};
pub use token::{ExternalToken, TokenLedger, TokenSnapshot};

/// Settlement and fee constants
pub mod constants {
    /// Fractional digits of the native settlement currency
    pub const SETTLEMENT_DECIMALS: u8 = 18;

    /// One native coin in smallest units (10^18)
    pub const ONE_NATIVE: u128 = 1_000_000_000_000_000_000;

    /// Default maximum name length in bytes
    pub const DEFAULT_MAX_NAME_LENGTH: usize = 32;

    /// Default registration fee: 0.015 native
    pub const DEFAULT_REGISTRATION_FEE: u128 = 15 * ONE_NATIVE / 1_000;

    /// Default ancestor reward: 0.001 native
    pub const DEFAULT_REWARD_AMOUNT: u128 = ONE_NATIVE / 1_000;

    /// Default decimals of the external reference token
    pub const DEFAULT_TOKEN_DECIMALS: u8 = 6;

    /// Default decimals of oracle quotes
    pub const DEFAULT_PRICE_DECIMALS: u8 = 8;
}

pub use constants::*;
