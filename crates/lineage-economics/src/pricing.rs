//! # Oracle Pricing
//!
//! Converts amounts denominated in the reference unit (the external token's
//! units) into native settlement units using the oracle's latest quote.
//!
//! ## Example
//!
//! ```text
//! fee      = 15_000_000            (15.000000 reference, 6 decimals)
//! quote    = 2000_00000000, 8 dp   (2000 reference per native coin)
//! normal   = 2_000_000_000         (scaled to 6 decimals)
//! native   = 15_000_000 * 10^18 / 2_000_000_000 = 7_500_000_000_000_000
//! ```

use crate::constants::ONE_NATIVE;
use crate::token::ExternalToken;
use lineage_core::{Amount, RegistryError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Latest price reported by an oracle: reference units per native coin
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Raw price; may be zero or negative if the feed misbehaves
    pub value: i128,
    /// Fractional digits of `value`
    pub decimals: u8,
}

impl PriceQuote {
    pub fn new(value: i128, decimals: u8) -> Self {
        Self { value, decimals }
    }

    /// Price scaled to `target_decimals` (multiply up, floor-divide down)
    pub fn normalized(&self, target_decimals: u8) -> Result<u128> {
        if self.value <= 0 {
            return Err(RegistryError::OraclePriceInvalid(self.value));
        }
        let value = self.value as u128;
        let normalized = if target_decimals >= self.decimals {
            let scale = pow10((target_decimals - self.decimals) as u32)?;
            value
                .checked_mul(scale)
                .ok_or(RegistryError::ArithmeticOverflow)?
        } else {
            match 10u128.checked_pow((self.decimals - target_decimals) as u32) {
                Some(scale) => value / scale,
                None => 0,
            }
        };
        if normalized == 0 {
            return Err(RegistryError::OraclePriceInvalid(self.value));
        }
        Ok(normalized)
    }
}

fn pow10(exp: u32) -> Result<u128> {
    10u128
        .checked_pow(exp)
        .ok_or(RegistryError::ArithmeticOverflow)
}

/// External price feed
pub trait PriceOracle: Send + Sync {
    /// Latest quote; no staleness checks beyond what the feed itself provides
    fn latest_price(&self) -> PriceQuote;

    /// Human-readable feed description
    fn description(&self) -> &str {
        "price oracle"
    }
}

/// Oracle with a settable quote
///
/// Backs the `[oracle]` section of the node configuration and tests.
pub struct StaticPriceOracle {
    quote: RwLock<PriceQuote>,
    description: String,
}

impl StaticPriceOracle {
    pub fn new(quote: PriceQuote) -> Self {
        Self {
            quote: RwLock::new(quote),
            description: "static price oracle".to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replace the quote returned by subsequent calls
    pub fn set_price(&self, quote: PriceQuote) {
        *self.quote.write() = quote;
    }
}

impl PriceOracle for StaticPriceOracle {
    fn latest_price(&self) -> PriceQuote {
        *self.quote.read()
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Convert `amount` reference units into native units at `quote`
pub fn reference_to_native(amount: Amount, quote: PriceQuote, token_decimals: u8) -> Result<Amount> {
    let normalized = quote.normalized(token_decimals)?;
    let scaled = amount
        .checked_mul(ONE_NATIVE)
        .ok_or(RegistryError::ArithmeticOverflow)?;
    Ok(scaled / normalized)
}

/// Reference-unit to settlement-currency converter
///
/// Reads the oracle and the token metadata on every call.
#[derive(Clone)]
pub struct CurrencyConverter {
    oracle: Arc<dyn PriceOracle>,
    token: Arc<dyn ExternalToken>,
}

impl CurrencyConverter {
    pub fn new(oracle: Arc<dyn PriceOracle>, token: Arc<dyn ExternalToken>) -> Self {
        Self { oracle, token }
    }

    /// Native amount currently equivalent to `amount` reference units
    pub fn reference_to_settlement(&self, amount: Amount) -> Result<Amount> {
        let quote = self.oracle.latest_price();
        let token_decimals = self.token.decimals();
        let native = reference_to_native(amount, quote, token_decimals)?;
        tracing::debug!(
            amount,
            price = quote.value,
            price_decimals = quote.decimals,
            token_decimals,
            native,
            "converted reference amount"
        );
        Ok(native)
    }
}

impl std::fmt::Debug for CurrencyConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrencyConverter")
            .field("oracle", &self.oracle.description())
            .field("token", &self.token.symbol())
            .finish()
    }
}
