//! Core type definitions for Lineage
//!
//! Identities, amounts and currency tags shared by every crate in the
//! workspace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Amount in the smallest unit of whichever currency it belongs to
pub type Amount = u128;

/// Address - 32-byte identity of a holder, the administrator or the registry itself
///
/// Serialized as a lowercase hex string so it can key JSON maps.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    bytes: [u8; 32],
}

impl Address {
    /// Zero address (never a valid holder)
    pub const ZERO: Self = Self { bytes: [0u8; 32] };

    /// Create an address from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Derive a deterministic address from a human-readable label using BLAKE3
    pub fn from_label(label: &str) -> Self {
        Self {
            bytes: *blake3::hash(label.as_bytes()).as_bytes(),
        }
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse from a 64-character hex string (optional `0x` prefix)
    pub fn from_hex(s: &str) -> Result<Self, AddressParseError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(s).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|v: Vec<u8>| AddressParseError::InvalidLength(v.len()))?;
        Ok(Self { bytes })
    }

    pub fn is_zero(&self) -> bool {
        self.bytes == [0u8; 32]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_hex()
    }
}

/// Address parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("address must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Settlement currency an amount is held and paid out in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    /// Native settlement currency (18 fractional digits)
    Native,
    /// External fungible token
    Token,
}

impl Currency {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Token => "token",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "token" => Ok(Self::Token),
            other => Err(format!("unknown currency: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::from_label("alice");
        let parsed: Address = addr.to_hex().parse().unwrap();
        assert_eq!(parsed, addr);

        let prefixed = format!("0x{}", addr.to_hex());
        assert_eq!(Address::from_hex(&prefixed).unwrap(), addr);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert_eq!(
            Address::from_hex("abcd"),
            Err(AddressParseError::InvalidLength(2))
        );
        assert!(matches!(
            Address::from_hex("zz"),
            Err(AddressParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_address_serializes_as_string() {
        let addr = Address::new([7u8; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", "07".repeat(32)));

        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_labels_derive_distinct_addresses() {
        assert_ne!(Address::from_label("alice"), Address::from_label("bob"));
        assert!(!Address::from_label("alice").is_zero());
        assert!(Address::ZERO.is_zero());
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("Native".parse::<Currency>().unwrap(), Currency::Native);
        assert_eq!("token".parse::<Currency>().unwrap(), Currency::Token);
        assert!("gold".parse::<Currency>().is_err());
    }
}
