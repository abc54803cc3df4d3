//! # Lineage Core
//!
//! Core data structures for the Lineage hierarchical name registry.
//!
//! This crate provides the building blocks the registry is assembled from:
//! - `Address` / `Amount` / `Currency` - identities and money
//! - `RegistryError` - the error taxonomy shared by every crate
//! - `hierarchy` - ancestor walk over dotted names
//! - `RewardLedger` - per-holder ancestor rewards with a conserved total
//! - `RegistryEvent` - audit events
//!
//! ## Reward flow
//!
//! ```text
//!   register("ua.org.com")
//!          │
//!          ▼
//!   ancestors: org.com ──► com
//!          │ first registered
//!          ▼
//!   RewardLedger.credit(holder_of("org.com"), reward)
//! ```

pub mod error;
pub mod events;
pub mod hierarchy;
pub mod ledger;
pub mod types;

pub use error::*;
pub use events::*;
pub use ledger::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{ErrorCategory, RegistryError, Result};
    pub use crate::events::{EventRecord, RegistryEvent};
    pub use crate::hierarchy::{ancestors, nearest_registered_ancestor};
    pub use crate::ledger::RewardLedger;
    pub use crate::types::{Address, Amount, Currency};
}
