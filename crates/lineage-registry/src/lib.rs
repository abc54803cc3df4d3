//! # Lineage Registry
//!
//! Hierarchical name registry. A party pays a fee to claim a unique dotted
//! name; the nearest already-registered ancestor of the new name is
//! credited a fixed reward, withdrawable later.
//!
//! ## Components
//!
//! - `NameRegistry` - name table, fee collection, reward application
//! - `AccessControl` - administrator capability
//! - `RegistryState` - everything guarded by the registry lock
//! - `NativePayout` - rail that releases native funds held by the registry
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use lineage_core::{Address, Currency};
//! use lineage_economics::{CurrencyStrategy, FeeConfig};
//! use lineage_registry::{InMemoryPayout, NamePolicy, NameRegistry};
//!
//! let admin = Address::from_label("admin");
//! let fees = FeeConfig::new(15, 1, CurrencyStrategy::Native).unwrap();
//! let registry =
//!     NameRegistry::native(admin, fees, NamePolicy::default(), Arc::new(InMemoryPayout::new()))
//!         .unwrap();
//!
//! let x = Address::from_label("x");
//! registry.register(&x, "com", 15).unwrap();
//! registry.register(&Address::from_label("y"), "org.com", 15).unwrap();
//! assert_eq!(registry.reward_balance_of(Currency::Native, &x), 1);
//! ```

pub mod access;
pub mod payout;
pub mod registry;
pub mod state;

pub use access::AccessControl;
pub use payout::{InMemoryPayout, NativePayout};
pub use registry::{NameRegistry, TokenSettlement};
pub use state::{NamePolicy, RegistryState};
