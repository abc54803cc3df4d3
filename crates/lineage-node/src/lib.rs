//! # Lineage Node
//!
//! Runs the registry locally: loads `lineage.toml`, opens the state and
//! token stores under the data directory, wires the configured currency
//! strategy and persists after every mutation.

pub mod config;
pub mod service;

pub use config::{ConfigError, NodeConfig};
pub use service::{RegistryService, ServiceError, ServiceStatus};
