//! # Lineage Storage
//!
//! Persistence for registry state and the local token ledger.
//!
//! ## Storage Layout
//!
//! - `state.json` - registry snapshot (versioned schema, see [`schema`])
//! - `token.json` - local token ledger (node local mode only)
//!
//! Every document is wrapped in an envelope carrying its kind, schema
//! version and a BLAKE3 checksum of the payload:
//!
//! ```text
//! { "kind": "registry-state", "schema_version": 2,
//!   "checksum": "<blake3 hex>", "payload": "<json>" }
//! ```

pub mod envelope;
pub mod schema;
pub mod store;

use thiserror::Error;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Checksum mismatch: expected {expected}, found {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Expected a {expected} document, found {found}")]
    WrongKind { expected: String, found: String },

    #[error("Unsupported schema version {0}")]
    UnsupportedVersion(u32),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// Re-export for convenience
pub use schema::{
    FeeSection, LedgerSection, PolicySection, SnapshotV1, SnapshotV2, VersionedSnapshot,
    CURRENT_SCHEMA_VERSION,
};
pub use store::{LoadedState, StateStore, TokenStore};
