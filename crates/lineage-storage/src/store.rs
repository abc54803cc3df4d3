//! File and in-memory document stores

use crate::envelope;
use crate::schema::{SnapshotV2, VersionedSnapshot, CURRENT_SCHEMA_VERSION};
use crate::{Result, StorageError};
use lineage_economics::TokenSnapshot;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};

const STATE_KIND: &str = "registry-state";
const TOKEN_KIND: &str = "token-ledger";
const TOKEN_SCHEMA_VERSION: u32 = 1;

/// Where a store keeps its document
#[derive(Debug)]
enum Backend {
    File(PathBuf),
    Memory(RwLock<Option<String>>),
}

impl Backend {
    fn read(&self) -> Result<Option<String>> {
        match self {
            Backend::File(path) => {
                if !path.exists() {
                    return Ok(None);
                }
                Ok(Some(fs::read_to_string(path)?))
            }
            Backend::Memory(slot) => Ok(slot.read().clone()),
        }
    }

    fn write(&self, text: String) -> Result<()> {
        match self {
            Backend::File(path) => write_atomic(path, &text),
            Backend::Memory(slot) => {
                *slot.write() = Some(text);
                Ok(())
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Backend::File(path) => path.display().to_string(),
            Backend::Memory(_) => "memory".to_string(),
        }
    }
}

/// Write through a sibling temp file so readers never see a partial document
fn write_atomic(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, text)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Registry state as loaded, always in the latest schema
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedState {
    pub snapshot: SnapshotV2,
    /// Schema version the document was migrated from, if any
    pub migrated_from: Option<u32>,
}

/// Store for the registry snapshot
#[derive(Debug)]
pub struct StateStore {
    backend: Backend,
}

impl StateStore {
    /// Store backed by a JSON file
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::File(path.into()),
        }
    }

    /// Store that lives only in this process
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(RwLock::new(None)),
        }
    }

    /// Load the stored snapshot, migrating older schemas
    ///
    /// Returns `Ok(None)` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<LoadedState>> {
        let Some(text) = self.backend.read()? else {
            return Ok(None);
        };
        let (version, payload) = envelope::open_raw(STATE_KIND, &text)?;
        if version > CURRENT_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedVersion(version));
        }
        let versioned = VersionedSnapshot::from_payload(version, &payload)?;
        let migrated_from = (version != CURRENT_SCHEMA_VERSION).then_some(version);
        let snapshot = versioned.into_latest();

        tracing::debug!(
            location = %self.backend.describe(),
            version,
            registrations = snapshot.registrations.len(),
            "loaded registry state"
        );
        Ok(Some(LoadedState {
            snapshot,
            migrated_from,
        }))
    }

    /// Persist `snapshot` under the current schema
    pub fn save(&self, snapshot: &SnapshotV2) -> Result<()> {
        let text = envelope::seal(STATE_KIND, CURRENT_SCHEMA_VERSION, snapshot)?;
        self.backend.write(text)?;
        tracing::debug!(
            location = %self.backend.describe(),
            registrations = snapshot.registrations.len(),
            "saved registry state"
        );
        Ok(())
    }

    /// Write a document of any schema version; used to seed fixtures
    pub fn save_versioned<T: serde::Serialize>(&self, version: u32, value: &T) -> Result<()> {
        let text = envelope::seal(STATE_KIND, version, value)?;
        self.backend.write(text)
    }
}

/// Store for the local token ledger
#[derive(Debug)]
pub struct TokenStore {
    backend: Backend,
}

impl TokenStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::File(path.into()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(RwLock::new(None)),
        }
    }

    pub fn load(&self) -> Result<Option<TokenSnapshot>> {
        let Some(text) = self.backend.read()? else {
            return Ok(None);
        };
        let (version, snapshot) = envelope::open::<TokenSnapshot>(TOKEN_KIND, &text)?;
        if version != TOKEN_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedVersion(version));
        }
        Ok(Some(snapshot))
    }

    pub fn save(&self, snapshot: &TokenSnapshot) -> Result<()> {
        let text = envelope::seal(TOKEN_KIND, TOKEN_SCHEMA_VERSION, snapshot)?;
        self.backend.write(text)
    }
}
