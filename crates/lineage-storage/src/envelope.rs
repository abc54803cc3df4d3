//! Checksummed document envelope

use crate::{Result, StorageError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// On-disk wrapper around a serialized payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Document kind, e.g. `registry-state`
    pub kind: String,
    /// Schema version of the payload
    pub schema_version: u32,
    /// BLAKE3 of `payload`, hex
    pub checksum: String,
    /// JSON payload
    pub payload: String,
}

fn checksum(payload: &str) -> String {
    hex::encode(blake3::hash(payload.as_bytes()).as_bytes())
}

/// Serialize `value` into an envelope string
pub fn seal<T: Serialize>(kind: &str, schema_version: u32, value: &T) -> Result<String> {
    let payload = serde_json::to_string(value)?;
    let envelope = Envelope {
        kind: kind.to_string(),
        schema_version,
        checksum: checksum(&payload),
        payload,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// Verify an envelope string, returning the schema version and raw payload
pub fn open_raw(kind: &str, text: &str) -> Result<(u32, String)> {
    let envelope: Envelope = serde_json::from_str(text)?;
    if envelope.kind != kind {
        return Err(StorageError::WrongKind {
            expected: kind.to_string(),
            found: envelope.kind,
        });
    }
    let actual = checksum(&envelope.payload);
    if actual != envelope.checksum {
        return Err(StorageError::ChecksumMismatch {
            expected: envelope.checksum,
            actual,
        });
    }
    Ok((envelope.schema_version, envelope.payload))
}

/// Verify and deserialize an envelope string, returning the schema version
pub fn open<T: DeserializeOwned>(kind: &str, text: &str) -> Result<(u32, T)> {
    let (version, payload) = open_raw(kind, text)?;
    Ok((version, serde_json::from_str(&payload)?))
}
