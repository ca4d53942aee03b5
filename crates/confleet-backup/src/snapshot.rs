//! Snapshot value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Format used for snapshot identifiers and on-disk file names.
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// SHA-256 digest of a snapshot's content, hex-encoded.
///
/// Two captures of an unchanged configuration produce the same digest, so
/// callers can cheaply detect drift between snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateDigest(String);

impl StateDigest {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for file names and log lines.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl std::fmt::Display for StateDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One captured device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub device: String,
    pub captured_at: DateTime<Utc>,
    pub content: String,
    pub digest: StateDigest,
}

impl BackupSnapshot {
    pub fn new(device: impl Into<String>, captured_at: DateTime<Utc>, content: String) -> Self {
        let digest = StateDigest::from_bytes(content.as_bytes());
        Self {
            device: device.into(),
            captured_at,
            content,
            digest,
        }
    }

    /// Stable identifier: `{device}_{YYYYMMDD_HHMMSS}`.
    pub fn id(&self) -> String {
        format!(
            "{}_{}",
            self.device,
            self.captured_at.format(SNAPSHOT_TIMESTAMP_FORMAT)
        )
    }
}
