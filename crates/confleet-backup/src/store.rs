//! Backup store contract and the in-memory implementation.
//!
//! History is append-only: a store never rewrites or reorders what it
//! already holds, and `latest` is always the most recent append for the
//! device. Appends are atomic per device; a failed capture leaves no
//! partial entry behind.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{BackupError, BackupResult};
use crate::snapshot::BackupSnapshot;

/// Persistent, append-only snapshot storage.
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Append one snapshot to the device's history.
    async fn append(&self, snapshot: BackupSnapshot) -> BackupResult<()>;

    /// Full history for a device, oldest first. Unknown devices yield an
    /// empty history, not an error.
    async fn history(&self, device: &str) -> BackupResult<Vec<BackupSnapshot>>;

    /// Most recent snapshot for a device, if any.
    async fn latest(&self, device: &str) -> BackupResult<Option<BackupSnapshot>>;

    /// Fetch one snapshot by its identifier for restore.
    async fn restore(&self, device: &str, snapshot_id: &str) -> BackupResult<BackupSnapshot>;
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBackupStore {
    histories: Mutex<HashMap<String, Vec<BackupSnapshot>>>,
}

impl MemoryBackupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BackupStore for MemoryBackupStore {
    async fn append(&self, snapshot: BackupSnapshot) -> BackupResult<()> {
        let mut histories = self.histories.lock().unwrap();
        histories
            .entry(snapshot.device.clone())
            .or_default()
            .push(snapshot);
        Ok(())
    }

    async fn history(&self, device: &str) -> BackupResult<Vec<BackupSnapshot>> {
        let histories = self.histories.lock().unwrap();
        Ok(histories.get(device).cloned().unwrap_or_default())
    }

    async fn latest(&self, device: &str) -> BackupResult<Option<BackupSnapshot>> {
        let histories = self.histories.lock().unwrap();
        Ok(histories.get(device).and_then(|h| h.last().cloned()))
    }

    async fn restore(&self, device: &str, snapshot_id: &str) -> BackupResult<BackupSnapshot> {
        let histories = self.histories.lock().unwrap();
        histories
            .get(device)
            .and_then(|h| h.iter().find(|s| s.id() == snapshot_id).cloned())
            .ok_or_else(|| BackupError::SnapshotNotFound {
                device: device.to_string(),
                snapshot_id: snapshot_id.to_string(),
            })
    }
}
