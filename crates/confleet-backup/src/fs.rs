//! Filesystem-backed snapshot store.
//!
//! Layout under the store root, one flat directory for the whole fleet:
//!
//! ```text
//! R1_20260314_092653.txt      one file per snapshot
//! R1_latest.txt               whole-file copy of the newest snapshot
//! README.md                   human-readable index, regenerated on append
//! ```
//!
//! Every write goes through a temp file in the same directory followed by
//! a rename, so readers never observe a half-written snapshot. Appends are
//! serialized behind a store-wide lock: the index file is shared by all
//! devices, and concurrent captures of different devices must never fail
//! each other. When two captures of the same device land within one
//! second, later file names carry a sequence suffix (`-2`, `-3`, ...)
//! that sorts after the plain name, so `latest` and the pointer file
//! always agree.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{BackupError, BackupResult};
use crate::snapshot::{BackupSnapshot, SNAPSHOT_TIMESTAMP_FORMAT};
use crate::store::BackupStore;

/// Snapshot store rooted at one directory.
#[derive(Debug, Clone)]
pub struct FsBackupStore {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FsBackupStore {
    /// Open (and create if needed) a store at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> BackupResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn latest_path(&self, device: &str) -> PathBuf {
        self.root.join(format!("{device}_latest.txt"))
    }

    /// Write `content` to `path` atomically via a sibling temp file.
    async fn write_atomic(&self, path: &Path, content: &str) -> BackupResult<()> {
        let mut tmp = path.to_path_buf();
        tmp.set_extension("txt.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Parse a snapshot file name into its capture instant and same-second
    /// sequence number (1 for the plain name).
    ///
    /// Returns `None` for files that belong to a different device, the
    /// latest pointer, and anything else that is not a snapshot of
    /// `device`.
    fn parse_name(device: &str, file_name: &str) -> Option<(NaiveDateTime, u32)> {
        let stem = file_name.strip_suffix(".txt")?;
        let rest = stem.strip_prefix(device)?.strip_prefix('_')?;
        if rest == "latest" {
            return None;
        }
        match rest.split_once('-') {
            None => {
                let ts = NaiveDateTime::parse_from_str(rest, SNAPSHOT_TIMESTAMP_FORMAT).ok()?;
                Some((ts, 1))
            }
            Some((stamp, seq)) => {
                let ts = NaiveDateTime::parse_from_str(stamp, SNAPSHOT_TIMESTAMP_FORMAT).ok()?;
                Some((ts, seq.parse().ok()?))
            }
        }
    }

    /// Snapshot files for a device, in capture order: timestamp first,
    /// then same-second sequence.
    async fn snapshot_files(&self, device: &str) -> BackupResult<Vec<(NaiveDateTime, u32, PathBuf)>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some((ts, seq)) = Self::parse_name(device, name) {
                files.push((ts, seq, entry.path()));
            }
        }
        files.sort();
        Ok(files)
    }

    async fn read_snapshot(&self, device: &str, path: &Path) -> BackupResult<BackupSnapshot> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| BackupError::MalformedEntry {
                file: path.display().to_string(),
            })?;
        let (ts, _) =
            Self::parse_name(device, name).ok_or_else(|| BackupError::MalformedEntry {
                file: name.to_string(),
            })?;
        let content = tokio::fs::read_to_string(path).await?;
        Ok(BackupSnapshot::new(device, ts.and_utc(), content))
    }

    /// Regenerate the human-readable index from the directory contents.
    async fn write_index(&self) -> BackupResult<()> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(".txt") && !name.ends_with("_latest.txt") {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        let mut index = String::from("# Configuration Backups\n\n");
        for name in &names {
            index.push_str("- ");
            index.push_str(name);
            index.push('\n');
        }
        self.write_atomic(&self.root.join("README.md"), &index).await
    }
}

#[async_trait]
impl BackupStore for FsBackupStore {
    async fn append(&self, snapshot: BackupSnapshot) -> BackupResult<()> {
        // One append at a time per store; the index temp file is shared
        // across devices and must never be raced.
        let _guard = self.write_lock.lock().await;

        // Same device, same second: later captures take the next free
        // sequence suffix so capture order survives the name sort.
        let mut path = self.root.join(format!("{}.txt", snapshot.id()));
        let mut seq = 2u32;
        while tokio::fs::try_exists(&path).await? {
            path = self.root.join(format!("{}-{}.txt", snapshot.id(), seq));
            seq += 1;
        }

        self.write_atomic(&path, &snapshot.content).await?;
        self.write_atomic(&self.latest_path(&snapshot.device), &snapshot.content)
            .await?;
        self.write_index().await?;

        debug!(
            device = %snapshot.device,
            file = %path.display(),
            digest = %snapshot.digest.short(),
            "snapshot persisted"
        );
        Ok(())
    }

    async fn history(&self, device: &str) -> BackupResult<Vec<BackupSnapshot>> {
        let mut history = Vec::new();
        for (_, _, path) in self.snapshot_files(device).await? {
            history.push(self.read_snapshot(device, &path).await?);
        }
        Ok(history)
    }

    async fn latest(&self, device: &str) -> BackupResult<Option<BackupSnapshot>> {
        match self.snapshot_files(device).await?.last() {
            Some((_, _, path)) => Ok(Some(self.read_snapshot(device, path).await?)),
            None => Ok(None),
        }
    }

    async fn restore(&self, device: &str, snapshot_id: &str) -> BackupResult<BackupSnapshot> {
        // An id shared by same-second captures resolves to the most recent
        // one; a suffixed file stem pins an exact capture.
        let mut found = None;
        for (_, _, path) in self.snapshot_files(device).await? {
            let stem = path.file_stem().and_then(|s| s.to_str());
            let snapshot = self.read_snapshot(device, &path).await?;
            if stem == Some(snapshot_id) || snapshot.id() == snapshot_id {
                found = Some(snapshot);
            }
        }
        found.ok_or_else(|| BackupError::SnapshotNotFound {
            device: device.to_string(),
            snapshot_id: snapshot_id.to_string(),
        })
    }
}
