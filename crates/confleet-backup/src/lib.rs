//! confleet-backup: configuration snapshot capture and storage.
//!
//! Snapshots of device running configurations are captured through the
//! same session capability the engine uses for pushes, digested with
//! SHA-256, and appended to a [`store::BackupStore`]. The filesystem
//! store mirrors the fleet's operational layout: one timestamped file
//! per snapshot, a `_latest.txt` copy per device, and a regenerated
//! index.

pub mod capture;
pub mod error;
pub mod fs;
pub mod snapshot;
pub mod store;

pub use capture::{capture_action, capture_snapshot};
pub use error::{BackupError, BackupResult};
pub use fs::FsBackupStore;
pub use snapshot::{BackupSnapshot, StateDigest};
pub use store::{BackupStore, MemoryBackupStore};
