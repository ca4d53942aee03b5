//! Error types for snapshot capture and storage.

use thiserror::Error;

use confleet_core::error::SessionError;

/// Errors raised while capturing or persisting configuration snapshots.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The device session failed while pulling the running configuration.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Filesystem failure while writing or reading the store.
    #[error("backup store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Restore was asked for a snapshot the store does not hold.
    #[error("no snapshot '{snapshot_id}' for device '{device}'")]
    SnapshotNotFound { device: String, snapshot_id: String },

    /// A store entry on disk does not parse as a snapshot.
    #[error("malformed store entry: {file}")]
    MalformedEntry { file: String },
}

/// Result type for backup operations.
pub type BackupResult<T> = std::result::Result<T, BackupError>;
