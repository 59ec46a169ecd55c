//! Snapshot error types.

use thiserror::Error;

/// Errors raised while exporting or importing a deleted-cheque snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Could not encode snapshot: {0}")]
    SerializationFailed(String),

    /// The bytes or JSON text are not a snapshot.
    #[error("Could not decode snapshot: {0}")]
    DeserializationFailed(String),

    #[error("Unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}
