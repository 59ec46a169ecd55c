//! Snapshots of deleted cheques.
//!
//! Deleting a cheque does not destroy it outright: a full copy is kept as a
//! [`ChequeSnapshot`] until it is restored or the retention period runs out.
//! Snapshots can be exported to JSON or a compact binary form and carry a
//! format version that is checked on import.

use crate::error::{ChequeError, Result};
use crate::model::{Cheque, ChequeId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

pub mod error;

pub use error::SnapshotError;

/// Version identifier for the snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Full copy of a cheque taken just before it was deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChequeSnapshot {
    /// Snapshot format version
    pub version: u32,

    pub id: Uuid,

    /// Id the cheque had while it was live
    pub original_id: ChequeId,

    pub deleted_at: DateTime<Utc>,

    pub cheque: Cheque,
}

impl ChequeSnapshot {
    pub fn new(cheque: Cheque, deleted_at: DateTime<Utc>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            id: Uuid::new_v4(),
            original_id: cheque.id(),
            deleted_at,
            cheque,
        }
    }

    /// Whether the snapshot is older than `retention` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        now - self.deleted_at > retention
    }

    pub fn to_json(&self) -> std::result::Result<String, SnapshotError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    pub fn to_binary(&self) -> std::result::Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_binary(bytes: &[u8]) -> std::result::Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    /// Write the snapshot as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(Self::from_json(&json)?)
    }

    fn check_version(self) -> std::result::Result<Self, SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(self)
    }
}

/// Snapshots waiting to be restored or purged, keyed by snapshot id.
#[derive(Clone, Debug, Default)]
pub struct SnapshotStore {
    snapshots: BTreeMap<Uuid, ChequeSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, snapshot: ChequeSnapshot) -> Uuid {
        let id = snapshot.id;
        self.snapshots.insert(id, snapshot);
        id
    }

    pub fn get(&self, id: Uuid) -> Result<&ChequeSnapshot> {
        self.snapshots
            .get(&id)
            .ok_or_else(|| ChequeError::not_found("snapshot", id))
    }

    pub fn remove(&mut self, id: Uuid) -> Result<ChequeSnapshot> {
        self.snapshots
            .remove(&id)
            .ok_or_else(|| ChequeError::not_found("snapshot", id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChequeSnapshot> {
        self.snapshots.values()
    }

    /// Drop every snapshot older than `retention`; returns how many went.
    pub fn purge_expired(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        let before = self.snapshots.len();
        self.snapshots
            .retain(|_, snapshot| !snapshot.is_expired(now, retention));
        let purged = before - self.snapshots.len();
        if purged > 0 {
            info!(purged, "expired cheque snapshots purged");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
