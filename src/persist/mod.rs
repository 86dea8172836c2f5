/// In-memory blob medium.
pub mod memory;
/// Snapshot interchange format.
pub mod snapshot;
/// SQLite-backed blob medium.
pub mod sqlite;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::Notice;

use self::snapshot::{parse_snapshot, RegistrySnapshot, SnapshotView};

/// Default name of the snapshot blob.
pub const DEFAULT_BLOB_NAME: &str = "ffxiv_macro_data";

/// Storage medium failure.
#[derive(Debug, Error)]
pub enum PersistError {
    /// SQLite error.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Encoding error.
    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
    /// Medium-specific failure text.
    #[error("{0}")]
    Message(String),
}

/// Result alias for storage operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Synchronous key-value medium holding named text blobs.
pub trait BlobStore: Send {
    /// Reads the blob called `name`.
    fn get(&self, name: &str) -> PersistResult<Option<String>>;
    /// Writes the blob called `name`, replacing any previous value.
    fn set(&mut self, name: &str, value: &str) -> PersistResult<()>;
    /// Removes the blob called `name`. Removing a missing blob succeeds.
    fn remove(&mut self, name: &str) -> PersistResult<()>;
}

/// Summary of the stored blob without loading it into a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInfo {
    /// Stored macro count.
    pub macros: usize,
    /// Stored mission link count.
    pub missions: usize,
    /// Stamp of the stored snapshot, if readable.
    pub saved_at: Option<DateTime<Utc>>,
    /// Blob size in bytes.
    pub size: usize,
}

/// Snapshot reads and writes against one named blob.
pub struct Persistence {
    medium: Box<dyn BlobStore>,
    blob_name: String,
}

impl Persistence {
    /// Snapshot persistence over `medium` under `blob_name`.
    pub fn new(medium: Box<dyn BlobStore>, blob_name: impl Into<String>) -> Self {
        Self {
            medium,
            blob_name: blob_name.into(),
        }
    }

    /// Name of the snapshot blob.
    pub fn blob_name(&self) -> &str {
        &self.blob_name
    }

    /// Writes `snapshot` stamped with the current time.
    ///
    /// Returns the stamp on success. No retry is attempted on failure.
    pub fn save(&mut self, snapshot: SnapshotView<'_>) -> PersistResult<DateTime<Utc>> {
        let saved_at = Utc::now();
        let stamped = SnapshotView {
            saved_at: Some(saved_at),
            ..snapshot
        };
        let blob = stamped.to_blob()?;
        self.medium.set(&self.blob_name, &blob)?;
        debug!(
            blob = %self.blob_name,
            macros = stamped.macros.len(),
            missions = stamped.missions.len(),
            "snapshot saved"
        );
        Ok(saved_at)
    }

    /// Reads the startup snapshot.
    ///
    /// A missing blob yields an empty snapshot. A read or parse failure also
    /// yields an empty snapshot, plus a [`Notice::LoadFallback`].
    pub fn load(&self) -> (RegistrySnapshot, Option<Notice>) {
        let raw = match self.medium.get(&self.blob_name) {
            Ok(Some(raw)) => raw,
            Ok(None) => return (RegistrySnapshot::default(), None),
            Err(err) => return fallback(err.to_string()),
        };

        match parse_snapshot(&raw) {
            Ok(snapshot) => {
                debug!(
                    blob = %self.blob_name,
                    macros = snapshot.macros.len(),
                    missions = snapshot.missions.len(),
                    "snapshot loaded"
                );
                (snapshot, None)
            }
            Err(err) => fallback(err.message),
        }
    }

    /// Counts and size of the stored blob; `None` when nothing is stored.
    pub fn inspect(&self) -> PersistResult<Option<CacheInfo>> {
        let Some(raw) = self.medium.get(&self.blob_name)? else {
            return Ok(None);
        };
        let snapshot = parse_snapshot(&raw).map_err(|e| PersistError::Message(e.to_string()))?;
        Ok(Some(CacheInfo {
            macros: snapshot.macros.len(),
            missions: snapshot.missions.len(),
            saved_at: snapshot.saved_at,
            size: raw.len(),
        }))
    }

    /// Removes the snapshot blob.
    pub fn clear(&mut self) -> PersistResult<()> {
        self.medium.remove(&self.blob_name)
    }
}

fn fallback(reason: String) -> (RegistrySnapshot, Option<Notice>) {
    warn!(%reason, "failed to load snapshot, starting empty");
    (RegistrySnapshot::default(), Some(Notice::LoadFallback { reason }))
}
