//! Delta table persistence

use crate::{DeltaTable, StoreError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Persistence service for the delta table.
///
/// `load` returns `Ok(None)` when nothing has been saved yet; `save` replaces
/// any previous snapshot.
pub trait DeltaStore: Send + Sync {
    fn load(&self) -> Result<Option<DeltaTable>, StoreError>;
    fn save(&self, table: &DeltaTable) -> Result<(), StoreError>;
}

impl<T: DeltaStore + ?Sized> DeltaStore for Arc<T> {
    fn load(&self) -> Result<Option<DeltaTable>, StoreError> {
        (**self).load()
    }

    fn save(&self, table: &DeltaTable) -> Result<(), StoreError> {
        (**self).save(table)
    }
}

/// In-process store (tests and sessions that never touch disk)
#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<DeltaTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a snapshot
    pub fn with_snapshot(table: DeltaTable) -> Self {
        Self {
            snapshot: Mutex::new(Some(table)),
        }
    }

    /// Whether a snapshot has been saved
    pub fn has_snapshot(&self) -> bool {
        self.snapshot.lock().map(|s| s.is_some()).unwrap_or(false)
    }
}

impl DeltaStore for MemoryStore {
    fn load(&self) -> Result<Option<DeltaTable>, StoreError> {
        let snapshot = self
            .snapshot
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        Ok(snapshot.clone())
    }

    fn save(&self, table: &DeltaTable) -> Result<(), StoreError> {
        let mut snapshot = self
            .snapshot
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        *snapshot = Some(table.clone());
        debug!("Saved {} deltas to memory store", table.len());
        Ok(())
    }
}

/// On-disk snapshot encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    /// Human-readable, shortest round-trip float formatting
    #[default]
    Json,
    /// Compact binary
    Postcard,
}

/// Snapshot file on local storage
pub struct FileStore {
    path: PathBuf,
    format: SnapshotFormat,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, format: SnapshotFormat) -> Self {
        let path = path.into();
        info!("Using delta snapshot {} ({:?})", path.display(), format);
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file the snapshot is staged in before replacing `path`
    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn encode(&self, table: &DeltaTable) -> Result<Vec<u8>, StoreError> {
        match self.format {
            SnapshotFormat::Json => serde_json::to_vec_pretty(table)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            SnapshotFormat::Postcard => postcard::to_allocvec(table)
                .map_err(|e| StoreError::Serialization(e.to_string())),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<DeltaTable, StoreError> {
        match self.format {
            SnapshotFormat::Json => serde_json::from_slice(bytes)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            SnapshotFormat::Postcard => postcard::from_bytes(bytes)
                .map_err(|e| StoreError::Serialization(e.to_string())),
        }
    }
}

impl DeltaStore for FileStore {
    fn load(&self) -> Result<Option<DeltaTable>, StoreError> {
        if !self.path.exists() {
            debug!("No delta snapshot at {}", self.path.display());
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)?;
        let table = self.decode(&bytes)?;
        info!("Loaded {} deltas from {}", table.len(), self.path.display());
        Ok(Some(table))
    }

    fn save(&self, table: &DeltaTable) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = self.encode(table)?;
        // Readers see either the old snapshot or the new one, never a partial write
        let staging = self.staging_path();
        std::fs::write(&staging, bytes)?;
        std::fs::rename(&staging, &self.path)?;
        info!("Saved {} deltas to {}", table.len(), self.path.display());
        Ok(())
    }
}
