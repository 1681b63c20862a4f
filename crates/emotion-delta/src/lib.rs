//! Emotion Deltas
//!
//! Owns the neutral baseline and the per-emotion displacement table:
//! - Delta computation against the baseline
//! - Intensity-scaled application and multi-emotion blending
//! - Export/import and an injected persistence service

mod manager;
mod store;

pub use manager::{Delta, DeltaManager, DeltaTable};
pub use store::{DeltaStore, FileStore, MemoryStore, SnapshotFormat};

use thiserror::Error;

/// Delta manager errors
#[derive(Debug, Error)]
pub enum DeltaError {
    #[error("Baseline landmarks have not been set")]
    MissingBaseline,
    #[error("Landmark topology mismatch: expected {expected} points, got {actual}")]
    TopologyMismatch { expected: usize, actual: usize },
    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),
}

/// Persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Store lock poisoned: {0}")]
    Lock(String),
}
