//! Facial Landmarks
//!
//! Landmark extraction from reference clips:
//! - Normalized landmark points with fixed topology
//! - Detector capability consumed as a black box
//! - Seek-and-detect extraction with a bounded seek wait

pub mod config;
pub mod detector;
pub mod extractor;
pub mod landmark;

pub use config::{ExtractorConfig, ReferenceClip};
pub use detector::{FnDetector, LandmarkDetector};
pub use extractor::LandmarkExtractor;
pub use landmark::{Landmark, FACE_MESH_LANDMARKS};

use thiserror::Error;
use video_io::CaptureError;

/// Landmark extraction error types
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Landmark detector is not ready")]
    DetectorNotReady,

    #[error("Seek to {time_secs}s did not complete within {timeout_ms}ms")]
    SeekTimeout { time_secs: f64, timeout_ms: u64 },

    #[error("No face detected in clip '{0}'")]
    NoFace(String),

    #[error("Landmark topology mismatch: expected {expected} points, got {actual}")]
    TopologyMismatch { expected: usize, actual: usize },

    #[error("Clip error: {0}")]
    Source(#[from] CaptureError),
}
