//! Landmark detector capability

use crate::{ExtractError, Landmark};
use image::RgbImage;
use tracing::debug;

/// External landmark detection capability.
///
/// Implementations wrap a face-mesh style model. The model itself is not part
/// of this crate.
pub trait LandmarkDetector {
    /// Whether the model is loaded and can accept frames
    fn is_ready(&self) -> bool;

    /// Fixed number of points this detector configuration produces
    fn landmark_count(&self) -> usize;

    /// Detect the landmarks of zero or one face in `frame`
    fn detect(&mut self, frame: &RgbImage) -> Result<Option<Vec<Landmark>>, ExtractError>;

    /// Release model resources. Called once when the owning extractor drops.
    fn release(&mut self) {}
}

/// Detector backed by a closure.
///
/// Adapts an already-running detection backend (or a fixture in tests) to
/// the [`LandmarkDetector`] capability.
pub struct FnDetector<F> {
    landmark_count: usize,
    detect_fn: F,
    ready: bool,
}

impl<F> FnDetector<F>
where
    F: FnMut(&RgbImage) -> Option<Vec<Landmark>>,
{
    pub fn new(landmark_count: usize, detect_fn: F) -> Self {
        Self {
            landmark_count,
            detect_fn,
            ready: true,
        }
    }

    /// Detector whose model has not finished loading
    pub fn not_ready(landmark_count: usize, detect_fn: F) -> Self {
        Self {
            ready: false,
            ..Self::new(landmark_count, detect_fn)
        }
    }
}

impl<F> LandmarkDetector for FnDetector<F>
where
    F: FnMut(&RgbImage) -> Option<Vec<Landmark>>,
{
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn landmark_count(&self) -> usize {
        self.landmark_count
    }

    fn detect(&mut self, frame: &RgbImage) -> Result<Option<Vec<Landmark>>, ExtractError> {
        Ok((self.detect_fn)(frame))
    }

    fn release(&mut self) {
        debug!("Releasing closure detector");
        self.ready = false;
    }
}
