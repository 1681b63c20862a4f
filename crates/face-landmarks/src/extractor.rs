//! Reference clip landmark extraction

use crate::{ExtractError, ExtractorConfig, Landmark, LandmarkDetector, ReferenceClip};
use tracing::{debug, info, warn};
use video_io::SeekableSource;

/// Samples reference clips and runs the detector on the sampled frame.
///
/// Owns the detector handle and releases it on drop, so every exit path of
/// the startup sequence gives the model back.
pub struct LandmarkExtractor<D: LandmarkDetector> {
    detector: D,
    config: ExtractorConfig,
    released: bool,
}

impl<D: LandmarkDetector> LandmarkExtractor<D> {
    pub fn new(detector: D, config: ExtractorConfig) -> Self {
        info!(
            "Creating landmark extractor ({} points, seek timeout {}ms)",
            detector.landmark_count(),
            config.seek_timeout_ms
        );
        Self {
            detector,
            config,
            released: false,
        }
    }

    /// Landmarks of the face at `time_secs`, or `None` when no face is found.
    ///
    /// Moves the source's playback position and waits (bounded by the seek
    /// timeout) for that frame before detecting.
    pub async fn extract_at_time<S: SeekableSource>(
        &mut self,
        source: &mut S,
        time_secs: f64,
    ) -> Result<Option<Vec<Landmark>>, ExtractError> {
        if self.released || !self.detector.is_ready() {
            return Err(ExtractError::DetectorNotReady);
        }

        let frame = tokio::time::timeout(self.config.seek_timeout(), source.seek(time_secs))
            .await
            .map_err(|_| {
                warn!("Seek to {}s timed out", time_secs);
                ExtractError::SeekTimeout {
                    time_secs,
                    timeout_ms: self.config.seek_timeout_ms,
                }
            })??;

        let Some(landmarks) = self.detector.detect(&frame.image)? else {
            debug!("No face at {}s", time_secs);
            return Ok(None);
        };

        let expected = self.detector.landmark_count();
        if landmarks.len() != expected {
            return Err(ExtractError::TopologyMismatch {
                expected,
                actual: landmarks.len(),
            });
        }

        debug!("Extracted {} landmarks at {}s", landmarks.len(), time_secs);
        Ok(Some(landmarks))
    }

    /// Landmarks of a reference clip at its configured offset.
    ///
    /// A clip without a detectable face is an error here, since startup
    /// cannot continue without it.
    pub async fn extract_clip<S: SeekableSource>(
        &mut self,
        source: &mut S,
        clip: &ReferenceClip,
    ) -> Result<Vec<Landmark>, ExtractError> {
        info!("Extracting landmarks for '{}' at {}s", clip.name, clip.offset_secs);
        self.extract_at_time(source, clip.offset_secs)
            .await?
            .ok_or_else(|| ExtractError::NoFace(clip.name.clone()))
    }

    /// Expected landmark count of the wrapped detector
    pub fn landmark_count(&self) -> usize {
        self.detector.landmark_count()
    }

    /// Release the detector now instead of at drop
    pub fn release(&mut self) {
        if !self.released {
            info!("Releasing landmark detector");
            self.detector.release();
            self.released = true;
        }
    }
}

impl<D: LandmarkDetector> Drop for LandmarkExtractor<D> {
    fn drop(&mut self) {
        self.release();
    }
}
