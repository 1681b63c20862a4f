//! Reference clips and live frame sources

use crate::{CaptureError, SequenceConfig, SourceFrame};
use image::RgbImage;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// A clip that can be positioned at an arbitrary timestamp
pub trait SeekableSource {
    /// Move playback to `time_secs` and resolve once that frame is decodable
    fn seek(
        &mut self,
        time_secs: f64,
    ) -> impl Future<Output = Result<SourceFrame, CaptureError>> + Send;

    /// Clip length in seconds
    fn duration_secs(&self) -> f64;

    /// Current playback position in seconds
    fn position_secs(&self) -> f64;
}

/// A continuously playing feed polled once per render cycle
pub trait FrameSource {
    /// Advance playback by `elapsed` and return the frame now showing.
    ///
    /// Returns `None` while the frame is not decoded yet.
    fn poll_frame(&mut self, elapsed: Duration) -> Option<&SourceFrame>;
}

/// Decoded clip held in memory
pub struct FrameSequence {
    frames: Vec<SourceFrame>,
    config: SequenceConfig,
    position_secs: f64,
}

impl FrameSequence {
    /// Create a clip from decoded images
    pub fn new(images: Vec<RgbImage>, config: SequenceConfig) -> Result<Self, CaptureError> {
        if images.is_empty() {
            return Err(CaptureError::EmptyClip);
        }
        if !(config.fps.is_finite() && config.fps > 0.0) {
            return Err(CaptureError::InvalidFrameRate(config.fps));
        }

        let frames = images
            .into_iter()
            .enumerate()
            .map(|(i, image)| SourceFrame::new(image, i as f64 / config.fps, i as u32))
            .collect();

        Ok(Self {
            frames,
            config,
            position_secs: 0.0,
        })
    }

    /// Single-frame looping clip
    pub fn still(image: RgbImage) -> Self {
        Self {
            frames: vec![SourceFrame::new(image, 0.0, 0)],
            config: SequenceConfig::default(),
            position_secs: 0.0,
        }
    }

    /// Decode an image sequence from disk, in the given order
    pub fn from_paths<P: AsRef<Path>>(
        paths: &[P],
        config: SequenceConfig,
    ) -> Result<Self, CaptureError> {
        let mut images = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            debug!("Decoding frame {}", path.display());
            images.push(image::open(path)?.to_rgb8());
        }
        info!("Loaded clip with {} frames at {} fps", images.len(), config.fps);
        Self::new(images, config)
    }

    /// Number of frames in the clip
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn normalize_time(&self, time_secs: f64) -> Result<f64, CaptureError> {
        let duration = self.duration_secs();
        if !time_secs.is_finite() || time_secs < 0.0 {
            return Err(CaptureError::InvalidTime(time_secs));
        }
        if time_secs < duration {
            Ok(time_secs)
        } else if self.config.looping {
            Ok(time_secs % duration)
        } else {
            Err(CaptureError::InvalidTime(time_secs))
        }
    }

    fn frame_at(&self, time_secs: f64) -> &SourceFrame {
        let index = (time_secs * self.config.fps).floor() as usize;
        &self.frames[index.min(self.frames.len() - 1)]
    }
}

impl SeekableSource for FrameSequence {
    async fn seek(&mut self, time_secs: f64) -> Result<SourceFrame, CaptureError> {
        let position = self.normalize_time(time_secs)?;
        self.position_secs = position;
        let mut frame = self.frame_at(position).clone();
        frame.position_secs = position;
        Ok(frame)
    }

    fn duration_secs(&self) -> f64 {
        self.frames.len() as f64 / self.config.fps
    }

    fn position_secs(&self) -> f64 {
        self.position_secs
    }
}

impl FrameSource for FrameSequence {
    fn poll_frame(&mut self, elapsed: Duration) -> Option<&SourceFrame> {
        let next = self.position_secs + elapsed.as_secs_f64();
        let duration = self.duration_secs();
        self.position_secs = if next < duration {
            next
        } else if self.config.looping {
            next % duration
        } else {
            // Hold the last frame once a one-shot clip has finished
            (duration - 0.5 / self.config.fps).max(0.0)
        };
        Some(self.frame_at(self.position_secs))
    }
}
