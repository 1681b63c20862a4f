//! Frame I/O for the Expression Warp Pipeline
//!
//! Provides the frame plumbing shared by every stage:
//! - Decoded RGB frames carrying an explicit playback position
//! - Seekable reference clips (one neutral clip plus one per emotion)
//! - Live idle feeds polled once per render cycle
//! - Output surfaces the composed frame is presented on

pub mod frame;
pub mod source;

pub use frame::{fit_image, OutputSurface, SourceFrame};
pub use source::{FrameSequence, FrameSource, SeekableSource};

use thiserror::Error;

/// Frame I/O error types
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Clip contains no frames")]
    EmptyClip,

    #[error("Seek position {0}s is outside the clip")]
    InvalidTime(f64),

    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(f64),
}

/// Playback configuration for an in-memory clip
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    /// Frames per second of the decoded clip
    pub fps: f64,
    /// Wrap playback and seeks around the clip end
    pub looping: bool,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            looping: true,
        }
    }
}

impl SequenceConfig {
    /// Short looping idle clip played as the live feed
    pub fn idle_loop(fps: f64) -> Self {
        Self { fps, looping: true }
    }

    /// Reference clip sampled once during startup
    pub fn reference(fps: f64) -> Self {
        Self { fps, looping: false }
    }
}
