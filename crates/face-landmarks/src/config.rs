//! Extraction configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Landmark extractor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Maximum wait for a seek to produce a decodable frame (milliseconds)
    pub seek_timeout_ms: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            seek_timeout_ms: 5000,
        }
    }
}

impl ExtractorConfig {
    /// Create strict config for local, already-decoded clips
    pub fn strict() -> Self {
        Self {
            seek_timeout_ms: 1000,
        }
    }

    /// Create lenient config for slow storage or remote clips
    pub fn lenient() -> Self {
        Self {
            seek_timeout_ms: 15000,
        }
    }

    pub fn seek_timeout(&self) -> Duration {
        Duration::from_millis(self.seek_timeout_ms)
    }
}

/// A reference clip to sample, with its caller-side offset policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceClip {
    /// Emotion name (or "neutral" for the baseline clip)
    pub name: String,

    /// Timestamp sampled from the clip, e.g. past a neutral-to-emotion ramp
    #[serde(default)]
    pub offset_secs: f64,
}

impl ReferenceClip {
    pub fn new(name: impl Into<String>, offset_secs: f64) -> Self {
        Self {
            name: name.into(),
            offset_secs,
        }
    }
}
