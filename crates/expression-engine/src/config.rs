//! Engine configuration

use crate::EngineError;
use emotion_delta::{FileStore, SnapshotFormat};
use face_landmarks::ExtractorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment prefix for overrides, e.g. `EXPRESSION__RENDER__FPS=24`
pub const ENV_PREFIX: &str = "EXPRESSION";

/// Output surface size
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
        }
    }
}

impl SurfaceConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::InvalidSurface {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Render loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Cycles per second (default: 30.0)
    pub fps: f64,
    /// Progress added per cycle while a transition is running
    pub ramp_step: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            ramp_step: 0.05,
        }
    }
}

impl RenderConfig {
    /// Slow ramp (about 1.3s at 30 fps)
    pub fn gentle() -> Self {
        Self {
            ramp_step: 0.025,
            ..Default::default()
        }
    }

    /// Fast ramp (about 0.3s at 30 fps)
    pub fn snappy() -> Self {
        Self {
            ramp_step: 0.1,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(EngineError::InvalidRate(self.fps));
        }
        if !(self.ramp_step.is_finite() && self.ramp_step > 0.0) {
            return Err(EngineError::InvalidRamp(self.ramp_step));
        }
        Ok(())
    }

    /// Time between cycles
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps)
    }

    /// Cycles a full transition takes
    pub fn ramp_cycles(&self) -> u32 {
        (1.0 / self.ramp_step).ceil() as u32
    }
}

/// Delta snapshot location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Snapshot file; no persistence when unset
    pub path: Option<PathBuf>,
    pub format: SnapshotFormat,
}

impl StoreConfig {
    pub fn open(&self) -> Option<FileStore> {
        self.path
            .as_ref()
            .map(|path| FileStore::new(path, self.format))
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub surface: SurfaceConfig,
    pub render: RenderConfig,
    pub extraction: ExtractorConfig,
    pub store: StoreConfig,
}

impl EngineConfig {
    /// Load from an optional config file, then `EXPRESSION__*` environment
    /// overrides, on top of the defaults
    pub fn load(path: Option<&Path>) -> Result<Self, EngineError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        let config: EngineConfig = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.surface.validate()?;
        config.render.validate()?;
        Ok(config)
    }
}
