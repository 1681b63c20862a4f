//! Expression Engine
//!
//! Deforms a live idle feed toward a requested emotion:
//! - Startup extraction of the neutral baseline and per-emotion deltas
//! - Transition state with a fixed per-cycle ramp
//! - Fixed-rate render loop composing frames through the warper
//! - Injectable observability and file/env configuration

pub mod config;
pub mod controller;
pub mod observer;
pub mod startup;
pub mod target;
pub mod transition;

pub use config::{EngineConfig, RenderConfig, StoreConfig, SurfaceConfig};
pub use controller::{CycleOutcome, ExpressionController, PassthroughReason, RunSummary};
pub use observer::{MetricsObserver, NoopObserver, RenderObserver};
pub use startup::{initialize, ClipSource, StartupReport};
pub use target::{describe, ExpressionTarget, KNOWN_EMOTIONS, NEUTRAL};
pub use transition::TransitionState;

use emotion_delta::DeltaError;
use face_landmarks::ExtractError;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Engine error types
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Landmark extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Delta table error: {0}")]
    Delta(#[from] DeltaError),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid render rate: {0} fps")]
    InvalidRate(f64),

    #[error("Invalid ramp step: {0}")]
    InvalidRamp(f32),

    #[error("Invalid surface size: {width}x{height}")]
    InvalidSurface { width: u32, height: u32 },
}

/// Install the global tracing subscriber
pub fn init_logging(verbose: bool) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
