//! Face Warping
//!
//! Piecewise-affine image deformation driven by landmark sets:
//! - Delaunay triangulation over a landmark layout plus the canvas corners
//! - Per-triangle affine solve with degenerate-triangle rejection
//! - Frame composition with a cached triangulation and passthrough fallback

mod affine;
mod triangulation;
mod warper;

pub use affine::TriangleAffine;
pub use triangulation::Triangulation;
pub use warper::{ImageWarper, WarpOutcome};

use thiserror::Error;

/// Errors raised inside a warp pass (always recovered by [`ImageWarper`])
#[derive(Debug, Error)]
pub enum WarpError {
    #[error("Triangle vertex {index} out of range for {len} points")]
    VertexOutOfRange { index: usize, len: usize },
    #[error("Non-finite landmark coordinate at index {0}")]
    NonFinite(usize),
    #[error("Surface has zero area ({width}x{height})")]
    EmptySurface { width: u32, height: u32 },
}
