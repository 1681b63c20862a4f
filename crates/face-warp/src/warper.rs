//! Frame composition through a cached triangulation

use crate::{TriangleAffine, Triangulation, WarpError};
use face_landmarks::Landmark;
use image::imageops;
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::Projection;
use tracing::{debug, info, warn};
use video_io::fit_image;

type Point = (f64, f64);

/// Slack on the point-in-triangle test so shared edges are painted by both sides
const EDGE_EPSILON: f64 = 1e-6;

/// What the last [`ImageWarper::warp_frame`] call produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarpOutcome {
    /// Piecewise-affine composition
    Warped { triangles: usize, skipped: usize },
    /// Landmarks were empty or of unequal length; source copied through
    Passthrough,
    /// The warp failed internally; source copied through
    Fallback,
}

/// Owns the output canvas and the triangulation cache.
///
/// The triangulation depends on surface size, so it is rebuilt only after
/// [`resize`](Self::resize) or when the landmark count changes.
pub struct ImageWarper {
    canvas: RgbImage,
    triangulation: Option<Triangulation>,
    builds: u64,
    last_outcome: WarpOutcome,
}

impl ImageWarper {
    pub fn new(width: u32, height: u32) -> Self {
        info!("Creating image warper {}x{}", width, height);
        Self {
            canvas: RgbImage::new(width, height),
            triangulation: None,
            builds: 0,
            last_outcome: WarpOutcome::Passthrough,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    /// Change the output size and drop the cached triangulation
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.canvas.dimensions() != (width, height) {
            info!("Resizing warper to {}x{}", width, height);
            self.canvas = RgbImage::new(width, height);
        }
        self.triangulation = None;
    }

    /// How many times the triangulation has been computed
    pub fn triangulation_builds(&self) -> u64 {
        self.builds
    }

    pub fn last_outcome(&self) -> WarpOutcome {
        self.last_outcome
    }

    /// The most recently composed frame
    pub fn frame(&self) -> &RgbImage {
        &self.canvas
    }

    /// Compose `source` deformed from `source_landmarks` toward
    /// `target_landmarks` by `progress` (0 = undeformed, 1 = full target).
    ///
    /// Never fails: unusable landmarks or an internal error yield the
    /// unmodified source frame.
    pub fn warp_frame(
        &mut self,
        source: &RgbImage,
        source_landmarks: &[Landmark],
        target_landmarks: &[Landmark],
        progress: f32,
    ) -> &RgbImage {
        let (width, height) = self.canvas.dimensions();
        let source = fit_image(source, width, height);

        if source_landmarks.is_empty() || source_landmarks.len() != target_landmarks.len() {
            debug!(
                "Passthrough: {} source vs {} target landmarks",
                source_landmarks.len(),
                target_landmarks.len()
            );
            self.canvas.copy_from_slice(source.as_raw());
            self.last_outcome = WarpOutcome::Passthrough;
            return &self.canvas;
        }

        self.last_outcome = match self.compose(&source, source_landmarks, target_landmarks, progress) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Warp failed, drawing source frame: {}", e);
                self.canvas.copy_from_slice(source.as_raw());
                WarpOutcome::Fallback
            }
        };
        &self.canvas
    }

    fn compose(
        &mut self,
        source: &RgbImage,
        source_landmarks: &[Landmark],
        target_landmarks: &[Landmark],
        progress: f32,
    ) -> Result<WarpOutcome, WarpError> {
        let (width, height) = self.canvas.dimensions();
        if width == 0 || height == 0 {
            return Err(WarpError::EmptySurface { width, height });
        }

        let t = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let src_px = to_pixels(source_landmarks.iter().copied(), width, height)?;
        let dst_px = to_pixels(
            source_landmarks
                .iter()
                .zip(target_landmarks)
                .map(|(&s, &g)| s.lerp(g, t)),
            width,
            height,
        )?;

        let stale = self
            .triangulation
            .as_ref()
            .map_or(true, |tri| tri.point_count() != src_px.len());
        if stale {
            self.triangulation = Some(Triangulation::build(&src_px));
            self.builds += 1;
            debug!("Triangulation rebuilt (build #{})", self.builds);
        }
        let Some(triangulation) = self.triangulation.as_ref() else {
            return Err(WarpError::EmptySurface { width, height });
        };

        self.canvas.copy_from_slice(source.as_raw());

        let mut drawn = 0;
        let mut skipped = 0;
        for &[a, b, c] in triangulation.triangles() {
            for index in [a, b, c] {
                if index >= src_px.len() || index >= dst_px.len() {
                    return Err(WarpError::VertexOutOfRange {
                        index,
                        len: src_px.len().min(dst_px.len()),
                    });
                }
            }

            let src_tri = [src_px[a], src_px[b], src_px[c]];
            let dst_tri = [dst_px[a], dst_px[b], dst_px[c]];
            let Some(inverse) =
                TriangleAffine::solve(src_tri, dst_tri).and_then(|t| t.inverse_projection())
            else {
                skipped += 1;
                continue;
            };

            fill_triangle(&mut self.canvas, source, dst_tri, &inverse);
            drawn += 1;
        }

        Ok(WarpOutcome::Warped {
            triangles: drawn,
            skipped,
        })
    }
}

/// Denormalize landmarks and append the four surface corners
fn to_pixels(
    landmarks: impl Iterator<Item = Landmark>,
    width: u32,
    height: u32,
) -> Result<Vec<Point>, WarpError> {
    let (w, h) = (width as f64, height as f64);
    let mut points = Vec::with_capacity(landmarks.size_hint().0 + 4);
    for (i, landmark) in landmarks.enumerate() {
        let (x, y) = landmark.to_pixel(width, height);
        if !x.is_finite() || !y.is_finite() {
            return Err(WarpError::NonFinite(i));
        }
        points.push((x, y));
    }
    points.extend([(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]);
    Ok(points)
}

fn edge(a: Point, b: Point, p: Point) -> f64 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

/// Paint the destination triangle by sampling `source` through `inverse`
fn fill_triangle(canvas: &mut RgbImage, source: &RgbImage, dst: [Point; 3], inverse: &Projection) {
    let (width, height) = canvas.dimensions();
    let [a, b, c] = dst;

    let min_x = a.0.min(b.0).min(c.0).floor().max(0.0);
    let min_y = a.1.min(b.1).min(c.1).floor().max(0.0);
    let max_x = a.0.max(b.0).max(c.0).ceil().min((width - 1) as f64);
    let max_y = a.1.max(b.1).max(c.1).ceil().min((height - 1) as f64);
    if min_x > max_x || min_y > max_y {
        return;
    }

    for py in min_y as u32..=max_y as u32 {
        for px in min_x as u32..=max_x as u32 {
            let p = (px as f64, py as f64);
            let (e0, e1, e2) = (edge(a, b, p), edge(b, c, p), edge(c, a, p));
            let inside = (e0 >= -EDGE_EPSILON && e1 >= -EDGE_EPSILON && e2 >= -EDGE_EPSILON)
                || (e0 <= EDGE_EPSILON && e1 <= EDGE_EPSILON && e2 <= EDGE_EPSILON);
            if !inside {
                continue;
            }
            let (sx, sy) = *inverse * (px as f32, py as f32);
            canvas.put_pixel(px, py, sample(source, sx, sy));
        }
    }
}

/// Bilinear sample, clamping to the nearest edge pixel outside the frame
fn sample(source: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    imageops::interpolate_bilinear(source, x, y).unwrap_or_else(|| {
        let cx = x.round().clamp(0.0, (source.width() - 1) as f32) as u32;
        let cy = y.round().clamp(0.0, (source.height() - 1) as f32) as u32;
        *source.get_pixel(cx, cy)
    })
}
