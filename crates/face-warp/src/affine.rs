//! Per-triangle affine transforms

use imageproc::geometric_transformations::Projection;

type Point = (f64, f64);

/// Affine map carrying a source triangle onto a destination triangle.
///
/// Stored row-major as `x' = a*x + b*y + c`, `y' = d*x + e*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleAffine {
    coefficients: [f64; 6],
}

impl TriangleAffine {
    /// Edge-matrix determinants below this (in pixel²) are treated as degenerate
    pub const MIN_DETERMINANT: f64 = 1e-6;

    /// Solve `T(src[k]) = dst[k]` for the three vertices.
    ///
    /// Inverts the 2x2 matrix of the source triangle's two edge vectors.
    /// Returns `None` when either triangle is degenerate.
    pub fn solve(src: [Point; 3], dst: [Point; 3]) -> Option<Self> {
        let [s0, s1, s2] = src;
        let [d0, d1, d2] = dst;

        // Edge vectors from vertex 0
        let (sx1, sy1) = (s1.0 - s0.0, s1.1 - s0.1);
        let (sx2, sy2) = (s2.0 - s0.0, s2.1 - s0.1);
        let (dx1, dy1) = (d1.0 - d0.0, d1.1 - d0.1);
        let (dx2, dy2) = (d2.0 - d0.0, d2.1 - d0.1);

        let det = sx1 * sy2 - sx2 * sy1;
        if det.abs() < Self::MIN_DETERMINANT {
            return None;
        }
        // A flattened destination covers no pixels
        if (dx1 * dy2 - dx2 * dy1).abs() < Self::MIN_DETERMINANT {
            return None;
        }

        // Linear part: D * S^-1, with S^-1 = [[sy2, -sx2], [-sy1, sx1]] / det
        let a = (dx1 * sy2 - dx2 * sy1) / det;
        let b = (dx2 * sx1 - dx1 * sx2) / det;
        let d = (dy1 * sy2 - dy2 * sy1) / det;
        let e = (dy2 * sx1 - dy1 * sx2) / det;

        let c = d0.0 - (a * s0.0 + b * s0.1);
        let f = d0.1 - (d * s0.0 + e * s0.1);

        Some(Self {
            coefficients: [a, b, c, d, e, f],
        })
    }

    /// Map a source point to its destination position
    pub fn apply(&self, (x, y): Point) -> Point {
        let [a, b, c, d, e, f] = self.coefficients;
        (a * x + b * y + c, d * x + e * y + f)
    }

    /// Row-major 3x3 homogeneous matrix
    pub fn matrix(&self) -> [f32; 9] {
        let [a, b, c, d, e, f] = self.coefficients.map(|v| v as f32);
        [a, b, c, d, e, f, 0.0, 0.0, 1.0]
    }

    /// Destination-to-source mapping used to sample the source frame
    pub fn inverse_projection(&self) -> Option<Projection> {
        Projection::from_matrix(self.matrix()).map(Projection::invert)
    }
}
