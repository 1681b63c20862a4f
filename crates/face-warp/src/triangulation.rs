//! Delaunay triangulation (Bowyer-Watson)

use tracing::debug;

type Point = (f64, f64);

/// Squared distance under which two points count as the same vertex
const DUPLICATE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
struct Circumcircle {
    cx: f64,
    cy: f64,
    radius_sq: f64,
}

impl Circumcircle {
    fn of(a: Point, b: Point, c: Point) -> Self {
        let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
        if d.abs() < f64::EPSILON {
            // Collinear: contains everything so the triangle is replaced later
            return Self {
                cx: 0.0,
                cy: 0.0,
                radius_sq: f64::INFINITY,
            };
        }

        let a2 = a.0 * a.0 + a.1 * a.1;
        let b2 = b.0 * b.0 + b.1 * b.1;
        let c2 = c.0 * c.0 + c.1 * c.1;
        let cx = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
        let cy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;
        let radius_sq = (a.0 - cx).powi(2) + (a.1 - cy).powi(2);

        Self { cx, cy, radius_sq }
    }

    fn contains(&self, p: Point) -> bool {
        (p.0 - self.cx).powi(2) + (p.1 - self.cy).powi(2) < self.radius_sq
    }
}

#[derive(Debug, Clone, Copy)]
struct Working {
    vertices: [usize; 3],
    circle: Circumcircle,
}

/// Delaunay triangulation of a point layout, as index triples into it
#[derive(Debug, Clone, Default)]
pub struct Triangulation {
    triangles: Vec<[usize; 3]>,
    point_count: usize,
}

impl Triangulation {
    /// Triangulate `points`.
    ///
    /// Coincident points are inserted once; later duplicates appear in no
    /// triangle.
    pub fn build(points: &[Point]) -> Self {
        let n = points.len();
        if n < 3 {
            return Self {
                triangles: Vec::new(),
                point_count: n,
            };
        }

        let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
        let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
        for &(x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let span = (max_x - min_x).max(max_y - min_y).max(1.0);
        let (mid_x, mid_y) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);

        // Super-triangle enclosing every point; its vertices live past the input
        let mut vertices = points.to_vec();
        vertices.push((mid_x - 20.0 * span, mid_y - span));
        vertices.push((mid_x, mid_y + 20.0 * span));
        vertices.push((mid_x + 20.0 * span, mid_y - span));

        let mut triangles = vec![Working {
            vertices: [n, n + 1, n + 2],
            circle: Circumcircle::of(vertices[n], vertices[n + 1], vertices[n + 2]),
        }];

        let mut inserted: Vec<usize> = Vec::with_capacity(n);
        let mut duplicates = 0usize;

        for i in 0..n {
            let p = vertices[i];
            let is_duplicate = inserted.iter().any(|&j| {
                let q = vertices[j];
                (p.0 - q.0).powi(2) + (p.1 - q.1).powi(2) < DUPLICATE_EPSILON
            });
            if is_duplicate {
                duplicates += 1;
                continue;
            }
            inserted.push(i);

            let (bad, good): (Vec<Working>, Vec<Working>) =
                triangles.into_iter().partition(|t| t.circle.contains(p));
            triangles = good;

            // Cavity boundary: edges owned by exactly one removed triangle
            let mut edges: Vec<(usize, usize)> = Vec::with_capacity(bad.len() * 3);
            for t in &bad {
                let [a, b, c] = t.vertices;
                edges.extend([(a, b), (b, c), (c, a)]);
            }
            let shared = |e: &(usize, usize), f: &(usize, usize)| {
                (e.0 == f.0 && e.1 == f.1) || (e.0 == f.1 && e.1 == f.0)
            };
            for (k, edge) in edges.iter().enumerate() {
                let on_boundary = edges
                    .iter()
                    .enumerate()
                    .all(|(m, other)| m == k || !shared(edge, other));
                if on_boundary {
                    triangles.push(Working {
                        vertices: [edge.0, edge.1, i],
                        circle: Circumcircle::of(vertices[edge.0], vertices[edge.1], p),
                    });
                }
            }
        }

        let triangles: Vec<[usize; 3]> = triangles
            .into_iter()
            .map(|t| t.vertices)
            .filter(|v| v.iter().all(|&idx| idx < n))
            .collect();

        debug!(
            "Triangulated {} points into {} triangles ({} duplicates)",
            n,
            triangles.len(),
            duplicates
        );

        Self {
            triangles,
            point_count: n,
        }
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Number of points the triangulation was built over
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}
