//! Normalized facial landmark points

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub};

/// Point count of a face-mesh detector configuration
pub const FACE_MESH_LANDMARKS: usize = 468;

/// One facial landmark in normalized coordinates.
///
/// `x` and `y` are fractions of the frame width and height; `z` is relative
/// depth as reported by the detector. The same type also carries per-point
/// displacements (deltas), which are differences of two landmarks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Linear interpolation toward `target` (`t = 0` is `self`, `t = 1` is `target`)
    pub fn lerp(self, target: Landmark, t: f32) -> Landmark {
        self + (target - self) * t
    }

    /// Pixel position on a surface of the given size
    pub fn to_pixel(self, width: u32, height: u32) -> (f64, f64) {
        (self.x as f64 * width as f64, self.y as f64 * height as f64)
    }
}

impl Add for Landmark {
    type Output = Landmark;

    fn add(self, rhs: Landmark) -> Landmark {
        Landmark::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Landmark {
    fn add_assign(&mut self, rhs: Landmark) {
        *self = *self + rhs;
    }
}

impl Sub for Landmark {
    type Output = Landmark;

    fn sub(self, rhs: Landmark) -> Landmark {
        Landmark::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Landmark {
    type Output = Landmark;

    fn mul(self, scale: f32) -> Landmark {
        Landmark::new(self.x * scale, self.y * scale, self.z * scale)
    }
}
