//! Frame types and output surfaces

use image::imageops::{self, FilterType};
use image::RgbImage;
use std::borrow::Cow;

/// Decoded RGB frame together with its position in the clip
#[derive(Debug, Clone)]
pub struct SourceFrame {
    /// RGB pixels
    pub image: RgbImage,
    /// Playback position of this frame (seconds from clip start)
    pub position_secs: f64,
    /// Frame sequence number within the clip
    pub sequence: u32,
}

impl SourceFrame {
    /// Wrap a decoded image
    pub fn new(image: RgbImage, position_secs: f64, sequence: u32) -> Self {
        Self {
            image,
            position_secs,
            sequence,
        }
    }
}

/// Borrow `image` at the requested size, scaling only when needed
pub fn fit_image(image: &RgbImage, width: u32, height: u32) -> Cow<'_, RgbImage> {
    if image.dimensions() == (width, height) {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(imageops::resize(image, width, height, FilterType::Triangle))
    }
}

/// Caller-owned surface the composed frame is written to every cycle
pub trait OutputSurface {
    /// Fixed surface size in pixels
    fn dimensions(&self) -> (u32, u32);

    /// Replace the surface contents with `frame`
    fn present(&mut self, frame: &RgbImage);
}

impl OutputSurface for RgbImage {
    fn dimensions(&self) -> (u32, u32) {
        RgbImage::dimensions(self)
    }

    fn present(&mut self, frame: &RgbImage) {
        let (width, height) = RgbImage::dimensions(self);
        match fit_image(frame, width, height) {
            Cow::Borrowed(frame) => self.copy_from_slice(frame.as_raw()),
            Cow::Owned(scaled) => *self = scaled,
        }
    }
}
