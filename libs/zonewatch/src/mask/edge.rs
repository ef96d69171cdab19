use image::GrayImage;
use imageproc::edges::canny;

use super::{dilate_square, MaskGenerator};

/// Zone = band around detected boundaries rather than a filled region.
#[derive(Clone, Debug)]
pub struct EdgeMask {
    pub low_threshold: f32,
    pub high_threshold: f32,
    pub dilation_width: u32,
}

impl EdgeMask {
    pub fn new(low_threshold: f32, high_threshold: f32, dilation_width: u32) -> Self {
        Self {
            low_threshold,
            high_threshold,
            dilation_width,
        }
    }
}

impl MaskGenerator for EdgeMask {
    fn name(&self) -> &'static str {
        "edge"
    }

    fn generate(&self, base: &GrayImage) -> GrayImage {
        let edges = canny(base, self.low_threshold, self.high_threshold);
        dilate_square(&edges, self.dilation_width)
    }
}
