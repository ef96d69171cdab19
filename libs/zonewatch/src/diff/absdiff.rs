use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

use super::{ChangeSignal, DiffEngine};
use crate::error::Result;

/// Per-pixel absolute difference, optionally blurred, binarized at
/// `threshold` (strictly greater counts as changed).
#[derive(Clone, Debug)]
pub struct AbsDiffEngine {
    pub threshold: u8,
    pub blur_sigma: Option<f32>,
}

impl AbsDiffEngine {
    pub fn new(threshold: u8, blur_sigma: Option<f32>) -> Self {
        Self {
            threshold,
            blur_sigma,
        }
    }
}

fn absolute_difference(base: &GrayImage, test: &GrayImage) -> GrayImage {
    GrayImage::from_fn(base.width(), base.height(), |x, y| {
        Luma([base.get_pixel(x, y)[0].abs_diff(test.get_pixel(x, y)[0])])
    })
}

impl DiffEngine for AbsDiffEngine {
    fn name(&self) -> &'static str {
        "absdiff"
    }

    fn compute(&self, base: &GrayImage, test: &GrayImage) -> Result<ChangeSignal> {
        let mut diff = absolute_difference(base, test);
        if let Some(sigma) = self.blur_sigma.filter(|s| *s > 0.0) {
            diff = gaussian_blur_f32(&diff, sigma);
        }
        let threshold = self.threshold;
        Ok(ChangeSignal::new(crate::mask::binarize(&diff, |v| v > threshold)))
    }
}
