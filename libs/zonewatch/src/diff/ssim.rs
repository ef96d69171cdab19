use image::{GrayImage, Luma};
use image_compare::prelude::GraySimilarityImage;
use image_compare::{Algorithm, SimilarityImage};

use super::{extract_regions, ChangeSignal, DiffEngine};
use crate::error::{DetectionError, Result};

/// Structural dissimilarity: `(1 - ssim) * 255` per pixel, binarized at
/// `threshold`, with the outer contours of the result boxed as regions.
#[derive(Clone, Debug)]
pub struct SsimEngine {
    pub threshold: u8,
}

impl SsimEngine {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }
}

/// Local SSIM for every pixel, taken from the 8x8 window it falls in. Same
/// size as the inputs, 1.0 where they are identical.
pub fn ssim_map(base: &GrayImage, test: &GrayImage) -> Result<GraySimilarityImage> {
    let similarity = image_compare::gray_similarity_structure(&Algorithm::MSSIMSimple, base, test)
        .map_err(|e| DetectionError::Processing(format!("SSIM calculation failed: {:?}", e)))?;
    log::debug!("Mean SSIM {:.4}", similarity.score);

    match similarity.image {
        SimilarityImage::Gray(map) => Ok(map),
        _ => Err(DetectionError::Processing(
            "SSIM map is not single channel".to_string(),
        )),
    }
}

impl DiffEngine for SsimEngine {
    fn name(&self) -> &'static str {
        "ssim"
    }

    fn compute(&self, base: &GrayImage, test: &GrayImage) -> Result<ChangeSignal> {
        let map = ssim_map(base, test)?;

        let threshold = self.threshold as f32;
        let mask = GrayImage::from_fn(base.width(), base.height(), |x, y| {
            let score = map.get_pixel(x, y)[0];
            let dissimilarity = ((1.0 - score.clamp(0.0, 1.0)) * 255.0).round();
            Luma([if dissimilarity > threshold { 255 } else { 0 }])
        });

        let regions = extract_regions(&mask);
        Ok(ChangeSignal { mask, regions })
    }
}
