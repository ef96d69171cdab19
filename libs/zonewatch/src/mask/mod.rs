mod types;
pub use types::MaskStrategyKind;

mod utils;
pub use utils::{active_pixels, binarize, decode_mask, dilate_square, reconcile_mask, MAX_DILATION_WIDTH};

mod intensity;
pub use intensity::IntensityThresholdMask;

mod edge;
pub use edge::EdgeMask;

use image::GrayImage;

/// Derives the protected-zone mask from a base image. Output cells are
/// always exactly 0 or 255.
pub trait MaskGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    fn generate(&self, base: &GrayImage) -> GrayImage;
}
