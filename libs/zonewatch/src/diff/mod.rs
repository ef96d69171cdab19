mod types;
pub use types::{ChangeSignal, DiffStrategyKind};

mod utils;
pub use utils::extract_regions;

mod absdiff;
pub use absdiff::AbsDiffEngine;

mod ssim;
pub use ssim::{ssim_map, SsimEngine};

use image::GrayImage;

use crate::error::Result;

/// Computes a change signal between two normalized grayscale grids of equal
/// size. Identical inputs always give an all-zero signal.
pub trait DiffEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn compute(&self, base: &GrayImage, test: &GrayImage) -> Result<ChangeSignal>;
}
