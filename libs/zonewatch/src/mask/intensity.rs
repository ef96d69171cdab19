use image::GrayImage;

use super::{binarize, dilate_square, MaskGenerator};

/// Zone = samples darker than `threshold` (water bodies and other dark
/// regions), grown by `dilation_width` into a safety buffer.
#[derive(Clone, Debug)]
pub struct IntensityThresholdMask {
    pub threshold: u8,
    pub dilation_width: u32,
}

impl IntensityThresholdMask {
    pub fn new(threshold: u8, dilation_width: u32) -> Self {
        Self {
            threshold,
            dilation_width,
        }
    }
}

impl MaskGenerator for IntensityThresholdMask {
    fn name(&self) -> &'static str {
        "intensity"
    }

    fn generate(&self, base: &GrayImage) -> GrayImage {
        let threshold = self.threshold;
        let region = binarize(base, |v| v < threshold);
        dilate_square(&region, self.dilation_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::active_pixels;
    use image::Luma;

    #[test]
    fn test_dark_image_is_all_zone() {
        let base = GrayImage::from_pixel(100, 100, Luma([50]));
        let mask = IntensityThresholdMask::new(100, 50).generate(&base);
        assert_eq!(active_pixels(&mask), 10_000);
    }

    #[test]
    fn test_bright_image_has_no_zone() {
        let base = GrayImage::from_pixel(64, 64, Luma([200]));
        let mask = IntensityThresholdMask::new(100, 50).generate(&base);
        assert_eq!(active_pixels(&mask), 0);
    }

    #[test]
    fn test_threshold_value_itself_is_background() {
        let base = GrayImage::from_pixel(8, 8, Luma([100]));
        let mask = IntensityThresholdMask::new(100, 0).generate(&base);
        assert_eq!(active_pixels(&mask), 0);
    }

    #[test]
    fn test_buffer_grows_dark_strip() {
        // dark vertical strip in columns 45..55 of a bright image
        let base = GrayImage::from_fn(100, 100, |x, _| Luma([if (45..55).contains(&x) { 20 } else { 220 }]));
        let raw = IntensityThresholdMask::new(100, 0).generate(&base);
        let buffered = IntensityThresholdMask::new(100, 21).generate(&base);
        assert_eq!(active_pixels(&raw), 1_000);
        // 10 columns plus 10 on each side
        assert_eq!(active_pixels(&buffered), 3_000);
        assert!(buffered.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }
}
