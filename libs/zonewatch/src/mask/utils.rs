use image::{GrayImage, Luma};
use imageproc::morphology::{grayscale_dilate, Mask};

use crate::error::{DetectionError, Result};
use crate::normalize::resize_area;

/// Largest structuring element side `imageproc` can build a mask for.
pub const MAX_DILATION_WIDTH: u32 = 511;

/// 255 where `predicate` holds for the sample, 0 elsewhere.
pub fn binarize(gray: &GrayImage, predicate: impl Fn(u8) -> bool) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([if predicate(gray.get_pixel(x, y)[0]) { 255 } else { 0 }])
    })
}

/// Dilates with a `width` x `width` square anchored at `width / 2`, applied
/// as a row pass followed by a column pass.
pub fn dilate_square(mask: &GrayImage, width: u32) -> GrayImage {
    let binary = binarize(mask, |v| v > 0);
    let width = width.min(MAX_DILATION_WIDTH);
    if width <= 1 {
        return binary;
    }

    let anchor = (width / 2) as u8;
    let row = Mask::from_image(&GrayImage::from_pixel(width, 1, Luma([255])), anchor, 0);
    let column = Mask::from_image(&GrayImage::from_pixel(1, width, Luma([255])), 0, anchor);
    grayscale_dilate(&grayscale_dilate(&binary, &row), &column)
}

pub fn active_pixels(mask: &GrayImage) -> u64 {
    mask.as_raw().iter().filter(|&&v| v > 0).count() as u64
}

/// Brings a mask to `width` x `height`. Any cell the resampled mask still
/// touches stays in the zone.
pub fn reconcile_mask(mask: &GrayImage, width: u32, height: u32) -> Result<GrayImage> {
    if mask.dimensions() == (width, height) {
        return Ok(binarize(mask, |v| v > 0));
    }
    log::debug!(
        "Resizing mask from {}x{} to {}x{}",
        mask.width(),
        mask.height(),
        width,
        height
    );
    Ok(binarize(&resize_area(mask, width, height)?, |v| v > 0))
}

/// Decodes a previously stored mask; gray levels from lossy storage are
/// folded back to 0/255.
pub fn decode_mask(bytes: &[u8]) -> Result<GrayImage> {
    let image = image::load_from_memory(bytes).map_err(|source| DetectionError::Decode {
        input: "mask",
        source,
    })?;
    Ok(binarize(&image.to_luma8(), |v| v >= 128))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_dot(size: u32, at: (u32, u32)) -> GrayImage {
        let mut mask = GrayImage::new(size, size);
        mask.put_pixel(at.0, at.1, Luma([255]));
        mask
    }

    #[test]
    fn test_dilate_square_builds_square() {
        let dilated = dilate_square(&single_dot(21, (10, 10)), 5);
        assert_eq!(active_pixels(&dilated), 25);
        assert_eq!(dilated.get_pixel(8, 8)[0], 255);
        assert_eq!(dilated.get_pixel(12, 12)[0], 255);
        assert_eq!(dilated.get_pixel(13, 10)[0], 0);
    }

    #[test]
    fn test_dilate_square_even_widths() {
        let dilated = dilate_square(&single_dot(9, (4, 4)), 2);
        assert_eq!(active_pixels(&dilated), 4);
        assert_eq!(dilated.get_pixel(4, 4)[0], 255);
        assert_eq!(dilated.get_pixel(5, 5)[0], 255);
        assert_eq!(dilated.get_pixel(3, 3)[0], 0);

        let dilated = dilate_square(&single_dot(101, (50, 50)), 50);
        assert_eq!(active_pixels(&dilated), 50 * 50);
        assert_eq!(dilated.get_pixel(26, 26)[0], 255);
        assert_eq!(dilated.get_pixel(75, 75)[0], 255);
        assert_eq!(dilated.get_pixel(25, 50)[0], 0);
        assert_eq!(dilated.get_pixel(76, 50)[0], 0);
    }

    #[test]
    fn test_dilate_square_widest_element() {
        let dilated = dilate_square(&single_dot(600, (300, 300)), MAX_DILATION_WIDTH);
        assert_eq!(active_pixels(&dilated), 511 * 511);
    }

    #[test]
    fn test_dilate_square_width_one_is_identity() {
        let dot = single_dot(9, (4, 4));
        assert_eq!(dilate_square(&dot, 1), dot);
        assert_eq!(dilate_square(&dot, 0), dot);
    }

    #[test]
    fn test_dilation_is_monotonic_in_width() {
        let dot = single_dot(61, (30, 30));
        let mut previous = 0;
        for width in [0, 1, 3, 10, 25, 50] {
            let count = active_pixels(&dilate_square(&dot, width));
            assert!(count >= previous, "width {} shrank the mask", width);
            previous = count;
        }
    }

    #[test]
    fn test_reconcile_mask_stays_binary() {
        let mask = dilate_square(&single_dot(40, (20, 20)), 7);
        let reconciled = reconcile_mask(&mask, 13, 17).unwrap();
        assert_eq!(reconciled.dimensions(), (13, 17));
        assert!(reconciled.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert!(active_pixels(&reconciled) > 0);
    }

    #[test]
    fn test_decode_mask_rebinarizes() {
        let gray = GrayImage::from_fn(4, 1, |x, _| Luma([[0, 100, 160, 255][x as usize]]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(gray)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let mask = decode_mask(&bytes).unwrap();
        let values: Vec<u8> = mask.pixels().map(|p| p[0]).collect();
        assert_eq!(values, vec![0, 0, 255, 255]);
    }
}
