use image::error::{ImageError, ParameterError, ParameterErrorKind};
use fast_image_resize::{images::Image as FirImage, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GenericImageView, GrayImage, ImageBuffer, Pixel, RgbImage};

use crate::error::{DetectionError, Result};

/// Base and test images reduced to a common size. `base` keeps colour for
/// annotated output; the grayscale grids feed the mask and diff strategies.
#[derive(Clone, Debug)]
pub struct NormalizedPair {
    pub base: RgbImage,
    pub base_gray: GrayImage,
    pub test_gray: GrayImage,
}

impl NormalizedPair {
    pub fn dimensions(&self) -> (u32, u32) {
        self.base_gray.dimensions()
    }
}

fn empty_image(input: &'static str) -> DetectionError {
    DetectionError::Decode {
        input,
        source: ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::DimensionMismatch,
        )),
    }
}

pub fn decode_image(input: &'static str, bytes: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(bytes)
        .map_err(|source| DetectionError::Decode { input, source })?;
    if image.width() == 0 || image.height() == 0 {
        return Err(empty_image(input));
    }
    Ok(image)
}

/// Resizes both images to `(min(w), min(h))` so they can be compared pixel
/// by pixel.
pub fn normalize_pair(base: &DynamicImage, test: &DynamicImage) -> Result<NormalizedPair> {
    let width = base.width().min(test.width());
    let height = base.height().min(test.height());
    if base.width() == 0 || base.height() == 0 {
        return Err(empty_image("base"));
    }
    if test.width() == 0 || test.height() == 0 {
        return Err(empty_image("test"));
    }

    if base.dimensions() != test.dimensions() {
        log::debug!(
            "Reconciling {}x{} and {}x{} to {}x{}",
            base.width(),
            base.height(),
            test.width(),
            test.height(),
            width,
            height
        );
    }

    let base_rgb = resize_area(&base.to_rgb8(), width, height)?;
    let base_gray = resize_area(&base.to_luma8(), width, height)?;
    let test_gray = resize_area(&test.to_luma8(), width, height)?;

    Ok(NormalizedPair {
        base: base_rgb,
        base_gray,
        test_gray,
    })
}

fn pixel_type<P: Pixel<Subpixel = u8>>() -> Result<PixelType> {
    match P::CHANNEL_COUNT {
        1 => Ok(PixelType::U8),
        3 => Ok(PixelType::U8x3),
        n => Err(DetectionError::Processing(format!(
            "no resampler for {} channel images",
            n
        ))),
    }
}

/// Resamples with a box filter, which averages the source pixels each output
/// pixel covers when shrinking.
pub fn resize_area<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    width: u32,
    height: u32,
) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8>,
{
    if image.dimensions() == (width, height) {
        return Ok(image.clone());
    }

    let pixel_type = pixel_type::<P>()?;
    let src = FirImage::from_vec_u8(image.width(), image.height(), image.as_raw().clone(), pixel_type)
        .map_err(|e| DetectionError::Processing(format!("resize source: {}", e)))?;
    let mut dst = FirImage::new(width, height, pixel_type);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Box));
    Resizer::new()
        .resize(&src, &mut dst, &options)
        .map_err(|e| DetectionError::Processing(format!("resize: {}", e)))?;

    ImageBuffer::from_raw(width, height, dst.into_vec())
        .ok_or_else(|| DetectionError::Processing("resized buffer has the wrong length".to_string()))
}
