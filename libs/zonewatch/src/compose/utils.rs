use image::{DynamicImage, ImageFormat, Luma, Rgb};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::io::Cursor;

use super::{RenderInput, RenderMode};
use crate::common::{BoundingBox, EncodedImage};
use crate::diff::extract_regions;
use crate::error::{DetectionError, Result};

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Builds the result artifact. Always draws on copies; the inputs are left
/// untouched.
pub fn render(mode: RenderMode, input: &RenderInput<'_>) -> DynamicImage {
    match mode {
        RenderMode::Overlap => DynamicImage::ImageLuma8(input.overlap.clone()),
        RenderMode::ZoneComposite => {
            let mut canvas = input.base_gray.clone();
            for (x, y, pixel) in canvas.enumerate_pixels_mut() {
                if input.overlap.get_pixel(x, y)[0] > 0 {
                    *pixel = Luma([255]);
                } else if input.zone.get_pixel(x, y)[0] > 0 {
                    *pixel = Luma([0]);
                }
            }
            DynamicImage::ImageLuma8(canvas)
        }
        RenderMode::Annotated => {
            let extracted;
            let regions: &[BoundingBox] = if input.regions.is_empty() {
                extracted = extract_regions(input.overlap);
                &extracted
            } else {
                input.regions
            };

            let mut canvas = input.base.clone();
            for region in regions {
                let rect = Rect::at(region.x as i32, region.y as i32)
                    .of_size(region.width.max(1), region.height.max(1));
                draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
            }
            DynamicImage::ImageRgb8(canvas)
        }
    }
}

pub fn encode_png(image: &DynamicImage) -> Result<EncodedImage> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(DetectionError::Encode)?;
    Ok(EncodedImage {
        bytes,
        width: image.width(),
        height: image.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage};

    struct Fixture {
        base: RgbImage,
        base_gray: GrayImage,
        zone: GrayImage,
        overlap: GrayImage,
    }

    fn fixture() -> Fixture {
        let zone = GrayImage::from_fn(40, 40, |x, _| Luma([if x < 20 { 255 } else { 0 }]));
        let overlap = GrayImage::from_fn(40, 40, |x, y| {
            Luma([if (5..10).contains(&x) && (5..10).contains(&y) { 255 } else { 0 }])
        });
        Fixture {
            base: RgbImage::from_pixel(40, 40, Rgb([90, 90, 90])),
            base_gray: GrayImage::from_pixel(40, 40, Luma([90])),
            zone,
            overlap,
        }
    }

    fn input(f: &Fixture) -> RenderInput<'_> {
        RenderInput {
            base: &f.base,
            base_gray: &f.base_gray,
            zone: &f.zone,
            overlap: &f.overlap,
            regions: &[],
        }
    }

    #[test]
    fn test_zone_composite_colors() {
        let f = fixture();
        let out = render(RenderMode::ZoneComposite, &input(&f)).to_luma8();
        assert_eq!(out.get_pixel(7, 7)[0], 255);
        assert_eq!(out.get_pixel(15, 30)[0], 0);
        assert_eq!(out.get_pixel(30, 30)[0], 90);
        // original left untouched
        assert!(f.base_gray.pixels().all(|p| p[0] == 90));
    }

    #[test]
    fn test_annotated_draws_box_from_overlap() {
        let f = fixture();
        let out = render(RenderMode::Annotated, &input(&f)).to_rgb8();
        assert_eq!(*out.get_pixel(5, 5), BOX_COLOR);
        assert_eq!(*out.get_pixel(9, 9), BOX_COLOR);
        assert_eq!(*out.get_pixel(7, 7), Rgb([90, 90, 90]));
        assert!(f.base.pixels().all(|p| *p == Rgb([90, 90, 90])));
    }

    #[test]
    fn test_encode_png_decodes_back() {
        let f = fixture();
        let encoded = encode_png(&render(RenderMode::Overlap, &input(&f))).unwrap();
        assert_eq!((encoded.width, encoded.height), (40, 40));
        assert!(encoded.to_data_url().starts_with("data:image/png;base64,"));
        let decoded = image::load_from_memory(&encoded.bytes).unwrap().to_luma8();
        assert_eq!(decoded, f.overlap);
    }
}
