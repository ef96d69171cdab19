use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};

use crate::common::BoundingBox;

/// Bounding boxes of the outermost contours of a binary grid. Holes and
/// shapes nested inside holes are not reported separately.
pub fn extract_regions(binary: &GrayImage) -> Vec<BoundingBox> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|contour| matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none())
        .filter_map(|contour| {
            let min_x = contour.points.iter().map(|p| p.x).min()?;
            let max_x = contour.points.iter().map(|p| p.x).max()?;
            let min_y = contour.points.iter().map(|p| p.y).min()?;
            let max_y = contour.points.iter().map(|p| p.y).max()?;
            Some(BoundingBox {
                x: min_x as u32,
                y: min_y as u32,
                width: (max_x - min_x + 1) as u32,
                height: (max_y - min_y + 1) as u32,
            })
        })
        .collect()
}
