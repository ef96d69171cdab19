use image::{GrayImage, Luma};

use crate::error::{DetectionError, Result};
use crate::mask::{active_pixels, reconcile_mask};

/// Change confined to the zone: the overlap grid and the pixel counts the
/// percentage was computed from.
#[derive(Clone, Debug)]
pub struct ZoneChange {
    pub overlap: GrayImage,
    pub changed_pixels: u64,
    pub zone_pixels: u64,
    pub percentage: f64,
}

/// ANDs the change signal with the zone mask and reports
/// `changed / zone * 100`. Inputs of different size are both brought to the
/// smaller common size first. An empty zone is an error, never a division.
pub fn reduce_zone_change(signal: &GrayImage, zone: &GrayImage) -> Result<ZoneChange> {
    let width = signal.width().min(zone.width());
    let height = signal.height().min(zone.height());
    let signal = reconcile_mask(signal, width, height)?;
    let zone = reconcile_mask(zone, width, height)?;

    let zone_pixels = active_pixels(&zone);
    if zone_pixels == 0 {
        return Err(DetectionError::EmptyZone);
    }

    let overlap = GrayImage::from_fn(width, height, |x, y| {
        let inside = signal.get_pixel(x, y)[0] > 0 && zone.get_pixel(x, y)[0] > 0;
        Luma([if inside { 255 } else { 0 }])
    });
    let changed_pixels = active_pixels(&overlap);
    let percentage = changed_pixels as f64 / zone_pixels as f64 * 100.0;

    log::debug!(
        "{} of {} zone pixels changed ({:.2}%)",
        changed_pixels,
        zone_pixels,
        percentage
    );

    Ok(ZoneChange {
        overlap,
        changed_pixels,
        zone_pixels,
        percentage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(width: u32, height: u32, rect: (u32, u32, u32, u32)) -> GrayImage {
        let (rx, ry, rw, rh) = rect;
        GrayImage::from_fn(width, height, |x, y| {
            Luma([if x >= rx && x < rx + rw && y >= ry && y < ry + rh { 255 } else { 0 }])
        })
    }

    #[test]
    fn test_full_zone_percentage() {
        let zone = filled(100, 100, (0, 0, 100, 100));
        let signal = filled(100, 100, (40, 40, 20, 20));
        let change = reduce_zone_change(&signal, &zone).unwrap();
        assert_eq!(change.changed_pixels, 400);
        assert_eq!(change.zone_pixels, 10_000);
        assert!((change.percentage - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_change_outside_zone_is_ignored() {
        let zone = filled(100, 100, (0, 0, 50, 100));
        let signal = filled(100, 100, (70, 10, 20, 20));
        let change = reduce_zone_change(&signal, &zone).unwrap();
        assert_eq!(change.changed_pixels, 0);
        assert_eq!(change.percentage, 0.0);
    }

    #[test]
    fn test_empty_zone_is_an_error() {
        let zone = GrayImage::new(20, 20);
        let signal = filled(20, 20, (0, 0, 20, 20));
        assert!(matches!(
            reduce_zone_change(&signal, &zone),
            Err(DetectionError::EmptyZone)
        ));
    }

    #[test]
    fn test_percentage_is_bounded() {
        let zone = filled(30, 30, (5, 5, 10, 10));
        let signal = filled(30, 30, (0, 0, 30, 30));
        let change = reduce_zone_change(&signal, &zone).unwrap();
        assert_eq!(change.percentage, 100.0);
    }

    #[test]
    fn test_mask_of_other_size_is_reconciled() {
        let zone = filled(200, 200, (0, 0, 200, 200));
        let signal = filled(100, 100, (0, 0, 10, 10));
        let change = reduce_zone_change(&signal, &zone).unwrap();
        assert_eq!(change.overlap.dimensions(), (100, 100));
        assert_eq!(change.changed_pixels, 100);
    }
}
