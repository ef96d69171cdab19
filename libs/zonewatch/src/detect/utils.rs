use image::{DynamicImage, GrayImage};

use super::{DetectionConfig, DetectionResult, EmptyZonePolicy};
use crate::compose::{encode_png, render, RenderInput};
use crate::diff::{AbsDiffEngine, DiffEngine, DiffStrategyKind, SsimEngine};
use crate::error::{DetectionError, Result};
use crate::mask::{reconcile_mask, EdgeMask, IntensityThresholdMask, MaskGenerator, MaskStrategyKind};
use crate::normalize::{decode_image, normalize_pair};
use crate::reduce::{reduce_zone_change, ZoneChange};

/// Runs the full pipeline for one image pair: normalize, zone mask, diff,
/// reduce, render. Holds no per-call state, so one detector can serve
/// concurrent callers.
pub struct ChangeDetector {
    config: DetectionConfig,
    mask_generator: Box<dyn MaskGenerator>,
    diff_engine: Box<dyn DiffEngine>,
}

fn build_mask_generator(config: &DetectionConfig) -> Box<dyn MaskGenerator> {
    match config.mask_strategy {
        MaskStrategyKind::Intensity => Box::new(IntensityThresholdMask::new(
            config.zone_intensity_threshold,
            config.dilation_width,
        )),
        MaskStrategyKind::Edge => Box::new(EdgeMask::new(
            config.canny_low,
            config.canny_high,
            config.dilation_width,
        )),
    }
}

fn build_diff_engine(config: &DetectionConfig) -> Box<dyn DiffEngine> {
    match config.diff_strategy {
        DiffStrategyKind::AbsDiff => Box::new(AbsDiffEngine::new(config.diff_threshold, config.blur_sigma)),
        DiffStrategyKind::Ssim => Box::new(SsimEngine::new(config.diff_threshold)),
    }
}

impl ChangeDetector {
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        let mask_generator = build_mask_generator(&config);
        let diff_engine = build_diff_engine(&config);
        Ok(Self {
            config,
            mask_generator,
            diff_engine,
        })
    }

    /// Uses caller-provided strategies instead of the ones named in `config`.
    pub fn with_strategies(
        config: DetectionConfig,
        mask_generator: Box<dyn MaskGenerator>,
        diff_engine: Box<dyn DiffEngine>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            mask_generator,
            diff_engine,
        })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Zone mask at the base image's own resolution, for callers that cache
    /// masks between calls.
    pub fn generate_mask(&self, base: &DynamicImage) -> GrayImage {
        self.mask_generator.generate(&base.to_luma8())
    }

    pub fn generate_mask_bytes(&self, base: &[u8]) -> Result<GrayImage> {
        let base = decode_image("base", base)?;
        Ok(self.generate_mask(&base))
    }

    pub fn detect_bytes(&self, base: &[u8], test: &[u8], zone: Option<&GrayImage>) -> Result<DetectionResult> {
        let base = decode_image("base", base)?;
        let test = decode_image("test", test)?;
        self.detect_images(&base, &test, zone)
    }

    /// `zone` replaces mask generation when given; it is resized to the
    /// normalized size if needed.
    pub fn detect_images(
        &self,
        base: &DynamicImage,
        test: &DynamicImage,
        zone: Option<&GrayImage>,
    ) -> Result<DetectionResult> {
        let pair = normalize_pair(base, test)?;
        let (width, height) = pair.dimensions();

        let zone = match zone {
            Some(mask) => reconcile_mask(mask, width, height)?,
            None => self.mask_generator.generate(&pair.base_gray),
        };

        let signal = self.diff_engine.compute(&pair.base_gray, &pair.test_gray)?;
        log::debug!(
            "{} flagged {} pixels at {}x{}",
            self.diff_engine.name(),
            signal.changed_pixels(),
            width,
            height
        );

        let (change, zone_empty) = match reduce_zone_change(&signal.mask, &zone) {
            Ok(change) => (change, false),
            Err(DetectionError::EmptyZone) if self.config.empty_zone_policy == EmptyZonePolicy::Zero => {
                log::warn!("Zone mask is empty, reporting 0% by policy");
                let empty = ZoneChange {
                    overlap: GrayImage::new(width, height),
                    changed_pixels: 0,
                    zone_pixels: 0,
                    percentage: 0.0,
                };
                (empty, true)
            }
            Err(err) => return Err(err),
        };

        let artifact = render(
            self.config.render_mode,
            &RenderInput {
                base: &pair.base,
                base_gray: &pair.base_gray,
                zone: &zone,
                overlap: &change.overlap,
                regions: &signal.regions,
            },
        );
        let artifact = encode_png(&artifact)?;

        let exceeds_threshold = change.percentage > self.config.alert_threshold;
        log::info!(
            "Change detected: {:.2}% ({} / {} zone pixels, threshold {:.2}%)",
            change.percentage,
            change.changed_pixels,
            change.zone_pixels,
            self.config.alert_threshold
        );

        Ok(DetectionResult {
            change_percentage: change.percentage,
            exceeds_threshold,
            changed_pixels: change.changed_pixels,
            zone_pixels: change.zone_pixels,
            zone_empty,
            regions: signal.regions,
            width,
            height,
            mask_strategy: self.mask_generator.name(),
            diff_strategy: self.diff_engine.name(),
            artifact,
        })
    }
}
