use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::common::{format_percentage, BoundingBox, EncodedImage};
use crate::compose::RenderMode;
use crate::diff::DiffStrategyKind;
use crate::error::{DetectionError, Result};
use crate::mask::{MaskStrategyKind, MAX_DILATION_WIDTH};

/// What to report when the zone mask has no active pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum EmptyZonePolicy {
    /// Fail the call with `DetectionError::EmptyZone`.
    #[default]
    Error,
    /// No zone means no change: report 0%.
    Zero,
}

impl FromStr for EmptyZonePolicy {
    type Err = DetectionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(EmptyZonePolicy::Error),
            "zero" => Ok(EmptyZonePolicy::Zero),
            other => Err(DetectionError::InvalidConfig(format!(
                "unknown empty zone policy: {}",
                other
            ))),
        }
    }
}

impl TryFrom<String> for EmptyZonePolicy {
    type Error = DetectionError;

    fn try_from(s: String) -> std::result::Result<Self, DetectionError> {
        s.parse()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub mask_strategy: MaskStrategyKind,
    pub diff_strategy: DiffStrategyKind,
    pub zone_intensity_threshold: u8,
    pub canny_low: f32,
    pub canny_high: f32,
    pub dilation_width: u32,
    pub diff_threshold: u8,
    pub blur_sigma: Option<f32>,
    pub alert_threshold: f64,
    pub empty_zone_policy: EmptyZonePolicy,
    pub render_mode: RenderMode,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            mask_strategy: MaskStrategyKind::Intensity,
            diff_strategy: DiffStrategyKind::AbsDiff,
            zone_intensity_threshold: 100,
            canny_low: 100.0,
            canny_high: 200.0,
            dilation_width: 50,
            diff_threshold: 30,
            blur_sigma: None,
            alert_threshold: 5.0,
            empty_zone_policy: EmptyZonePolicy::Error,
            render_mode: RenderMode::Overlap,
        }
    }
}

impl DetectionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: DetectionConfig = serde_json::from_str(json)
            .map_err(|e| DetectionError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dilation_width > MAX_DILATION_WIDTH {
            return Err(DetectionError::InvalidConfig(format!(
                "dilation_width {} exceeds {}",
                self.dilation_width, MAX_DILATION_WIDTH
            )));
        }
        if let Some(sigma) = self.blur_sigma {
            if !(sigma.is_finite() && sigma > 0.0) {
                return Err(DetectionError::InvalidConfig(format!(
                    "blur_sigma must be positive, got {}",
                    sigma
                )));
            }
        }
        if !(self.canny_low.is_finite() && self.canny_high.is_finite())
            || self.canny_low < 0.0
            || self.canny_low > self.canny_high
        {
            return Err(DetectionError::InvalidConfig(format!(
                "canny thresholds must satisfy 0 <= low <= high, got {} and {}",
                self.canny_low, self.canny_high
            )));
        }
        if !(0.0..=100.0).contains(&self.alert_threshold) {
            return Err(DetectionError::InvalidConfig(format!(
                "alert_threshold must be within 0..=100, got {}",
                self.alert_threshold
            )));
        }
        Ok(())
    }
}

/// Partial configuration from a request or the command line. Strategy names
/// stay strings until applied so unknown names surface as
/// `StrategyUnavailable`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionOverrides {
    pub mask_strategy: Option<String>,
    pub diff_strategy: Option<String>,
    pub zone_intensity_threshold: Option<u8>,
    pub canny_low: Option<f32>,
    pub canny_high: Option<f32>,
    pub dilation_width: Option<u32>,
    pub diff_threshold: Option<u8>,
    pub blur_sigma: Option<f32>,
    pub alert_threshold: Option<f64>,
    pub empty_zone_policy: Option<String>,
    pub render_mode: Option<String>,
}

impl DetectionOverrides {
    pub fn apply(&self, base: &DetectionConfig) -> Result<DetectionConfig> {
        let mut config = base.clone();
        if let Some(name) = &self.mask_strategy {
            config.mask_strategy = name.parse()?;
        }
        if let Some(name) = &self.diff_strategy {
            config.diff_strategy = name.parse()?;
        }
        if let Some(name) = &self.empty_zone_policy {
            config.empty_zone_policy = name.parse()?;
        }
        if let Some(name) = &self.render_mode {
            config.render_mode = name.parse()?;
        }
        if let Some(v) = self.zone_intensity_threshold {
            config.zone_intensity_threshold = v;
        }
        if let Some(v) = self.canny_low {
            config.canny_low = v;
        }
        if let Some(v) = self.canny_high {
            config.canny_high = v;
        }
        if let Some(v) = self.dilation_width {
            config.dilation_width = v;
        }
        if let Some(v) = self.diff_threshold {
            config.diff_threshold = v;
        }
        if self.blur_sigma.is_some() {
            config.blur_sigma = self.blur_sigma;
        }
        if let Some(v) = self.alert_threshold {
            config.alert_threshold = v;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Outcome of one detection call.
#[derive(Clone, Debug)]
pub struct DetectionResult {
    /// Changed zone pixels over zone pixels, in [0, 100].
    pub change_percentage: f64,
    pub exceeds_threshold: bool,
    pub changed_pixels: u64,
    pub zone_pixels: u64,
    /// Set when the zone was empty and the policy mapped it to 0%.
    pub zone_empty: bool,
    pub regions: Vec<BoundingBox>,
    pub width: u32,
    pub height: u32,
    pub mask_strategy: &'static str,
    pub diff_strategy: &'static str,
    pub artifact: EncodedImage,
}

impl DetectionResult {
    pub fn display_percentage(&self) -> String {
        format_percentage(self.change_percentage)
    }

    pub fn summary(&self) -> DetectionSummary {
        DetectionSummary {
            change_percentage: (self.change_percentage * 100.0).round() / 100.0,
            exceeds_threshold: self.exceeds_threshold,
            changed_pixels: self.changed_pixels,
            zone_pixels: self.zone_pixels,
            zone_empty: self.zone_empty,
            regions: self.regions.clone(),
            width: self.width,
            height: self.height,
            mask_strategy: self.mask_strategy.to_string(),
            diff_strategy: self.diff_strategy.to_string(),
        }
    }
}

/// Serialisable view of a `DetectionResult` without the artifact bytes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub change_percentage: f64,
    pub exceeds_threshold: bool,
    pub changed_pixels: u64,
    pub zone_pixels: u64,
    pub zone_empty: bool,
    pub regions: Vec<BoundingBox>,
    pub width: u32,
    pub height: u32,
    pub mask_strategy: String,
    pub diff_strategy: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DetectionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dilation_width, 50);
        assert_eq!(config.diff_threshold, 30);
        assert_eq!(config.alert_threshold, 5.0);
        assert!(DetectionConfig { dilation_width: MAX_DILATION_WIDTH, ..Default::default() }.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = DetectionConfig::from_json(r#"{"diff_strategy": "ssim", "dilation_width": 10}"#).unwrap();
        assert_eq!(config.diff_strategy, DiffStrategyKind::Ssim);
        assert_eq!(config.dilation_width, 10);
        assert_eq!(config.mask_strategy, MaskStrategyKind::Intensity);
    }

    #[test]
    fn test_from_json_reads_empty_zone_policy() {
        let config = DetectionConfig::from_json(r#"{"empty_zone_policy": "zero"}"#).unwrap();
        assert_eq!(config.empty_zone_policy, EmptyZonePolicy::Zero);
        assert!(DetectionConfig::from_json(r#"{"empty_zone_policy": "ignore"}"#).is_err());
        assert_eq!(EmptyZonePolicy::try_from("Error".to_string()).unwrap(), EmptyZonePolicy::Error);
    }

    #[test]
    fn test_from_json_rejects_unknown_strategy() {
        assert!(DetectionConfig::from_json(r#"{"mask_strategy": "watershed"}"#).is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let cases = [
            DetectionConfig { dilation_width: 10_000, ..Default::default() },
            DetectionConfig { dilation_width: MAX_DILATION_WIDTH + 1, ..Default::default() },
            DetectionConfig { blur_sigma: Some(0.0), ..Default::default() },
            DetectionConfig { canny_low: 300.0, ..Default::default() },
            DetectionConfig { alert_threshold: 150.0, ..Default::default() },
            DetectionConfig { alert_threshold: f64::NAN, ..Default::default() },
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(DetectionError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_overrides_apply_on_top_of_base() {
        let overrides = DetectionOverrides {
            mask_strategy: Some("edge".into()),
            diff_threshold: Some(12),
            empty_zone_policy: Some("zero".into()),
            ..Default::default()
        };
        let config = overrides.apply(&DetectionConfig::default()).unwrap();
        assert_eq!(config.mask_strategy, MaskStrategyKind::Edge);
        assert_eq!(config.diff_threshold, 12);
        assert_eq!(config.empty_zone_policy, EmptyZonePolicy::Zero);
        assert_eq!(config.dilation_width, 50);
    }

    #[test]
    fn test_overrides_unknown_strategy() {
        let overrides = DetectionOverrides {
            diff_strategy: Some("optical_flow".into()),
            ..Default::default()
        };
        assert!(matches!(
            overrides.apply(&DetectionConfig::default()),
            Err(DetectionError::StrategyUnavailable { kind: "diff", .. })
        ));
    }
}
