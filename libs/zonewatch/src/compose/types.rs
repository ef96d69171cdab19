use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::common::BoundingBox;
use crate::error::DetectionError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum RenderMode {
    /// The overlap grid itself, white where the zone changed.
    #[default]
    Overlap,
    /// Base image with the zone painted black and changes painted white.
    ZoneComposite,
    /// Colour base image with a rectangle around every change region.
    Annotated,
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderMode::Overlap => write!(f, "overlap"),
            RenderMode::ZoneComposite => write!(f, "zone_composite"),
            RenderMode::Annotated => write!(f, "annotated"),
        }
    }
}

impl FromStr for RenderMode {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "overlap" | "mask" => Ok(RenderMode::Overlap),
            "zone_composite" | "composite" => Ok(RenderMode::ZoneComposite),
            "annotated" | "boxes" => Ok(RenderMode::Annotated),
            other => Err(DetectionError::StrategyUnavailable {
                kind: "render",
                name: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for RenderMode {
    type Error = DetectionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Borrowed views of one detection's intermediate grids. All grids share the
/// same dimensions.
pub struct RenderInput<'a> {
    pub base: &'a RgbImage,
    pub base_gray: &'a GrayImage,
    pub zone: &'a GrayImage,
    pub overlap: &'a GrayImage,
    pub regions: &'a [BoundingBox],
}
