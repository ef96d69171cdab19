use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::common::BoundingBox;
use crate::error::DetectionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum DiffStrategyKind {
    AbsDiff,
    Ssim,
}

impl std::fmt::Display for DiffStrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffStrategyKind::AbsDiff => write!(f, "absdiff"),
            DiffStrategyKind::Ssim => write!(f, "ssim"),
        }
    }
}

impl FromStr for DiffStrategyKind {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "absdiff" | "abs_diff" | "absolute" => Ok(DiffStrategyKind::AbsDiff),
            "ssim" | "structural" => Ok(DiffStrategyKind::Ssim),
            other => Err(DetectionError::StrategyUnavailable {
                kind: "diff",
                name: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for DiffStrategyKind {
    type Error = DetectionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Binary grid (0/255) of pixels that changed beyond the threshold, plus the
/// boxes around contiguous changed regions when the strategy extracts them.
#[derive(Clone, Debug)]
pub struct ChangeSignal {
    pub mask: GrayImage,
    pub regions: Vec<BoundingBox>,
}

impl ChangeSignal {
    pub fn new(mask: GrayImage) -> Self {
        Self {
            mask,
            regions: Vec::new(),
        }
    }

    pub fn changed_pixels(&self) -> u64 {
        crate::mask::active_pixels(&self.mask)
    }
}
