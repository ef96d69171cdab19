use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::DetectionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum MaskStrategyKind {
    /// Dark region below an intensity cutoff, dilated into a buffer.
    Intensity,
    /// Band around detected edges, dilated into a buffer.
    Edge,
}

impl std::fmt::Display for MaskStrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaskStrategyKind::Intensity => write!(f, "intensity"),
            MaskStrategyKind::Edge => write!(f, "edge"),
        }
    }
}

impl FromStr for MaskStrategyKind {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intensity" | "threshold" | "intensity_threshold" => Ok(MaskStrategyKind::Intensity),
            "edge" | "edges" | "canny" => Ok(MaskStrategyKind::Edge),
            other => Err(DetectionError::StrategyUnavailable {
                kind: "mask",
                name: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for MaskStrategyKind {
    type Error = DetectionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
