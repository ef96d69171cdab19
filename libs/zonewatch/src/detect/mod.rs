mod types;
pub use types::{DetectionConfig, DetectionOverrides, DetectionResult, DetectionSummary, EmptyZonePolicy};

mod utils;
pub use utils::ChangeDetector;
