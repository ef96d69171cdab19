pub mod common;
pub mod logger;
pub mod error;
pub mod normalize;
pub mod mask;
pub mod diff;
pub mod reduce;
pub mod compose;
pub mod detect;
pub mod alert;

pub use detect::{ChangeDetector, DetectionConfig, DetectionResult, DetectionSummary};
pub use error::{DetectionError, Result};
