use thiserror::Error;

pub type Result<T> = std::result::Result<T, DetectionError>;

/// Failures of a single detection call. Decode and configuration errors abort
/// the call before any partial result exists.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("could not decode {input} image: {source}")]
    Decode {
        input: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error("zone mask has no active pixels")]
    EmptyZone,

    #[error("unsupported {kind} strategy: {name}")]
    StrategyUnavailable { kind: &'static str, name: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("could not encode result image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("image processing failed: {0}")]
    Processing(String),
}

impl DetectionError {
    /// True for errors caused by what the caller sent, as opposed to a fault
    /// while processing or rendering.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, DetectionError::Encode(_) | DetectionError::Processing(_))
    }
}
