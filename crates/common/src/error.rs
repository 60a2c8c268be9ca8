//! Error taxonomy for the analysis pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {size} bytes (max: {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("Duration exceeds limit: {duration:.1}s (max: {max:.1}s)")]
    DurationTooLong { duration: f64, max: f64 },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Detector fault: {0}")]
    DetectorFault(String),

    #[error("Job canceled")]
    Canceled,

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Result not ready for job {0}")]
    NotReady(String),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Coarse error category surfaced on job status records.
///
/// Size and duration limits both report as `TooLarge`; decode, encode and
/// filesystem failures all report as `Io`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    UnsupportedFormat,
    TooLarge,
    Io,
    DetectorFault,
    Canceled,
    NotFound,
    NotReady,
}

impl PipelineError {
    /// Map an error to its reporting category
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::UnsupportedFormat(_) => ErrorCategory::UnsupportedFormat,
            PipelineError::TooLarge { .. } | PipelineError::DurationTooLong { .. } => {
                ErrorCategory::TooLarge
            }
            PipelineError::Decode(_) | PipelineError::Encode(_) | PipelineError::Io(_) => {
                ErrorCategory::Io
            }
            PipelineError::DetectorFault(_) => ErrorCategory::DetectorFault,
            PipelineError::Canceled => ErrorCategory::Canceled,
            PipelineError::NotFound(_) => ErrorCategory::NotFound,
            PipelineError::NotReady(_) => ErrorCategory::NotReady,
        }
    }
}
