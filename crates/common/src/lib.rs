/// Common types shared across the skeleton analysis pipeline
pub mod error;
pub mod job;
pub mod landmarks;
pub mod limits;

pub use error::{ErrorCategory, PipelineError, Result};
pub use job::{JobFailure, JobId, JobState, JobStatus, OutputKind};
pub use landmarks::{JointName, Landmark, LandmarkSet, SKELETON_CONNECTIONS};
pub use limits::{is_allowed_extension, UploadLimits, ALLOWED_EXTENSIONS};
