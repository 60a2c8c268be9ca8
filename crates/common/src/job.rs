//! Job lifecycle types

use crate::error::ErrorCategory;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique job identifier
pub type JobId = Uuid;

/// Lifecycle state of an analysis job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Job accepted, worker not yet running
    Pending,
    /// Worker is decoding/rendering frames
    Processing,
    /// Both output videos finalized
    Completed,
    /// Job aborted with an error; partial outputs discarded
    Failed,
    /// Job canceled cooperatively; partial outputs discarded
    Canceled,
}

impl JobState {
    /// Whether the job has reached a terminal state
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Canceled
        )
    }
}

/// Which of the two result videos is being addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Skeleton drawn on a blank canvas
    Skeleton,
    /// Skeleton composited over the original frame
    Overlay,
}

impl OutputKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::Skeleton => "skeleton",
            OutputKind::Overlay => "overlay",
        }
    }
}

impl std::str::FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "skeleton" => Ok(OutputKind::Skeleton),
            "overlay" => Ok(OutputKind::Overlay),
            other => Err(format!("unknown output kind: {other}")),
        }
    }
}

/// Error detail recorded on a failed job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobFailure {
    /// Coarse category for clients
    pub category: ErrorCategory,
    /// Human-readable detail
    pub message: String,
}

/// Snapshot of a job's state as returned by status queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: JobId,
    pub state: JobState,
    /// Frames rendered and written to both outputs so far
    pub frames_done: u64,
    /// Total frame count (probed up front, reconciled at completion)
    pub total_frames: u64,
    /// Progress fraction in [0, 1]; reaches 1.0 only on completion
    pub progress: f64,
    pub created_at: std::time::SystemTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<std::time::SystemTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
}
