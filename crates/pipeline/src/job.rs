//! Per-job state
//!
//! A `JobHandle` is the only thing shared between a job's worker and
//! concurrent status queries. Progress lives in atomics so the worker never
//! blocks a reader; the mutex-guarded record is only touched at state
//! transitions, which are far shorter than one frame's processing time.

use skelform_common::{JobFailure, JobId, JobState, JobStatus, OutputKind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;

/// Paths of the two finalized result videos
#[derive(Debug, Clone)]
pub struct JobOutputs {
    pub skeleton: PathBuf,
    pub overlay: PathBuf,
}

impl JobOutputs {
    #[must_use]
    pub fn path(&self, kind: OutputKind) -> &PathBuf {
        match kind {
            OutputKind::Skeleton => &self.skeleton,
            OutputKind::Overlay => &self.overlay,
        }
    }
}

#[derive(Debug)]
struct JobRecord {
    state: JobState,
    failure: Option<JobFailure>,
    outputs: Option<JobOutputs>,
    created_at: SystemTime,
    completed_at: Option<SystemTime>,
}

/// Shared state for one job
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    frames_done: AtomicU64,
    total_frames: AtomicU64,
    cancel: AtomicBool,
    record: Mutex<JobRecord>,
}

impl JobHandle {
    /// Create a handle in `Pending` state with the probed frame count
    #[must_use]
    pub fn new(id: JobId, total_frames: u64) -> Self {
        Self {
            id,
            frames_done: AtomicU64::new(0),
            total_frames: AtomicU64::new(total_frames),
            cancel: AtomicBool::new(false),
            record: Mutex::new(JobRecord {
                state: JobState::Pending,
                failure: None,
                outputs: None,
                created_at: SystemTime::now(),
                completed_at: None,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Frames rendered and written to both outputs so far
    #[must_use]
    pub fn frames_done(&self) -> u64 {
        self.frames_done.load(Ordering::Acquire)
    }

    /// Record one more completed frame (lock-free)
    pub fn record_frame(&self) {
        self.frames_done.fetch_add(1, Ordering::AcqRel);
    }

    /// Ask the worker to stop at the next frame boundary
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn state(&self) -> JobState {
        self.record.lock().unwrap_or_else(std::sync::PoisonError::into_inner).state
    }

    pub(crate) fn mark_processing(&self) {
        let mut record = self.record.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        record.state = JobState::Processing;
    }

    /// Transition to `Completed` with the finalized outputs.
    ///
    /// The probed total may be an estimate; the frames actually decoded are
    /// authoritative once the stream has ended.
    pub(crate) fn mark_completed(&self, outputs: JobOutputs) {
        self.total_frames
            .store(self.frames_done(), Ordering::Release);
        let mut record = self.record.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        record.state = JobState::Completed;
        record.outputs = Some(outputs);
        record.completed_at = Some(SystemTime::now());
    }

    pub(crate) fn mark_failed(&self, failure: JobFailure) {
        let mut record = self.record.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        record.state = JobState::Failed;
        record.failure = Some(failure);
        record.completed_at = Some(SystemTime::now());
    }

    pub(crate) fn mark_canceled(&self) {
        let mut record = self.record.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        record.state = JobState::Canceled;
        record.completed_at = Some(SystemTime::now());
    }

    /// Path of a result video; `None` unless the job completed
    #[must_use]
    pub fn output_path(&self, kind: OutputKind) -> Option<PathBuf> {
        let record = self.record.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        record.outputs.as_ref().map(|o| o.path(kind).clone())
    }

    /// Time since the job turned terminal; `None` while it is still live
    #[must_use]
    pub fn terminal_age(&self) -> Option<std::time::Duration> {
        let record = self.record.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        record
            .completed_at
            .map(|at| at.elapsed().unwrap_or_default())
    }

    /// Snapshot for status queries
    #[must_use]
    pub fn status(&self) -> JobStatus {
        let frames_done = self.frames_done();
        let total_frames = self.total_frames.load(Ordering::Acquire);
        let record = self.record.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let progress = match record.state {
            JobState::Completed => 1.0,
            _ if total_frames == 0 => 0.0,
            // The probed total can undershoot, so a live job never reports 1.0
            _ => (frames_done as f64 / total_frames as f64).min(0.99),
        };

        JobStatus {
            id: self.id,
            state: record.state,
            frames_done,
            total_frames,
            progress,
            created_at: record.created_at,
            completed_at: record.completed_at,
            error: record.failure.clone(),
        }
    }
}
