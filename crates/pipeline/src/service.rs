//! Job service
//!
//! Owns the job registry, the shared detector handle, and the submission
//! path. Validation (extension allow-list, size and duration limits, probe)
//! happens synchronously before a job record exists, so a rejected submission
//! is never queryable. Accepted jobs run on blocking tasks and publish state
//! through their `JobHandle` only.

use crate::adapters::DecoderSource;
use crate::config::PipelineConfig;
use crate::job::{JobHandle, JobOutputs};
use crate::retention::sweep_dir;
use crate::worker::run_job;
use once_cell::sync::OnceCell;
use skelform_common::{
    is_allowed_extension, JobFailure, JobId, JobState, JobStatus, OutputKind, PipelineError,
    Result,
};
use skelform_pose::PoseDetector;
use skelform_video_io::{probe, VideoEncoder, VideoInfo};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

struct ServiceInner {
    config: PipelineConfig,
    jobs: RwLock<HashMap<JobId, Arc<JobHandle>>>,
    /// Detector loaded once on first use and shared by reference across jobs
    detector: OnceCell<PoseDetector>,
}

impl ServiceInner {
    fn detector(&self) -> Result<&PoseDetector> {
        self.detector.get_or_try_init(|| {
            info!("Loading pose model from {:?}", self.config.model_path);
            PoseDetector::load(&self.config.model_path, self.config.pose.clone())
                .map_err(PipelineError::from)
        })
    }
}

/// Handle to the analysis pipeline, cheap to clone
#[derive(Clone)]
pub struct JobService {
    inner: Arc<ServiceInner>,
}

impl JobService {
    /// Create the service and its working directories
    pub fn new(config: PipelineConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.upload_dir)?;
        std::fs::create_dir_all(&config.results_dir)?;

        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                jobs: RwLock::new(HashMap::new()),
                detector: OnceCell::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Submit a video for analysis
    ///
    /// Validates extension, size, and container before any job record is
    /// created, then takes a private copy of the upload and starts the
    /// worker. Returns the new job id immediately.
    pub async fn submit(&self, input: &Path) -> Result<JobId> {
        let limits = &self.inner.config.limits;

        if !is_allowed_extension(input) {
            return Err(PipelineError::UnsupportedFormat(format!(
                "Extension not allowed: {}",
                input.display()
            )));
        }

        let metadata = tokio::fs::metadata(input).await?;
        if metadata.len() > limits.max_bytes {
            return Err(PipelineError::TooLarge {
                size: metadata.len(),
                max: limits.max_bytes,
            });
        }

        // Probe the container header before accepting the job
        let probe_path = input.to_path_buf();
        let info = tokio::task::spawn_blocking(move || probe(&probe_path))
            .await
            .map_err(|e| PipelineError::Decode(format!("Probe task failed: {e}")))??;

        if info.duration > limits.max_duration_secs {
            return Err(PipelineError::DurationTooLong {
                duration: info.duration,
                max: limits.max_duration_secs,
            });
        }

        let id = Uuid::new_v4();

        // Take ownership of the upload for the job's lifetime
        let file_name = input
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.mp4");
        let upload_path = self.inner.config.upload_dir.join(format!("{id}_{file_name}"));
        tokio::fs::copy(input, &upload_path).await?;

        let handle = Arc::new(JobHandle::new(id, info.total_frames));
        self.inner.jobs.write().await.insert(id, handle.clone());

        info!(
            "Job {} accepted: {}x{} @ {:.2}fps, ~{} frames",
            id,
            info.width,
            info.height,
            info.fps(),
            info.total_frames
        );

        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || process_job(&inner, &handle, &upload_path, &info));

        Ok(id)
    }

    /// Status snapshot for one job
    pub async fn status(&self, id: JobId) -> Result<JobStatus> {
        self.inner
            .jobs
            .read()
            .await
            .get(&id)
            .map(|handle| handle.status())
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))
    }

    /// Status snapshots for all known jobs
    pub async fn jobs(&self) -> Vec<JobStatus> {
        self.inner
            .jobs
            .read()
            .await
            .values()
            .map(|handle| handle.status())
            .collect()
    }

    /// Path of a finished result video
    ///
    /// `NotReady` while the job is still running; `NotFound` for unknown
    /// jobs, failed/canceled jobs, and results already removed by the
    /// retention sweeper.
    pub async fn result(&self, id: JobId, kind: OutputKind) -> Result<PathBuf> {
        let handle = self
            .inner
            .jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))?;

        match handle.state() {
            JobState::Pending | JobState::Processing => {
                Err(PipelineError::NotReady(id.to_string()))
            }
            JobState::Failed | JobState::Canceled => Err(PipelineError::NotFound(format!(
                "{id} produced no {} output",
                kind.as_str()
            ))),
            JobState::Completed => {
                let path = handle
                    .output_path(kind)
                    .ok_or_else(|| PipelineError::NotFound(id.to_string()))?;
                // The sweeper may have reclaimed the file already
                if !path.exists() {
                    return Err(PipelineError::NotFound(format!(
                        "Result {} for {id} no longer exists",
                        kind.as_str()
                    )));
                }
                Ok(path)
            }
        }
    }

    /// Request cooperative cancellation of a running job
    pub async fn cancel(&self, id: JobId) -> Result<()> {
        let jobs = self.inner.jobs.read().await;
        let handle = jobs
            .get(&id)
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))?;
        handle.request_cancel();
        Ok(())
    }

    /// Drop terminal job records older than the retention window.
    ///
    /// Returns how many records were pruned. A pruned job answers `NotFound`
    /// afterwards, the same as its swept result files.
    pub async fn prune_terminal_jobs(&self) -> usize {
        let retention = self.inner.config.retention;
        let mut jobs = self.inner.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, handle| handle.terminal_age().is_none_or(|age| age <= retention));
        before - jobs.len()
    }

    /// Start the background retention sweeper.
    ///
    /// Sweeps the upload/result directories and prunes stale job records on
    /// every tick; the first tick fires immediately so leftovers from a
    /// previous run are cleared at startup.
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let config = &service.inner.config;
            let dirs = [config.upload_dir.clone(), config.results_dir.clone()];
            let mut ticker = tokio::time::interval(config.sweep_interval);
            loop {
                ticker.tick().await;
                for dir in &dirs {
                    match sweep_dir(dir, config.retention) {
                        Ok(0) => {}
                        Ok(removed) => info!("Swept {} old file(s) from {:?}", removed, dir),
                        Err(e) => warn!("Error during cleanup of {:?}: {}", dir, e),
                    }
                }
                let pruned = service.prune_terminal_jobs().await;
                if pruned > 0 {
                    info!("Pruned {} expired job record(s)", pruned);
                }
            }
        })
    }
}

/// Blocking body of one job: open stages, run the frame loop, settle state
fn process_job(inner: &ServiceInner, handle: &JobHandle, upload: &Path, info: &VideoInfo) {
    handle.mark_processing();

    // A panicking stage must still settle the job and clean up its files
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        execute(inner, handle, upload, info)
    }))
    .unwrap_or_else(|_| Err(PipelineError::Io(std::io::Error::other("Job worker panicked"))));

    match result {
        Ok(outputs) => {
            info!(
                "Job {} completed: {} frames",
                handle.id(),
                handle.frames_done()
            );
            handle.mark_completed(outputs);
        }
        Err(PipelineError::Canceled) => {
            info!("Job {} canceled", handle.id());
            handle.mark_canceled();
        }
        Err(e) => {
            error!("Job {} failed: {}", handle.id(), e);
            remove_result_files(&inner.config, handle.id());
            handle.mark_failed(JobFailure {
                category: e.category(),
                message: e.to_string(),
            });
        }
    }

    // The upload was a private copy; it is done regardless of outcome
    if let Err(e) = std::fs::remove_file(upload) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove upload {:?}: {}", upload, e);
        }
    }
}

fn execute(
    inner: &ServiceInner,
    handle: &JobHandle,
    upload: &Path,
    info: &VideoInfo,
) -> Result<JobOutputs> {
    let config = &inner.config;
    let detector = inner.detector()?;

    let id = handle.id();
    let skeleton_path = config.results_dir.join(format!("skeleton_{id}.mp4"));
    let overlay_path = config.results_dir.join(format!("overlay_{id}.mp4"));

    let source = DecoderSource::spawn(upload.to_path_buf(), config.channel_capacity)?;

    let skeleton_enc =
        match VideoEncoder::create(&skeleton_path, info.width, info.height, info.frame_rate) {
            Ok(enc) => enc,
            Err(e) => {
                let _ = std::fs::remove_file(&skeleton_path);
                return Err(e);
            }
        };
    let overlay_enc =
        match VideoEncoder::create(&overlay_path, info.width, info.height, info.frame_rate) {
            Ok(enc) => enc,
            Err(e) => {
                let _ = skeleton_enc.discard();
                let _ = std::fs::remove_file(&overlay_path);
                return Err(e);
            }
        };

    let expected = info.exact_frame_count.then_some(info.total_frames);

    run_job(
        source,
        detector,
        skeleton_enc,
        overlay_enc,
        &config.style,
        handle,
        expected,
    )?;

    Ok(JobOutputs {
        skeleton: skeleton_path,
        overlay: overlay_path,
    })
}

/// Remove any result files a failed job left behind
fn remove_result_files(config: &PipelineConfig, id: JobId) {
    for name in [format!("skeleton_{id}.mp4"), format!("overlay_{id}.mp4")] {
        let path = config.results_dir.join(name);
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove partial output {:?}: {}", path, e);
            }
        }
    }
}
