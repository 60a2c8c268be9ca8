//! Pipeline configuration

use skelform_common::UploadLimits;
use skelform_pose::PoseConfig;
use skelform_render::RenderStyle;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the job pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding accepted uploads for the duration of their job
    pub upload_dir: PathBuf,
    /// Directory holding finished result videos
    pub results_dir: PathBuf,
    /// Path to the YOLOv8-Pose ONNX model
    pub model_path: PathBuf,
    /// Submission limits checked before any decoding
    pub limits: UploadLimits,
    /// Age past which upload/result files are eligible for deletion
    pub retention: Duration,
    /// How often the sweeper wakes up
    pub sweep_interval: Duration,
    /// Max frames in flight between the decode stage and the process stage
    pub channel_capacity: usize,
    /// Landmark detector configuration
    pub pose: PoseConfig,
    /// Skeleton drawing style
    pub style: RenderStyle,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("data/uploads"),
            results_dir: PathBuf::from("data/results"),
            model_path: PathBuf::from("models/yolov8n-pose.onnx"),
            limits: UploadLimits::default(),
            retention: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(60),
            channel_capacity: 8,
            pose: PoseConfig::default(),
            style: RenderStyle::default(),
        }
    }
}
