//! Body landmark detection using YOLOv8-Pose via ONNX Runtime
//!
//! The detector is consumed as a black box by the job pipeline: given one RGB
//! frame it produces zero or one [`LandmarkSet`] (the highest-confidence
//! person in the frame, all 17 COCO joints with per-joint confidence). "No
//! body in frame" is `Ok(None)`; only inference execution faults are errors.
//!
//! # Example
//! ```no_run
//! use skelform_pose::{PoseConfig, PoseDetector, PoseError};
//!
//! # fn main() -> Result<(), PoseError> {
//! let detector = PoseDetector::load("models/yolov8n-pose.onnx", PoseConfig::default())?;
//! let frame = image::RgbImage::new(1280, 720);
//! if let Some(set) = detector.detect(&frame)? {
//!     println!("Body detected (confidence {:.2})", set.confidence);
//! }
//! # Ok(())
//! # }
//! ```

pub mod session;

use image::RgbImage;
use ndarray::Array;
use ort::value::TensorRef;
use skelform_common::{JointName, Landmark, LandmarkSet, PipelineError};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};

/// Features per anchor in YOLOv8-Pose output: 4 box coords + 1 objectness
/// + 17 keypoints * (x, y, visibility)
const POSE_FEATURES: usize = 56;

/// Configuration for landmark detection
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PoseConfig {
    /// Minimum objectness for a frame to count as containing a body (0.0-1.0)
    pub person_threshold: f32,
    /// Model input size (YOLOv8-Pose default is 640x640)
    pub input_size: u32,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            person_threshold: 0.25,
            input_size: 640,
        }
    }
}

/// Error types for landmark detection
#[derive(Debug, Error)]
pub enum PoseError {
    #[error("Model file not found: {0}")]
    ModelNotFound(String),
    #[error("Failed to load model: {0}")]
    ModelLoad(String),
    #[error("Inference error: {0}")]
    Inference(String),
}

// Detector execution faults map to the pipeline's DetectorFault category
impl From<PoseError> for PipelineError {
    fn from(error: PoseError) -> Self {
        PipelineError::DetectorFault(error.to_string())
    }
}

/// Landmark detector over a YOLOv8-Pose ONNX model
///
/// The session is owned here and loaded once; `detect` takes `&self` so one
/// detector instance is shared across concurrent jobs (the mutex serializes
/// `Session::run`, which requires `&mut`).
pub struct PoseDetector {
    session: Mutex<ort::session::Session>,
    config: PoseConfig,
}

impl PoseDetector {
    /// Load the model and build an inference session
    pub fn load<P: AsRef<Path>>(model_path: P, config: PoseConfig) -> Result<Self, PoseError> {
        info!(
            "Loading YOLOv8-Pose model from {:?}",
            model_path.as_ref()
        );
        let session = session::create_session(model_path.as_ref())?;
        info!("YOLOv8-Pose model loaded");

        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    /// Detect the most confident body in one frame
    ///
    /// Returns `Ok(None)` when no anchor clears the person threshold. All 17
    /// joints are returned with their raw confidences; confidence filtering
    /// happens at render time so both output images apply the same gate.
    pub fn detect(&self, image: &RgbImage) -> Result<Option<LandmarkSet>, PoseError> {
        debug!(
            "Running landmark detection on {}x{} frame",
            image.width(),
            image.height()
        );

        let input = preprocess(image, self.config.input_size);

        let mut session = self
            .session
            .lock()
            .map_err(|e| PoseError::Inference(format!("Session mutex poisoned: {e}")))?;

        let input_tensor = TensorRef::from_array_view(input.view())
            .map_err(|e| PoseError::Inference(e.to_string()))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| PoseError::Inference(e.to_string()))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| PoseError::Inference(format!("Failed to extract tensor: {e}")))?;

        let dims = shape.as_ref();
        if dims.len() != 3 {
            return Err(PoseError::Inference(format!(
                "Expected 3D output tensor, got {}D",
                dims.len()
            )));
        }

        best_landmark_set(data, dims[1] as usize, dims[2] as usize, &self.config)
    }
}

/// Resize to the model input square and normalize to CHW [0, 1]
fn preprocess(image: &RgbImage, input_size: u32) -> Array<f32, ndarray::Dim<[usize; 4]>> {
    let resized = image::imageops::resize(
        image,
        input_size,
        input_size,
        image::imageops::FilterType::Triangle,
    );

    let size = input_size as usize;
    let mut input = Array::zeros((1, 3, size, size));
    for y in 0..size {
        for x in 0..size {
            let pixel = resized.get_pixel(x as u32, y as u32);
            input[[0, 0, y, x]] = f32::from(pixel[0]) / 255.0;
            input[[0, 1, y, x]] = f32::from(pixel[1]) / 255.0;
            input[[0, 2, y, x]] = f32::from(pixel[2]) / 255.0;
        }
    }
    input
}

/// Pick the single highest-confidence anchor and assemble its landmark set
///
/// Output layout is `[batch, features, anchors]`; feature `f` of anchor `a`
/// lives at `data[f * num_anchors + a]`.
fn best_landmark_set(
    data: &[f32],
    num_features: usize,
    num_anchors: usize,
    config: &PoseConfig,
) -> Result<Option<LandmarkSet>, PoseError> {
    if num_features != POSE_FEATURES {
        return Err(PoseError::Inference(format!(
            "Expected {POSE_FEATURES} features, got {num_features}"
        )));
    }

    let get = |feature: usize, anchor: usize| data[feature * num_anchors + anchor];

    let mut best: Option<(usize, f32)> = None;
    for anchor in 0..num_anchors {
        let confidence = get(4, anchor);
        if confidence < config.person_threshold {
            continue;
        }
        if best.is_none_or(|(_, c)| confidence > c) {
            best = Some((anchor, confidence));
        }
    }

    let Some((anchor, confidence)) = best else {
        debug!("No body detected");
        return Ok(None);
    };

    let scale = config.input_size as f32;
    let mut landmarks = Vec::with_capacity(17);
    for kp_idx in 0..17 {
        let base = 5 + kp_idx * 3;
        let Some(joint) = JointName::from_index(kp_idx) else {
            continue;
        };
        // Model may output values slightly outside the frame; clamp so
        // downstream scaling stays in bounds
        let x = (get(base, anchor) / scale).clamp(0.0, 1.0);
        let y = (get(base + 1, anchor) / scale).clamp(0.0, 1.0);
        let visibility = get(base + 2, anchor);
        landmarks.push(Landmark::new(joint, x, y, visibility));
    }

    debug!("Body detected with confidence {:.2}", confidence);

    Ok(Some(LandmarkSet {
        confidence,
        landmarks,
    }))
}
