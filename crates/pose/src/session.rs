//! ONNX Runtime session creation

use crate::PoseError;
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::path::Path;

/// Create an optimized ONNX Runtime session for the pose model
///
/// Configures maximum graph optimizations, intra-op parallelism sized to the
/// physical core count, and execution providers in performance order (CoreML,
/// CUDA, CPU fallback). Thread count can be pinned with `SKELFORM_THREADS`.
pub fn create_session(model_path: &Path) -> Result<Session, PoseError> {
    if !model_path.exists() {
        return Err(PoseError::ModelNotFound(model_path.display().to_string()));
    }

    let num_threads = std::env::var("SKELFORM_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or_else(num_cpus::get_physical);

    Session::builder()
        .map_err(|e| PoseError::ModelLoad(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| PoseError::ModelLoad(e.to_string()))?
        .with_intra_threads(num_threads)
        .map_err(|e| PoseError::ModelLoad(e.to_string()))?
        .with_memory_pattern(true)
        .map_err(|e| PoseError::ModelLoad(e.to_string()))?
        .with_execution_providers([
            CoreMLExecutionProvider::default().build(),
            CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ])
        .map_err(|e| PoseError::ModelLoad(e.to_string()))?
        .commit_from_file(model_path)
        .map_err(|e| PoseError::ModelLoad(format!("{}: {e}", model_path.display())))
}
