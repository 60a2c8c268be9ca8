//! Submission validation and registry tests
//!
//! A rejected submission must never leave a queryable job record behind.

use skelform_common::{OutputKind, PipelineError, UploadLimits};
use skelform_pipeline::{JobService, PipelineConfig};
use std::path::PathBuf;
use uuid::Uuid;

fn test_config(root: &std::path::Path) -> PipelineConfig {
    PipelineConfig {
        upload_dir: root.join("uploads"),
        results_dir: root.join("results"),
        model_path: PathBuf::from("nonexistent-model.onnx"),
        ..PipelineConfig::default()
    }
}

#[tokio::test]
async fn test_unsupported_extension_rejected_without_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = JobService::new(test_config(dir.path())).expect("service");

    let input = dir.path().join("clip.webm");
    std::fs::write(&input, b"not a video").expect("write");

    let err = service.submit(&input).await.expect_err("must reject");
    assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
    assert!(service.jobs().await.is_empty());
}

#[tokio::test]
async fn test_oversized_upload_rejected_before_probe() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(dir.path());
    config.limits = UploadLimits {
        max_bytes: 4,
        ..UploadLimits::default()
    };
    let service = JobService::new(config).expect("service");

    let input = dir.path().join("clip.mp4");
    std::fs::write(&input, b"way more than four bytes").expect("write");

    let err = service.submit(&input).await.expect_err("must reject");
    assert!(matches!(err, PipelineError::TooLarge { .. }));
    assert!(service.jobs().await.is_empty());
}

#[tokio::test]
async fn test_corrupt_container_rejected_at_submission() {
    skelform_video_io::init().expect("FFmpeg init");

    let dir = tempfile::tempdir().expect("tempdir");
    let service = JobService::new(test_config(dir.path())).expect("service");

    let input = dir.path().join("clip.mp4");
    std::fs::write(&input, b"allowed extension, garbage payload").expect("write");

    let err = service.submit(&input).await.expect_err("must reject");
    assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
    assert!(service.jobs().await.is_empty());
}

#[tokio::test]
async fn test_missing_input_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = JobService::new(test_config(dir.path())).expect("service");

    let err = service
        .submit(&dir.path().join("nope.mp4"))
        .await
        .expect_err("must reject");
    assert!(matches!(err, PipelineError::Io(_)));
}

#[tokio::test]
async fn test_unknown_job_queries_are_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = JobService::new(test_config(dir.path())).expect("service");
    let id = Uuid::new_v4();

    assert!(matches!(
        service.status(id).await,
        Err(PipelineError::NotFound(_))
    ));
    assert!(matches!(
        service.result(id, OutputKind::Skeleton).await,
        Err(PipelineError::NotFound(_))
    ));
    assert!(matches!(
        service.cancel(id).await,
        Err(PipelineError::NotFound(_))
    ));
}
