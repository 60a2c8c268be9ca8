//! Frame-loop scenario tests
//!
//! These drive `run_job` through stub stages, covering the ordering,
//! progress, and cleanup guarantees without touching FFmpeg or ONNX Runtime.

use image::{Rgb, RgbImage};
use skelform_common::{
    JointName, Landmark, LandmarkSet, PipelineError,
};
use skelform_pipeline::{run_job, FrameSink, FrameSource, JobHandle, LandmarkBackend};
use skelform_render::RenderStyle;
use skelform_video_io::VideoFrame;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

fn make_frame(index: u64, width: u32, height: u32) -> VideoFrame {
    let shade = (index * 17 % 256) as u8;
    VideoFrame {
        index,
        timestamp: index as f64 / 30.0,
        image: RgbImage::from_pixel(width, height, Rgb([shade, 64, 128])),
    }
}

struct StubSource {
    frames: VecDeque<VideoFrame>,
    fail_at: Option<u64>,
    next_index: u64,
}

impl StubSource {
    fn new(count: u64) -> Self {
        Self {
            frames: (0..count).map(|i| make_frame(i, 32, 24)).collect(),
            fail_at: None,
            next_index: 0,
        }
    }

    fn failing_at(count: u64, fail_at: u64) -> Self {
        let mut source = Self::new(count);
        source.fail_at = Some(fail_at);
        source
    }
}

impl FrameSource for StubSource {
    fn next_frame(&mut self) -> skelform_common::Result<Option<VideoFrame>> {
        if self.fail_at == Some(self.next_index) {
            return Err(PipelineError::Decode("corrupt packet".to_string()));
        }
        self.next_index += 1;
        Ok(self.frames.pop_front())
    }
}

#[derive(Default)]
struct SinkState {
    frames: Vec<RgbImage>,
    finished: bool,
    discarded: bool,
}

#[derive(Clone, Default)]
struct SharedSink {
    state: Arc<Mutex<SinkState>>,
}

impl SharedSink {
    fn frames(&self) -> Vec<RgbImage> {
        self.state.lock().unwrap().frames.clone()
    }

    fn finished(&self) -> bool {
        self.state.lock().unwrap().finished
    }

    fn discarded(&self) -> bool {
        self.state.lock().unwrap().discarded
    }
}

impl FrameSink for SharedSink {
    fn write(&mut self, image: &RgbImage) -> skelform_common::Result<()> {
        self.state.lock().unwrap().frames.push(image.clone());
        Ok(())
    }

    fn finish(&mut self) -> skelform_common::Result<()> {
        self.state.lock().unwrap().finished = true;
        Ok(())
    }

    fn discard(self) -> skelform_common::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.discarded = true;
        state.frames.clear();
        Ok(())
    }
}

struct NoBodyBackend;

impl LandmarkBackend for NoBodyBackend {
    fn detect(&self, _image: &RgbImage) -> skelform_common::Result<Option<LandmarkSet>> {
        Ok(None)
    }
}

struct FixedBackend(LandmarkSet);

impl LandmarkBackend for FixedBackend {
    fn detect(&self, _image: &RgbImage) -> skelform_common::Result<Option<LandmarkSet>> {
        Ok(Some(self.0.clone()))
    }
}

struct FaultyBackend;

impl LandmarkBackend for FaultyBackend {
    fn detect(&self, _image: &RgbImage) -> skelform_common::Result<Option<LandmarkSet>> {
        Err(PipelineError::DetectorFault(
            "inference session crashed".to_string(),
        ))
    }
}

fn shoulders() -> LandmarkSet {
    LandmarkSet {
        confidence: 0.9,
        landmarks: vec![
            Landmark::new(JointName::LeftShoulder, 0.25, 0.5, 0.9),
            Landmark::new(JointName::RightShoulder, 0.75, 0.5, 0.9),
        ],
    }
}

#[test]
fn test_three_frames_no_body_completes_with_identity_overlay() {
    let handle = JobHandle::new(Uuid::new_v4(), 3);
    let skeleton = SharedSink::default();
    let overlay = SharedSink::default();

    run_job(
        StubSource::new(3),
        &NoBodyBackend,
        skeleton.clone(),
        overlay.clone(),
        &RenderStyle::default(),
        &handle,
        Some(3),
    )
    .expect("job must complete");

    assert_eq!(handle.frames_done(), 3);
    assert!(skeleton.finished() && overlay.finished());
    assert!(!skeleton.discarded() && !overlay.discarded());

    let skeleton_frames = skeleton.frames();
    let overlay_frames = overlay.frames();
    assert_eq!(skeleton_frames.len(), 3);
    assert_eq!(overlay_frames.len(), 3);

    for (i, frame) in overlay_frames.iter().enumerate() {
        // Overlay is pixel-identical to the input when nothing was detected
        assert_eq!(frame.as_raw(), make_frame(i as u64, 32, 24).image.as_raw());
    }
    for frame in &skeleton_frames {
        assert!(frame.pixels().all(|p| p.0 == [0, 0, 0]));
    }
}

#[test]
fn test_detection_appears_in_both_outputs_in_order() {
    let handle = JobHandle::new(Uuid::new_v4(), 2);
    let skeleton = SharedSink::default();
    let overlay = SharedSink::default();

    run_job(
        StubSource::new(2),
        &FixedBackend(shoulders()),
        skeleton.clone(),
        overlay.clone(),
        &RenderStyle::default(),
        &handle,
        Some(2),
    )
    .expect("job must complete");

    for frames in [skeleton.frames(), overlay.frames()] {
        assert_eq!(frames.len(), 2);
        for frame in &frames {
            assert!(frame.pixels().any(|p| p.0 != [0, 0, 0]));
        }
    }
    // Overlay frames keep their per-frame background, proving order survived
    let overlays = overlay.frames();
    assert_eq!(overlays[0].get_pixel(0, 0).0[0], 0);
    assert_eq!(overlays[1].get_pixel(0, 0).0[0], 17);
}

#[test]
fn test_corrupt_stream_fails_and_discards_partials() {
    let handle = JobHandle::new(Uuid::new_v4(), 20);
    let skeleton = SharedSink::default();
    let overlay = SharedSink::default();

    let err = run_job(
        StubSource::failing_at(20, 10),
        &NoBodyBackend,
        skeleton.clone(),
        overlay.clone(),
        &RenderStyle::default(),
        &handle,
        Some(20),
    )
    .expect_err("corrupt stream must fail");

    assert_eq!(err.category(), skelform_common::ErrorCategory::Io);
    assert_eq!(handle.frames_done(), 10);
    assert!(skeleton.discarded() && overlay.discarded());
    assert!(!skeleton.finished() && !overlay.finished());
    assert!(skeleton.frames().is_empty() && overlay.frames().is_empty());
}

#[test]
fn test_truncated_stream_with_exact_count_fails() {
    let handle = JobHandle::new(Uuid::new_v4(), 20);
    let skeleton = SharedSink::default();
    let overlay = SharedSink::default();

    let err = run_job(
        StubSource::new(10),
        &NoBodyBackend,
        skeleton.clone(),
        overlay.clone(),
        &RenderStyle::default(),
        &handle,
        Some(20),
    )
    .expect_err("truncated stream must fail");

    assert_eq!(err.category(), skelform_common::ErrorCategory::Io);
    assert!(skeleton.discarded() && overlay.discarded());
}

#[test]
fn test_detector_fault_aborts_job() {
    let handle = JobHandle::new(Uuid::new_v4(), 5);
    let skeleton = SharedSink::default();
    let overlay = SharedSink::default();

    let err = run_job(
        StubSource::new(5),
        &FaultyBackend,
        skeleton.clone(),
        overlay.clone(),
        &RenderStyle::default(),
        &handle,
        Some(5),
    )
    .expect_err("detector fault must fail the job");

    assert_eq!(
        err.category(),
        skelform_common::ErrorCategory::DetectorFault
    );
    assert_eq!(handle.frames_done(), 0);
    assert!(skeleton.discarded() && overlay.discarded());
}

#[test]
fn test_cancellation_between_frames() {
    let handle = JobHandle::new(Uuid::new_v4(), 5);
    handle.request_cancel();

    let skeleton = SharedSink::default();
    let overlay = SharedSink::default();

    let err = run_job(
        StubSource::new(5),
        &NoBodyBackend,
        skeleton.clone(),
        overlay.clone(),
        &RenderStyle::default(),
        &handle,
        Some(5),
    )
    .expect_err("canceled job must not complete");

    assert!(matches!(err, PipelineError::Canceled));
    assert_eq!(handle.frames_done(), 0);
    assert!(skeleton.discarded() && overlay.discarded());
}

#[test]
fn test_zero_frame_stream_completes_with_empty_outputs() {
    let handle = JobHandle::new(Uuid::new_v4(), 0);
    let skeleton = SharedSink::default();
    let overlay = SharedSink::default();

    run_job(
        StubSource::new(0),
        &NoBodyBackend,
        skeleton.clone(),
        overlay.clone(),
        &RenderStyle::default(),
        &handle,
        None,
    )
    .expect("zero-frame input completes");

    assert_eq!(handle.frames_done(), 0);
    assert!(skeleton.finished() && overlay.finished());
    assert!(skeleton.frames().is_empty() && overlay.frames().is_empty());
}

#[test]
fn test_concurrent_jobs_fail_independently() {
    let good = std::thread::spawn(|| {
        let handle = JobHandle::new(Uuid::new_v4(), 8);
        let skeleton = SharedSink::default();
        let overlay = SharedSink::default();
        let result = run_job(
            StubSource::new(8),
            &NoBodyBackend,
            skeleton.clone(),
            overlay.clone(),
            &RenderStyle::default(),
            &handle,
            Some(8),
        );
        (result, handle.frames_done(), skeleton.finished())
    });

    let bad = std::thread::spawn(|| {
        let handle = JobHandle::new(Uuid::new_v4(), 8);
        let skeleton = SharedSink::default();
        let overlay = SharedSink::default();
        let result = run_job(
            StubSource::failing_at(8, 4),
            &NoBodyBackend,
            skeleton.clone(),
            overlay.clone(),
            &RenderStyle::default(),
            &handle,
            Some(8),
        );
        (result, skeleton.discarded())
    });

    let (good_result, good_frames, good_finished) = good.join().unwrap();
    let (bad_result, bad_discarded) = bad.join().unwrap();

    assert!(good_result.is_ok());
    assert_eq!(good_frames, 8);
    assert!(good_finished);

    assert!(bad_result.is_err());
    assert!(bad_discarded);
}
