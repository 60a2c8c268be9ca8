//! Per-job frame loop
//!
//! The loop is generic over its three collaborators so the failure-handling
//! and ordering guarantees are testable without FFmpeg or ONNX Runtime: a
//! frame source (decode stage), a landmark backend (detector), and two frame
//! sinks (the output encoders).

use crate::job::JobHandle;
use image::RgbImage;
use skelform_common::{LandmarkSet, PipelineError, Result};
use skelform_render::{render_frame, RenderStyle};
use skelform_video_io::VideoFrame;
use tracing::{debug, warn};

/// Lazy, finite, non-restartable sequence of frames in presentation order
pub trait FrameSource {
    /// Next frame, `Ok(None)` at end of stream
    fn next_frame(&mut self) -> Result<Option<VideoFrame>>;
}

/// Black-box landmark detector
pub trait LandmarkBackend {
    /// Zero-or-one landmark set for one frame; errors are execution faults,
    /// never "no body found"
    fn detect(&self, image: &RgbImage) -> Result<Option<LandmarkSet>>;
}

/// Ordered sink for one output video
pub trait FrameSink {
    /// Append the next frame
    fn write(&mut self, image: &RgbImage) -> Result<()>;
    /// Finalize the stream (idempotent)
    fn finish(&mut self) -> Result<()>;
    /// Delete the (possibly partial) output instead of finalizing it
    fn discard(self) -> Result<()>
    where
        Self: Sized;
}

// The production encoder already satisfies the sink contract
impl FrameSink for skelform_video_io::VideoEncoder {
    fn write(&mut self, image: &RgbImage) -> Result<()> {
        skelform_video_io::VideoEncoder::write(self, image)
    }

    fn finish(&mut self) -> Result<()> {
        skelform_video_io::VideoEncoder::finish(self)
    }

    fn discard(self) -> Result<()> {
        skelform_video_io::VideoEncoder::discard(self)
    }
}

// The production detector maps its faults into the pipeline taxonomy
impl LandmarkBackend for skelform_pose::PoseDetector {
    fn detect(&self, image: &RgbImage) -> Result<Option<LandmarkSet>> {
        skelform_pose::PoseDetector::detect(self, image).map_err(PipelineError::from)
    }
}

/// Run one job's frame loop to completion.
///
/// Every abort path (decode failure, detector fault, sink failure,
/// cancellation, truncated stream) discards both outputs before returning, so
/// a job can never turn terminal with partial output still on disk. On
/// success both sinks are finalized and hold exactly one frame per input
/// frame, in input order.
///
/// `expected_frames` is enforced when the container declared an exact frame
/// count; a stream that ends early is a mid-stream failure, not a success.
pub fn run_job<S, B, K>(
    mut source: S,
    backend: &B,
    mut skeleton: K,
    mut overlay: K,
    style: &RenderStyle,
    handle: &JobHandle,
    expected_frames: Option<u64>,
) -> Result<()>
where
    S: FrameSource,
    B: LandmarkBackend + ?Sized,
    K: FrameSink,
{
    loop {
        // Cancellation is cooperative, checked between frames
        if handle.cancel_requested() {
            debug!("Job {} canceled after {} frames", handle.id(), handle.frames_done());
            abort(skeleton, overlay);
            return Err(PipelineError::Canceled);
        }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                abort(skeleton, overlay);
                return Err(e);
            }
        };

        // The source contract is strict presentation order
        if frame.index != handle.frames_done() {
            abort(skeleton, overlay);
            return Err(PipelineError::Decode(format!(
                "Frame {} arrived out of order (expected {})",
                frame.index,
                handle.frames_done()
            )));
        }

        let landmarks = match backend.detect(&frame.image) {
            Ok(landmarks) => landmarks,
            Err(e) => {
                abort(skeleton, overlay);
                return Err(e);
            }
        };

        let pair = render_frame(&frame.image, landmarks.as_ref(), style);

        if let Err(e) = skeleton.write(&pair.skeleton) {
            abort(skeleton, overlay);
            return Err(e);
        }
        if let Err(e) = overlay.write(&pair.overlay) {
            abort(skeleton, overlay);
            return Err(e);
        }

        handle.record_frame();
    }

    if let Some(expected) = expected_frames {
        let done = handle.frames_done();
        if done < expected {
            abort(skeleton, overlay);
            return Err(PipelineError::Decode(format!(
                "Stream ended early: {done} of {expected} frames"
            )));
        }
    }

    if let Err(e) = skeleton.finish() {
        abort(skeleton, overlay);
        return Err(e);
    }
    if let Err(e) = overlay.finish() {
        abort(skeleton, overlay);
        return Err(e);
    }

    Ok(())
}

/// Discard both outputs, logging rather than masking the original error
fn abort<K: FrameSink>(skeleton: K, overlay: K) {
    if let Err(e) = skeleton.discard() {
        warn!("Failed to discard skeleton output: {}", e);
    }
    if let Err(e) = overlay.discard() {
        warn!("Failed to discard overlay output: {}", e);
    }
}
