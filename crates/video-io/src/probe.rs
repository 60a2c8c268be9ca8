//! Container probing
//!
//! Everything the pipeline needs before consuming the first frame: frame
//! geometry, frame rate, duration, and the total frame count used as the
//! progress denominator.

use ffmpeg_next as ffmpeg;
use skelform_common::{PipelineError, Result};
use std::path::Path;
use tracing::debug;

/// Stream parameters known from the container header
#[derive(Debug, Clone)]
pub struct VideoInfo {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame rate as a rational (numerator, denominator)
    pub frame_rate: (i32, i32),
    /// Total frame count; a probed value when the container records it,
    /// otherwise estimated from duration and frame rate
    pub total_frames: u64,
    /// Whether `total_frames` came from the container rather than an estimate
    pub exact_frame_count: bool,
    /// Duration in seconds
    pub duration: f64,
}

impl VideoInfo {
    /// Frame rate as frames per second
    #[must_use]
    pub fn fps(&self) -> f64 {
        f64::from(self.frame_rate.0) / f64::from(self.frame_rate.1)
    }
}

/// Probe a video container without decoding any frames
///
/// # Errors
///
/// Returns `UnsupportedFormat` if the container cannot be opened or carries
/// no video stream.
pub fn probe(path: &Path) -> Result<VideoInfo> {
    crate::ensure_init();

    let ictx = ffmpeg::format::input(path)
        .map_err(|e| PipelineError::UnsupportedFormat(format!("Failed to open {path:?}: {e}")))?;

    let stream = ictx
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or_else(|| PipelineError::UnsupportedFormat("No video stream found".to_string()))?;

    let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
        .map_err(|e| PipelineError::UnsupportedFormat(format!("Failed to read codec: {e}")))?
        .decoder()
        .video()
        .map_err(|e| PipelineError::UnsupportedFormat(format!("Not a decodable video: {e}")))?;

    let rate = stream.avg_frame_rate();
    let frame_rate = frame_rate_or_default(rate.0, rate.1);

    let duration = ictx.duration() as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE);
    let fps = f64::from(frame_rate.0) / f64::from(frame_rate.1);
    let (total_frames, exact_frame_count) = resolve_total_frames(stream.frames(), duration, fps);

    let info = VideoInfo {
        width: decoder.width(),
        height: decoder.height(),
        frame_rate,
        total_frames,
        exact_frame_count,
        duration,
    };

    debug!(
        "Probed {:?}: {}x{} @ {:.2}fps, {} frames (exact: {})",
        path,
        info.width,
        info.height,
        info.fps(),
        info.total_frames,
        info.exact_frame_count
    );

    Ok(info)
}

/// Fall back to 30fps when the container reports no usable rate
fn frame_rate_or_default(num: i32, den: i32) -> (i32, i32) {
    if num > 0 && den > 0 {
        (num, den)
    } else {
        (30, 1)
    }
}

/// Prefer the container's frame count; estimate from duration otherwise
fn resolve_total_frames(nb_frames: i64, duration: f64, fps: f64) -> (u64, bool) {
    if nb_frames > 0 {
        (nb_frames as u64, true)
    } else if duration > 0.0 && fps > 0.0 {
        ((duration * fps).round() as u64, false)
    } else {
        (0, false)
    }
}
