/// Video container I/O built on `FFmpeg`
///
/// Three thin adaptations over ffmpeg-next:
/// 1. `probe()`: container header inspection before any frame is consumed
/// 2. `decode_stream()`: lazy, finite, non-restartable frame sequence pushed
///    through a bounded channel (run it on a dedicated thread)
/// 3. `VideoEncoder`: ordered frame sink with idempotent finalization and an
///    explicit discard path for partial files
pub mod decoder;
pub mod encoder;
pub mod probe;

use image::RgbImage;
use skelform_common::{PipelineError, Result};

pub use decoder::{decode_stream, FrameEvent};
pub use encoder::VideoEncoder;
pub use probe::{probe, VideoInfo};

/// Decoded video frame in presentation order
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Frame number (0-indexed)
    pub index: u64,
    /// Frame timestamp in seconds
    pub timestamp: f64,
    /// Decoded pixels in RGB24
    pub image: RgbImage,
}

/// Initialize the `FFmpeg` library (call once at startup)
pub fn init() -> Result<()> {
    ffmpeg_next::init()
        .map_err(|e| PipelineError::Decode(format!("Failed to initialize FFmpeg: {e}")))
}

/// Idempotent `FFmpeg` initialization for internal call sites
fn ensure_init() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        ffmpeg_next::init().expect("Failed to initialize FFmpeg");
    });
}
