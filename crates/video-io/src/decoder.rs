//! Streaming video decoder
//!
//! Demuxes and decodes a video on the calling thread, converting every frame
//! to RGB24 and pushing it through a bounded channel in presentation order.
//! Run it on a dedicated thread so decode overlaps detection and encoding;
//! the bounded channel caps frames in flight. The sequence is finite and
//! non-restartable.

use crossbeam_channel::Sender;
use ffmpeg_next as ffmpeg;
use image::RgbImage;
use skelform_common::{PipelineError, Result};
use std::path::Path;
use tracing::{debug, warn};

use crate::VideoFrame;

/// Message from the decode stage
#[derive(Debug)]
pub enum FrameEvent {
    /// Next frame in presentation order
    Frame(VideoFrame),
    /// End of stream; carries the number of frames delivered
    Done(u64),
    /// Fatal decode failure; no further frames follow
    Error(String),
}

/// Decode all frames of `input_path` into `tx`
///
/// Returns the number of frames delivered. If the receiver hangs up (job
/// canceled or aborted), decoding stops early and the partial count is
/// returned; that is not an error. A mid-stream decode failure emits
/// `FrameEvent::Error` before returning.
pub fn decode_stream(input_path: &Path, tx: &Sender<FrameEvent>) -> Result<u64> {
    match run(input_path, tx) {
        Ok(count) => {
            // Receiver may already be gone; that just means nobody is waiting
            let _ = tx.send(FrameEvent::Done(count));
            Ok(count)
        }
        Err(e) => {
            warn!("Decode failed for {:?}: {}", input_path, e);
            let _ = tx.send(FrameEvent::Error(e.to_string()));
            Err(e)
        }
    }
}

fn run(input_path: &Path, tx: &Sender<FrameEvent>) -> Result<u64> {
    crate::ensure_init();

    let mut ictx = ffmpeg::format::input(input_path)
        .map_err(|e| PipelineError::UnsupportedFormat(format!("Failed to open input: {e}")))?;

    let stream = ictx
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or_else(|| PipelineError::UnsupportedFormat("No video stream found".to_string()))?;

    let stream_index = stream.index();
    let time_base = stream.time_base();

    let mut decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
        .map_err(|e| PipelineError::Decode(format!("Failed to create context: {e}")))?
        .decoder()
        .video()
        .map_err(|e| PipelineError::Decode(format!("Failed to create decoder: {e}")))?;

    let width = decoder.width();
    let height = decoder.height();

    let mut scaler = ffmpeg::software::scaling::Context::get(
        decoder.format(),
        width,
        height,
        ffmpeg::format::Pixel::RGB24,
        width,
        height,
        ffmpeg::software::scaling::Flags::BILINEAR,
    )
    .map_err(|e| PipelineError::Decode(format!("Failed to create scaler: {e}")))?;

    let mut frame_number = 0u64;
    let mut decoded = ffmpeg::util::frame::video::Video::empty();
    let mut converted = ffmpeg::util::frame::video::Video::empty();

    for (stream, packet) in ictx.packets() {
        if stream.index() != stream_index {
            continue;
        }

        decoder
            .send_packet(&packet)
            .map_err(|e| PipelineError::Decode(format!("Failed to decode packet: {e}")))?;

        while decoder.receive_frame(&mut decoded).is_ok() {
            if !deliver(
                &decoded,
                &mut converted,
                &mut scaler,
                time_base,
                frame_number,
                tx,
            )? {
                debug!("Frame receiver hung up after {} frames", frame_number);
                return Ok(frame_number);
            }
            frame_number += 1;
        }
    }

    // Flush the decoder
    decoder.send_eof().ok();
    while decoder.receive_frame(&mut decoded).is_ok() {
        if !deliver(
            &decoded,
            &mut converted,
            &mut scaler,
            time_base,
            frame_number,
            tx,
        )? {
            return Ok(frame_number);
        }
        frame_number += 1;
    }

    Ok(frame_number)
}

/// Convert one decoded frame and push it downstream.
///
/// Returns `Ok(false)` when the receiver has hung up.
fn deliver(
    decoded: &ffmpeg::util::frame::video::Video,
    converted: &mut ffmpeg::util::frame::video::Video,
    scaler: &mut ffmpeg::software::scaling::Context,
    time_base: ffmpeg::Rational,
    frame_number: u64,
    tx: &Sender<FrameEvent>,
) -> Result<bool> {
    scaler
        .run(decoded, converted)
        .map_err(|e| PipelineError::Decode(format!("Failed to convert frame: {e}")))?;

    let timestamp = decoded.timestamp().unwrap_or(0) as f64 * f64::from(time_base.0)
        / f64::from(time_base.1);

    let image = frame_to_rgb(converted)?;

    let frame = VideoFrame {
        index: frame_number,
        timestamp,
        image,
    };

    Ok(tx.send(FrameEvent::Frame(frame)).is_ok())
}

/// Copy an RGB24 frame into a contiguous image buffer, dropping row padding
fn frame_to_rgb(frame: &ffmpeg::util::frame::video::Video) -> Result<RgbImage> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let stride = frame.stride(0);
    let plane = frame.data(0);

    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        data.extend_from_slice(&plane[row_start..row_start + width * 3]);
    }

    RgbImage::from_raw(frame.width(), frame.height(), data)
        .ok_or_else(|| PipelineError::Decode("Frame buffer size mismatch".to_string()))
}
