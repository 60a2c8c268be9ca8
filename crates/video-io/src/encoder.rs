//! H.264 video encoder
//!
//! Ordered frame sink over an mp4 container. Frames are accepted one at a
//! time in presentation order; `finish()` is idempotent and always leaves a
//! well-formed (possibly truncated) file, while `discard()` deletes the
//! partial file instead so an aborted job never leaves output that looks
//! complete.

use ffmpeg_next as ffmpeg;
use ffmpeg::{codec, encoder, format, frame, software::scaling, Dictionary, Packet, Rational};
use image::RgbImage;
use skelform_common::{PipelineError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Encoder for one output video stream
pub struct VideoEncoder {
    octx: format::context::Output,
    encoder: encoder::video::Encoder,
    scaler: scaling::Context,
    path: PathBuf,
    enc_time_base: Rational,
    stream_time_base: Rational,
    width: u32,
    height: u32,
    next_pts: i64,
    finished: bool,
}

impl VideoEncoder {
    /// Open an H.264/mp4 encoder matching the input's geometry and frame rate
    ///
    /// # Errors
    ///
    /// Returns `Encode` if the container cannot be created or the H.264
    /// encoder is unavailable.
    pub fn create(path: &Path, width: u32, height: u32, frame_rate: (i32, i32)) -> Result<Self> {
        crate::ensure_init();

        let mut octx = format::output(path)
            .map_err(|e| PipelineError::Encode(format!("Failed to create output {path:?}: {e}")))?;

        let global_header = octx
            .format()
            .flags()
            .contains(format::Flags::GLOBAL_HEADER);

        let rate = Rational(frame_rate.0, frame_rate.1);
        let enc_time_base = rate.invert();

        let opened = {
            let mut ost = octx
                .add_stream(encoder::find(codec::Id::H264))
                .map_err(|e| PipelineError::Encode(format!("Failed to add stream: {e}")))?;

            let mut enc = codec::context::Context::from_parameters(ost.parameters())
                .map_err(|e| PipelineError::Encode(format!("Failed to create context: {e}")))?
                .encoder()
                .video()
                .map_err(|e| PipelineError::Encode(format!("H.264 encoder unavailable: {e}")))?;

            enc.set_width(width);
            enc.set_height(height);
            enc.set_format(format::Pixel::YUV420P);
            enc.set_frame_rate(Some(rate));
            enc.set_time_base(enc_time_base);
            if global_header {
                enc.set_flags(codec::Flags::GLOBAL_HEADER);
            }

            let mut opts = Dictionary::new();
            opts.set("preset", "medium");
            opts.set("crf", "23");

            let opened = enc
                .open_with(opts)
                .map_err(|e| PipelineError::Encode(format!("Failed to open encoder: {e}")))?;
            ost.set_parameters(&opened);
            opened
        };

        octx.write_header()
            .map_err(|e| PipelineError::Encode(format!("Failed to write header: {e}")))?;

        let stream_time_base = octx
            .stream(0)
            .ok_or_else(|| PipelineError::Encode("Output stream missing".to_string()))?
            .time_base();

        let scaler = scaling::Context::get(
            format::Pixel::RGB24,
            width,
            height,
            format::Pixel::YUV420P,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .map_err(|e| PipelineError::Encode(format!("Failed to create scaler: {e}")))?;

        debug!(
            "Opened encoder {:?}: {}x{} @ {}/{}",
            path, width, height, frame_rate.0, frame_rate.1
        );

        Ok(Self {
            octx,
            encoder: opened,
            scaler,
            path: path.to_path_buf(),
            enc_time_base,
            stream_time_base,
            width,
            height,
            next_pts: 0,
            finished: false,
        })
    }

    /// Path of the file being written
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the next frame in presentation order
    ///
    /// # Errors
    ///
    /// Returns `Encode` if the image geometry does not match the stream or
    /// the encoder has already been finalized.
    pub fn write(&mut self, image: &RgbImage) -> Result<()> {
        if self.finished {
            return Err(PipelineError::Encode(
                "Encoder already finalized".to_string(),
            ));
        }
        if image.width() != self.width || image.height() != self.height {
            return Err(PipelineError::Encode(format!(
                "Frame size {}x{} does not match stream {}x{}",
                image.width(),
                image.height(),
                self.width,
                self.height
            )));
        }

        let mut src = frame::Video::new(format::Pixel::RGB24, self.width, self.height);
        let stride = src.stride(0);
        let row_len = self.width as usize * 3;
        {
            let data = src.data_mut(0);
            for (y, row) in image.as_raw().chunks_exact(row_len).enumerate() {
                let start = y * stride;
                data[start..start + row_len].copy_from_slice(row);
            }
        }

        let mut yuv = frame::Video::empty();
        self.scaler
            .run(&src, &mut yuv)
            .map_err(|e| PipelineError::Encode(format!("Failed to convert frame: {e}")))?;
        yuv.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder
            .send_frame(&yuv)
            .map_err(|e| PipelineError::Encode(format!("Failed to encode frame: {e}")))?;

        self.drain_packets()
    }

    /// Flush the encoder and close the container
    ///
    /// Idempotent; safe on a partially written stream, which yields a
    /// well-formed truncated file.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }

        self.encoder
            .send_eof()
            .map_err(|e| PipelineError::Encode(format!("Failed to flush encoder: {e}")))?;
        self.drain_packets()?;

        self.octx
            .write_trailer()
            .map_err(|e| PipelineError::Encode(format!("Failed to write trailer: {e}")))?;

        self.finished = true;
        debug!("Finalized {:?} ({} frames)", self.path, self.next_pts);
        Ok(())
    }

    /// Close the stream and delete the file
    ///
    /// Used when a job fails or is canceled after frames were written; a
    /// partial output must never be left looking complete.
    pub fn discard(mut self) -> Result<()> {
        let path = self.path.clone();
        if !self.finished {
            // Ignore flush errors on a stream we are about to unlink
            if let Err(e) = self.finish() {
                warn!("Ignoring finalize error while discarding {:?}: {}", path, e);
            }
        }
        drop(self);

        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write out any packets the encoder has ready
    fn drain_packets(&mut self) -> Result<()> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(0);
            packet.rescale_ts(self.enc_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.octx)
                .map_err(|e| PipelineError::Encode(format!("Failed to write packet: {e}")))?;
        }
        Ok(())
    }
}
