//! Production stage adapters
//!
//! Wires the generic frame loop to the real decode thread. Decoding runs on
//! its own thread so it overlaps detection and encoding; the bounded channel
//! caps frames in flight and provides backpressure.

use crate::worker::FrameSource;
use crossbeam_channel::{bounded, Receiver};
use skelform_common::{PipelineError, Result};
use skelform_video_io::{decode_stream, FrameEvent, VideoFrame};
use std::path::PathBuf;
use std::thread::JoinHandle;
use tracing::warn;

/// Frame source backed by a dedicated decode thread
pub struct DecoderSource {
    rx: Receiver<FrameEvent>,
    join: Option<JoinHandle<Result<u64>>>,
    done: bool,
}

impl DecoderSource {
    /// Spawn the decode thread for `path` with the given channel capacity
    pub fn spawn(path: PathBuf, capacity: usize) -> Result<Self> {
        let (tx, rx) = bounded(capacity);
        let join = std::thread::Builder::new()
            .name("skelform-decode".to_string())
            .spawn(move || decode_stream(&path, &tx))?;

        Ok(Self {
            rx,
            join: Some(join),
            done: false,
        })
    }

    /// Reap the decode thread once the stream has ended
    fn join_thread(&mut self) -> Option<Result<u64>> {
        let join = self.join.take()?;
        match join.join() {
            Ok(result) => Some(result),
            Err(_) => {
                warn!("Decode thread panicked");
                Some(Err(PipelineError::Decode(
                    "Decode thread panicked".to_string(),
                )))
            }
        }
    }
}

impl FrameSource for DecoderSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>> {
        if self.done {
            return Ok(None);
        }

        match self.rx.recv() {
            Ok(FrameEvent::Frame(frame)) => Ok(Some(frame)),
            Ok(FrameEvent::Done(_)) => {
                self.done = true;
                // Surface a decode-side error even if Done raced ahead
                if let Some(Err(e)) = self.join_thread() {
                    return Err(e);
                }
                Ok(None)
            }
            Ok(FrameEvent::Error(message)) => {
                self.done = true;
                self.join_thread();
                Err(PipelineError::Decode(message))
            }
            Err(_) => {
                // Channel closed without a Done event
                self.done = true;
                match self.join_thread() {
                    Some(Err(e)) => Err(e),
                    _ => Err(PipelineError::Decode(
                        "Decoder stopped unexpectedly".to_string(),
                    )),
                }
            }
        }
    }
}

// When the source is dropped early (abort or cancel), the receiver closes and
// the decode thread exits at its next send; no join is required.
