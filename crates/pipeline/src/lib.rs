//! Job pipeline for skeleton form analysis
//!
//! Orchestrates decode → detect → render → encode per uploaded video. Each
//! job runs as one logically sequential unit of work on a blocking task, with
//! the decode stage overlapped on its own thread through a bounded channel.
//! Job state is observable at any time through lock-free progress counters,
//! and any abort path (failure, cancellation) discards partial outputs before
//! the job turns terminal.

pub mod adapters;
pub mod config;
pub mod job;
pub mod retention;
pub mod service;
pub mod worker;

pub use config::PipelineConfig;
pub use job::{JobHandle, JobOutputs};
pub use service::JobService;
pub use worker::{run_job, FrameSink, FrameSource, LandmarkBackend};
