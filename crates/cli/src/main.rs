/// Skeleton form analysis driver
///
/// Submits one video to the job pipeline, polls progress, and prints the two
/// result paths on completion.
use clap::Parser;
use skelform_common::{JobState, OutputKind};
use skelform_pipeline::{JobService, PipelineConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "skelform",
    version,
    about = "Render skeleton and overlay videos from a pose analysis of the input"
)]
struct Args {
    /// Input video (mp4 / mov / m4v / avi / mkv)
    input: PathBuf,

    /// Path to the YOLOv8-Pose ONNX model
    #[arg(long, default_value = "models/yolov8n-pose.onnx")]
    model: PathBuf,

    /// Working directory for uploads and results
    #[arg(long, default_value = "data")]
    work_dir: PathBuf,

    /// Status poll interval in milliseconds
    #[arg(long, default_value_t = 500)]
    poll_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();

    skelform_video_io::init()?;

    let config = PipelineConfig {
        upload_dir: args.work_dir.join("uploads"),
        results_dir: args.work_dir.join("results"),
        model_path: args.model,
        ..PipelineConfig::default()
    };
    let service = JobService::new(config)?;
    let _sweeper = service.spawn_sweeper();

    let job_id = service.submit(&args.input).await?;
    info!("Submitted job {}", job_id);

    loop {
        let status = service.status(job_id).await?;
        info!(
            "Job {}: {:?}, {}/{} frames ({:.0}%)",
            job_id,
            status.state,
            status.frames_done,
            status.total_frames,
            status.progress * 100.0
        );

        match status.state {
            JobState::Completed => {
                let skeleton = service.result(job_id, OutputKind::Skeleton).await?;
                let overlay = service.result(job_id, OutputKind::Overlay).await?;
                println!("Skeleton video: {}", skeleton.display());
                println!("Overlay video:  {}", overlay.display());
                return Ok(());
            }
            JobState::Failed => {
                if let Some(failure) = status.error {
                    eprintln!("Job failed ({:?}): {}", failure.category, failure.message);
                } else {
                    eprintln!("Job failed");
                }
                std::process::exit(1);
            }
            JobState::Canceled => {
                eprintln!("Job canceled");
                std::process::exit(1);
            }
            JobState::Pending | JobState::Processing => {
                tokio::time::sleep(Duration::from_millis(args.poll_ms)).await;
            }
        }
    }
}
