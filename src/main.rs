//! `dance-analyzer` - annotate a dance video with the detected skeleton and
//! print movement metrics as JSON.
//!
//! ```bash
//! dance-analyzer input.mp4 annotated.mp4 --fps 10 --max-frames 120
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use dance_analyzer_lib::{AnalyzerConfig, DefaultPoseBackend, VideoAnnotator};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "dance-analyzer", version, about = "Dance movement analyzer", long_about = None)]
struct Args {
    /// Video to analyze
    input: PathBuf,

    /// Where to write the annotated video (overwritten if present)
    output: PathBuf,

    /// Output frame rate; defaults to the source rate
    #[arg(long, value_name = "FPS")]
    fps: Option<f64>,

    /// Stop after this many frames (defaults to the configured cap)
    #[arg(long, value_name = "N", conflicts_with = "no_limit")]
    max_frames: Option<u32>,

    /// Process the whole video
    #[arg(long, default_value_t = false)]
    no_limit: bool,

    /// Configuration file; defaults to ~/.dance_analyzer/config/settings.json
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pretty-print the metrics JSON
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let config = match args.config.as_deref() {
        Some(path) => AnalyzerConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load configuration {}: {}", path.display(), e))?,
        None => AnalyzerConfig::load()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?,
    };

    let max_frames = if args.no_limit {
        None
    } else {
        Some(args.max_frames.unwrap_or(config.default_max_frames))
    };

    let annotator = VideoAnnotator::new(Arc::new(DefaultPoseBackend::default()), config);
    let result = annotator
        .process_async(args.input.clone(), args.output.clone(), args.fps, max_frames)
        .await
        .with_context(|| format!("Failed to process {}", args.input.display()))?;

    if result.frames_written == 0 {
        bail!("No frames were written from {}", args.input.display());
    }
    if !args.output.is_file() {
        bail!("Output file was not created: {}", args.output.display());
    }

    let json = if args.pretty {
        serde_json::to_string_pretty(&result.metrics)?
    } else {
        serde_json::to_string(&result.metrics)?
    };
    println!("{}", json);

    Ok(())
}
