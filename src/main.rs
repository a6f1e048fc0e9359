//! marker-tracker CLI: tracks one marker through a batch of raw YUV sequences

use anyhow::{bail, Context};
use clap::Parser;
use marker_core::{SequenceList, SequenceSummary};
use marker_cv::ChromaFormat;
use marker_tracker::{FrameFormat, Result, RunConfig, SequenceDriver};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "marker-tracker", about = "Track a color marker through raw YUV sequences")]
#[command(version)]
struct Args {
    /// Number of sequences to process
    #[arg(long)]
    nseq: usize,
    /// Number of result rows (frames) per sequence
    #[arg(long)]
    nframes: usize,
    /// List file of sequence paths
    #[arg(long, value_name = "PATH")]
    seq: PathBuf,
    /// List file of reference mask paths, one per sequence
    #[arg(long, value_name = "PATH")]
    mask: PathBuf,
    #[arg(long)]
    width: u32,
    #[arg(long)]
    height: u32,
    /// Chroma subsampling: 420, 422 or 444
    #[arg(long, default_value_t = 420)]
    chroma: u32,
    /// Read every N-th frame
    #[arg(long, default_value_t = 1)]
    frame_step: usize,
    /// Output position table
    #[arg(long, value_name = "PATH")]
    out: PathBuf,
    /// JSON file overriding detector and tracker settings
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Write per-sequence statistics as JSON
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if args.frame_step == 0 {
        bail!("--frame-step must be at least 1");
    }

    let config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    let format = FrameFormat {
        width: args.width,
        height: args.height,
        chroma: ChromaFormat::try_from(args.chroma)?,
        frame_step: args.frame_step,
    };

    let mut list = SequenceList::load(&args.seq, &args.mask)?;
    list.truncate(args.nseq);
    info!("Tracking {} sequences of {}x{}", list.len(), format.width, format.height);

    let driver = SequenceDriver::new(config, args.nframes);
    let table = driver.run_batch(&list, format)?;
    table.save(&args.out)?;

    if let Some(path) = &args.summary {
        let summaries: Vec<SequenceSummary> =
            table.sequences().iter().map(|s| s.summary()).collect();
        let file = File::create(path)
            .with_context(|| format!("Failed to create summary file: {:?}", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &summaries)
            .with_context(|| format!("Failed to write summary file: {:?}", path))?;
        info!("Wrote summary of {} sequences to {:?}", summaries.len(), path);
    }

    Ok(())
}
