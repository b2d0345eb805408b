use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use grisaille::{
    FfmpegEngine, FfmpegFrameSource, GrayscaleProgram, Pipeline, RunObserver, RunOptions,
    RunPhase, RunWarning, SampleRate, probe_source,
};

#[derive(Parser, Debug)]
#[command(name = "grisaille", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print duration and dimensions of a source video (requires `ffprobe`).
    Probe(ProbeArgs),
    /// Sample, grayscale, and recompose a video into an MP4 (requires
    /// `ffmpeg` and `ffprobe` on PATH).
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Input video file.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input video file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long, default_value = "output_grayscale.mp4")]
    out: PathBuf,

    /// Ceiling on the sampled duration, in seconds.
    #[arg(long, default_value_t = 10.0)]
    cap_secs: f64,

    /// Sampling cadence in Hz.
    #[arg(long, default_value_t = 10)]
    rate: u32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Probe(args) => cmd_probe(args),
        Command::Run(args) => cmd_run(args),
    }
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let info = probe_source(&args.in_path)?;
    match info.dimensions {
        Some(c) => println!(
            "{}: {:.2}s, {}x{}",
            args.in_path.display(),
            info.duration_secs,
            c.width,
            c.height
        ),
        None => println!(
            "{}: {:.2}s, unknown dimensions",
            args.in_path.display(),
            info.duration_secs
        ),
    }
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let mut source = FfmpegFrameSource::open(&args.in_path)?;
    let mut engine = FfmpegEngine::new();
    let program = GrayscaleProgram;

    let opts = RunOptions {
        cap_secs: args.cap_secs,
        sample_rate: SampleRate::new(args.rate)?,
        ..RunOptions::default()
    };

    let mut pipeline = Pipeline::new(&mut source, &mut engine, &program, opts)?;
    let artifact = pipeline.run(&mut StatusLine)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &artifact.bytes)
        .with_context(|| format!("write output '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({} frames, {} missed, {} dropped)",
        args.out.display(),
        artifact.stats.frames_written,
        artifact.stats.frames_missed,
        artifact.stats.frames_dropped
    );
    Ok(())
}

/// Streams run status to stderr, one short line per event.
struct StatusLine;

impl RunObserver for StatusLine {
    fn phase(&mut self, phase: RunPhase) {
        let line = match phase {
            RunPhase::InitializingEngine => "initializing encoder (first use may be slow)...",
            RunPhase::Sampling => "sampling and filtering frames...",
            RunPhase::Recomposing => "all frames written, recomposing...",
            RunPhase::ReadingBack => "recomposition done, reading artifact...",
        };
        eprintln!("{line}");
    }

    fn progress(&mut self, current: u32, total: u32) {
        eprintln!("processed frame {current} / {total}");
    }

    fn warning(&mut self, warning: &RunWarning) {
        match warning {
            RunWarning::FrameMissed {
                sample,
                timestamp_secs,
                reason,
            } => eprintln!("warning: sample {sample} at {timestamp_secs:.2}s missed ({reason})"),
            RunWarning::FrameWriteFailed { sample, error } => {
                eprintln!("warning: sample {sample} write failed ({error})")
            }
        }
    }
}
