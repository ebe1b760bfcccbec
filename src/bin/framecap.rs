use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Context as _;
use clap::{ArgAction, Parser, Subcommand};
use framecap::{
    AnalysisCache, CaptureController, CaptureDevice, CaptureToolsConfig, ConvertOpts, FrameStore,
    analysis::{framediff::framediff_image, metrics::load_actions},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "framecap", version)]
struct Cli {
    /// More log output (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print archive metadata, frame count and length.
    Info(InfoArgs),
    /// Compute the standard metrics for an archive as JSON.
    Metrics(MetricsArgs),
    /// Write the archive's encoded video to a file.
    ExtractVideo(ExtractVideoArgs),
    /// Write a PNG visualizing the difference between two frames.
    Framediff(FramediffArgs),
    /// Record from the capture card and convert the result into an archive.
    Capture(CaptureArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    archive: PathBuf,
}

#[derive(Parser, Debug)]
struct MetricsArgs {
    archive: PathBuf,

    /// Device the capture was recorded with.
    #[arg(long, default_value = "decklink")]
    device: CaptureDevice,

    /// JSON list of input actions (`{"type": .., "start": ..}`) for time-to-response.
    #[arg(long)]
    actions: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ExtractVideoArgs {
    archive: PathBuf,
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct FramediffArgs {
    archive: PathBuf,
    a: usize,
    b: usize,
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct CaptureArgs {
    /// Output archive path.
    #[arg(long)]
    out: PathBuf,

    /// Capture resolution (`720p` or `1080p`).
    #[arg(long, default_value = "720p")]
    format: String,

    /// Tools config JSON. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(long, required_unless_present = "max_seconds")]
    frames: Option<u64>,

    /// Stop after this many seconds.
    #[arg(long)]
    max_seconds: Option<f64>,

    /// JSON object merged into the archive metadata.
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Skip encoding the preview video.
    #[arg(long, default_value_t = false)]
    no_video: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Metrics(args) => cmd_metrics(args),
        Command::ExtractVideo(args) => cmd_extract_video(args),
        Command::Framediff(args) => cmd_framediff(args),
        Command::Capture(args) => cmd_capture(args),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let store = FrameStore::open(&args.archive)?;
    print_json(&serde_json::json!({
        "path": store.path(),
        "metadata": store.metadata(),
        "frame_count": store.frame_count(),
        "length": store.length(),
        "has_video": store.video()?.is_some(),
    }))
}

fn cmd_metrics(args: MetricsArgs) -> anyhow::Result<()> {
    let store = FrameStore::open(&args.archive)?;
    let cache = AnalysisCache::for_store(&store);
    let actions = match &args.actions {
        Some(path) => load_actions(path)?,
        None => Vec::new(),
    };
    let metrics = framecap::standard_metrics(&store, &cache, &args.device.profile(), &actions)?;
    print_json(&metrics)
}

fn cmd_extract_video(args: ExtractVideoArgs) -> anyhow::Result<()> {
    let store = FrameStore::open(&args.archive)?;
    let video = store
        .video()?
        .with_context(|| format!("'{}' has no video", args.archive.display()))?;
    std::fs::write(&args.out, video)
        .with_context(|| format!("write video '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_framediff(args: FramediffArgs) -> anyhow::Result<()> {
    let store = FrameStore::open(&args.archive)?;
    let img = framediff_image(&store, args.a, args.b)?;
    img.save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_capture(args: CaptureArgs) -> anyhow::Result<()> {
    let tools = match &args.config {
        Some(path) => CaptureToolsConfig::from_json_file(path)?,
        None => CaptureToolsConfig::default(),
    };
    let metadata = match &args.metadata {
        Some(path) => {
            let bytes =
                std::fs::read(path).with_context(|| format!("read '{}'", path.display()))?;
            serde_json::from_slice(&bytes)
                .with_context(|| format!("parse metadata object '{}'", path.display()))?
        }
        None => serde_json::Map::new(),
    };

    let mut ctl = CaptureController::new(tools)?;
    ctl.start_capture(&args.out, &args.format, metadata)?;

    let deadline = args
        .max_seconds
        .map(|s| Instant::now() + Duration::from_secs_f64(s.max(0.0)));
    loop {
        std::thread::sleep(Duration::from_millis(100));
        let frames = ctl.capture_frame_number();
        if args.frames.is_some_and(|n| frames >= n) {
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        if !ctl.capture_process_running() {
            tracing::warn!(frames, "capture binary exited before the capture was stopped");
            break;
        }
    }
    ctl.terminate_capture()?;
    eprintln!("captured {} frames; converting", ctl.capture_frame_number());

    let report = ctl.convert_capture(ConvertOpts {
        create_video: !args.no_video,
        ..ConvertOpts::default()
    })?;
    print_json(&report)
}
