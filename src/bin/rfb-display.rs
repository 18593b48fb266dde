use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rfb-display", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a JSON-lines rect script and write the final surface as a PNG.
    Replay(ReplayArgs),
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Input script (one JSON command per line).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Display options JSON.
    #[arg(long)]
    opts: Option<PathBuf>,

    /// Initial surface width, before any `resize` command.
    #[arg(long, default_value_t = 0)]
    width: u32,

    /// Initial surface height, before any `resize` command.
    #[arg(long, default_value_t = 0)]
    height: u32,

    /// How long to wait for pending frames after the script ends.
    #[arg(long, default_value_t = 5_000)]
    timeout_ms: u64,

    /// Print render statistics as JSON to stderr.
    #[arg(long)]
    stats: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Replay(args) => cmd_replay(args),
    }
}

fn cmd_replay(args: ReplayArgs) -> anyhow::Result<()> {
    let opts = match &args.opts {
        Some(path) => rfb_display::DisplayOpts::from_path(path)?,
        None => rfb_display::DisplayOpts::default(),
    };
    let script = rfb_display::ReplayScript::from_path(&args.in_path)?;

    let display = rfb_display::Display::new(args.width, args.height, opts)?;
    #[cfg(feature = "media-ffmpeg")]
    let display = if rfb_display::is_ffmpeg_on_path() {
        display.with_video_codec(std::sync::Arc::new(rfb_display::FfmpegVp8Factory::default()))
    } else {
        tracing::warn!("ffmpeg not found on PATH; video rects will be dropped");
        display
    };
    let mut display = display;

    let summary = script.run(&mut display)?;
    if !display.flush_blocking(Duration::from_millis(args.timeout_ms)) {
        let pending = display.pending_frames().len();
        tracing::warn!(pending, "frames still pending after timeout; writing partial surface");
    }

    let surface = display.surface();
    if surface.width() == 0 || surface.height() == 0 {
        anyhow::bail!("surface is empty; the script never sized it (add a resize command)");
    }

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        surface.pixels(),
        surface.width(),
        surface.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    if args.stats {
        let stats = serde_json::to_string_pretty(&display.stats()).context("serialize stats")?;
        eprintln!("{stats}");
    }
    eprintln!(
        "replayed {} commands ({} ticks), wrote {}",
        summary.commands,
        summary.ticks,
        args.out.display()
    );
    Ok(())
}
