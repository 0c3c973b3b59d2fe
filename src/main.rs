//! skottie-view - headless player for Lottie files.
//!
//! Drives a [`LottieView`] the way a windowing system would: every repaint the
//! view requests is honoured on a virtual clock, so `play` renders frames at
//! the view's own cadence without waiting in real time.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use skia_safe::{surfaces, EncodedImageFormat, IRect};
use skottie_view::{
    FrameScheduler, LottieView, LottieViewConfig, MeasureSpec, RawResourceDir, FRAME_DELAY,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skottie-view", version, about = "Play Lottie animations headlessly")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print duration and size of an animation
    Info(Source),
    /// Run the paint loop and optionally save frames as PNG
    Play(PlayArgs),
}

#[derive(Args)]
struct Source {
    /// Animation file name (raw resource name or filesystem path)
    file: Option<String>,

    /// Directory of bundled raw resources, searched before the filesystem
    #[arg(long)]
    raw_dir: Option<PathBuf>,

    /// JSON view configuration ({"lottie_fileName": ...})
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct PlayArgs {
    #[command(flatten)]
    source: Source,

    /// Number of paints to run
    #[arg(long, default_value_t = 60)]
    frames: usize,

    /// Surface width (defaults to the measured width)
    #[arg(long)]
    width: Option<i32>,

    /// Surface height (defaults to the measured height)
    #[arg(long)]
    height: Option<i32>,

    /// Directory to write frame_NNN.png files into
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    match cli.command {
        Command::Info(source) => run_info(&source),
        Command::Play(args) => run_play(&args),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_view(source: &Source, scheduler: Rc<FrameScheduler>) -> Result<LottieView> {
    let mut view = LottieView::new(scheduler);
    if let Some(dir) = &source.raw_dir {
        let store = RawResourceDir::open(dir)
            .with_context(|| format!("Failed to index raw resources in {}", dir.display()))?;
        info!("Raw resources: {} entries in {}", store.len(), store.root().display());
        view = view.with_resources(store);
    }

    let mut config = match &source.config {
        Some(path) => LottieViewConfig::from_json_file(path)?,
        None => LottieViewConfig::default(),
    };
    if let Some(file) = &source.file {
        config.file_name = Some(file.clone());
    }
    if config.file_name.is_none() {
        warn!("No animation given; the view will stay empty");
    }

    view.apply_config(&config)?;
    Ok(view)
}

fn run_info(source: &Source) -> Result<()> {
    let scheduler = Rc::new(FrameScheduler::new(Instant::now()));
    let view = build_view(source, scheduler)?;

    let measured = view.measure(MeasureSpec::UNSPECIFIED, MeasureSpec::UNSPECIFIED);
    match view.animation() {
        Some(animation) => {
            let size = animation.size();
            println!("file:     {}", view.file_name().unwrap_or_default());
            println!("duration: {:.3}s", animation.duration().as_secs_f64());
            println!("size:     {}x{}", size.width, size.height);
        }
        None => println!("no animation loaded"),
    }
    println!("measured: {}x{}", measured.width, measured.height);
    Ok(())
}

fn run_play(args: &PlayArgs) -> Result<()> {
    let scheduler = Rc::new(FrameScheduler::new(Instant::now()));
    let mut view = build_view(&args.source, scheduler.clone())?;

    let width = args.width.map_or(MeasureSpec::UNSPECIFIED, MeasureSpec::exactly);
    let height = args.height.map_or(MeasureSpec::UNSPECIFIED, MeasureSpec::exactly);
    let size = view.measure(width, height);
    anyhow::ensure!(
        size.width > 0 && size.height > 0,
        "Surface size must be positive, got {}x{}",
        size.width,
        size.height
    );

    let mut surface = surfaces::raster_n32_premul((size.width, size.height))
        .context("Failed to create raster surface")?;
    if let Some(out) = &args.out {
        fs::create_dir_all(out)
            .with_context(|| format!("Failed to create output directory {}", out.display()))?;
    }

    let started = scheduler.now();
    let mut painted = 0;
    while painted < args.frames {
        let Some(now) = scheduler.next_frame() else {
            info!("No repaint requested, stopping");
            break;
        };
        view.paint(surface.canvas(), IRect::from_size(size), now);
        painted += 1;

        if let Some(out) = &args.out {
            let path = out.join(format!("frame_{:03}.png", painted));
            save_png(&mut surface, &path)?;
        }
    }

    let elapsed = scheduler.now().saturating_duration_since(started);
    info!(
        "Painted {} frames ({:.3}s of playback at {}ms per frame), progress {:.3}s",
        painted,
        elapsed.as_secs_f64(),
        FRAME_DELAY.as_millis(),
        view.progress().as_secs_f64()
    );
    Ok(())
}

fn save_png(surface: &mut skia_safe::Surface, path: &Path) -> Result<()> {
    let image = surface.image_snapshot();
    let encoded = image
        .encode(None, EncodedImageFormat::PNG, 100)
        .context("Failed to encode image")?;
    fs::write(path, encoded.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
