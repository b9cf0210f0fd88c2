use clap::Parser;
use lootbot::common::CaptureRegion;
use lootbot::input::{InputInjector, RecordingInjector};
#[cfg(not(feature = "desktop"))]
use lootbot::perception::StaticFrameSource;
use lootbot::perception::{Detector, FrameSource, ImageSequenceSource, ScriptedDetector};
use lootbot::{AppError, Coordinator, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "lootbot")]
#[command(about = "Autonomous target, attack and loot agent driven by screen captures")]
struct Cli {
    /// Settings file (TOML); LOOTBOT_* environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON array of detection batches to replay instead of a live detector
    #[arg(long)]
    detections: Option<PathBuf>,
    /// Directory of frames to replay instead of capturing the screen
    #[arg(long)]
    frames: Option<PathBuf>,
    /// Stop after this many seconds
    #[arg(long)]
    seconds: Option<f64>,
    /// Send real input events (desktop builds only)
    #[arg(long)]
    live: bool,
}

fn init_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[cfg(feature = "desktop")]
fn screen_frames(_region: &CaptureRegion) -> Result<Arc<dyn FrameSource>, AppError> {
    Ok(Arc::new(lootbot::perception::ScreenCaptureSource::new()?))
}

#[cfg(not(feature = "desktop"))]
fn screen_frames(region: &CaptureRegion) -> Result<Arc<dyn FrameSource>, AppError> {
    info!("No frames given, replaying a blank capture region");
    Ok(Arc::new(StaticFrameSource::new(image::RgbImage::new(
        region.width,
        region.height,
    ))))
}

#[cfg(feature = "desktop")]
fn live_injector() -> Result<Arc<dyn InputInjector>, AppError> {
    Ok(Arc::new(lootbot::input::EnigoInjector::new()?))
}

#[cfg(not(feature = "desktop"))]
fn live_injector() -> Result<Arc<dyn InputInjector>, AppError> {
    Err(AppError::Setup(
        "--live needs a build with the desktop feature".to_string(),
    ))
}

fn frame_source(cli: &Cli, region: &CaptureRegion) -> Result<Arc<dyn FrameSource>, AppError> {
    match &cli.frames {
        Some(dir) => Ok(Arc::new(ImageSequenceSource::from_dir(dir)?)),
        None => screen_frames(region),
    }
}

fn injector(cli: &Cli) -> Result<Arc<dyn InputInjector>, AppError> {
    if cli.live {
        return live_injector();
    }
    info!("Dry run: input events are only logged");
    Ok(Arc::new(RecordingInjector::new()))
}

fn detector(cli: &Cli) -> Result<Arc<dyn Detector>, AppError> {
    match &cli.detections {
        Some(path) => Ok(Arc::new(ScriptedDetector::from_json_file(path)?)),
        None => {
            info!("No detections given, the bot will only explore");
            Ok(Arc::new(ScriptedDetector::default()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    init_logging(settings.debug);

    let coordinator = Coordinator::builder(settings.clone())
        .detector(detector(&cli)?)
        .frame_source(frame_source(&cli, &settings.capture)?)
        .injector(injector(&cli)?)
        .build()?;

    match cli.seconds {
        Some(seconds) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
                _ = tokio::time::sleep(Duration::from_secs_f64(seconds.max(0.0))) => {
                    info!("Run time elapsed")
                }
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
            info!("Interrupted");
        }
    }

    coordinator.shutdown().await
}
