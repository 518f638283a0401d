//! follow_pilot - camera-driven follow-person pilot
//!
//! This binary:
//! 1. Loads configuration (PILOT_CONFIG file, PILOT_* env, command-line flags)
//! 2. Pulls frames from the vehicle camera
//! 3. Runs the detector and, in follow mode, steers toward the last person seen
//! 4. Sends best-effort commands to the vehicle
//!
//! Console keys (one per line): space toggles mode, tab toggles sub-mode,
//! q quits. Ctrl-C also stops the loop.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use follow_pilot::config::CliOverrides;
use follow_pilot::{
    CommandPolicy, ControlLoop, DetectorBackend, Dispatcher, FrameSource, HttpDispatcher,
    HttpDispatcherConfig, HttpSnapshotSource, HttpSourceConfig, LabelMap, LogRenderer,
    NullDispatcher, OverlayRenderer, PilotConfig, SnapshotRenderer, StdinInput, SyntheticSource,
    WireFormat,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Camera snapshot or MJPEG URL.
    #[arg(long)]
    stream_url: Option<String>,
    /// Vehicle command endpoint.
    #[arg(long)]
    command_url: Option<String>,
    /// Class label file (one name per line).
    #[arg(long)]
    labels: Option<PathBuf>,
    /// ONNX detector model (requires the backend-tract feature).
    #[arg(long)]
    model: Option<PathBuf>,
    /// Detector confidence threshold.
    #[arg(long)]
    confidence: Option<f32>,
    /// Command vocabulary: standard or legacy.
    #[arg(long)]
    wire_format: Option<WireFormat>,
    /// Log commands instead of sending them.
    #[arg(long)]
    dry_run: bool,
    /// Use synthetic frames instead of the camera.
    #[arg(long)]
    synthetic: bool,
    /// Write the annotated frame to this JPEG path.
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Write a snapshot every N frames (default: configured value, else 1).
    #[arg(long)]
    snapshot_every: Option<u64>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            stream_url: self.stream_url.clone(),
            command_url: self.command_url.clone(),
            labels_path: self.labels.clone(),
            model_path: self.model.clone(),
            confidence: self.confidence,
            wire_format: self.wire_format,
            snapshot_path: self.snapshot.clone(),
            snapshot_every: self.snapshot_every,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = PilotConfig::load()?;
    cfg.apply_overrides(&args.overrides());
    cfg.validate()?;

    let labels = LabelMap::load(&cfg.labels_path);

    let source: Box<dyn FrameSource> = if args.synthetic {
        log::warn!("using synthetic frames; the camera is not contacted");
        Box::new(SyntheticSource::new(640, 480))
    } else {
        Box::new(HttpSnapshotSource::new(HttpSourceConfig {
            url: cfg.stream.url.clone(),
            timeout: cfg.stream.timeout,
        })?)
    };

    let mut detector = build_detector(&cfg)?;
    detector.warm_up().context("detector warm-up")?;

    let dispatcher: Box<dyn Dispatcher> = if args.dry_run {
        Box::new(NullDispatcher::new(cfg.command.wire_format))
    } else {
        Box::new(HttpDispatcher::new(HttpDispatcherConfig {
            url: cfg.command.url.clone(),
            timeout: cfg.command.timeout,
            wire_format: cfg.command.wire_format,
        })?)
    };

    let renderer: Box<dyn OverlayRenderer> = match &cfg.snapshot {
        Some(snapshot) => Box::new(SnapshotRenderer::new(&snapshot.path, snapshot.every)?),
        None => Box::new(LogRenderer::new()),
    };

    let input = StdinInput::spawn()?;

    let mut control = ControlLoop::new(source, detector, dispatcher, input, renderer)
        .with_policy(CommandPolicy::new(cfg.policy))
        .with_labels(labels);

    let stop = control.stop_handle();
    ctrlc::set_handler(move || stop.stop()).context("install Ctrl-C handler")?;

    log::info!("camera: {}", cfg.stream.url);
    log::info!(
        "commands: {} ({:?}{})",
        cfg.command.url,
        cfg.command.wire_format,
        if args.dry_run { ", dry run" } else { "" }
    );
    log::info!("keys: <space> toggle mode, <tab> toggle sub-mode, q quit");

    control.run();
    Ok(())
}

#[cfg(feature = "backend-tract")]
fn build_detector(cfg: &PilotConfig) -> Result<Box<dyn DetectorBackend>> {
    let backend = follow_pilot::detect::TractBackend::new(
        &cfg.detector.model_path,
        cfg.detector.input_width,
        cfg.detector.input_height,
    )?
    .with_threshold(cfg.detector.confidence_threshold);
    log::info!("detector: {}", cfg.detector.model_path.display());
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn build_detector(cfg: &PilotConfig) -> Result<Box<dyn DetectorBackend>> {
    log::warn!(
        "built without the backend-tract feature; {} is not loaded and no objects will be detected",
        cfg.detector.model_path.display()
    );
    Ok(Box::new(follow_pilot::ScriptedBackend::new(
        cfg.detector.confidence_threshold,
    )))
}
