//! Expression Warp Renderer - Main Entry Point

use anyhow::{bail, Context};
use clap::Parser;
use emotion_delta::{DeltaManager, FileStore};
use expression_engine::{
    describe, init_logging, CycleOutcome, EngineConfig, ExpressionController, ExpressionTarget,
    MetricsObserver, KNOWN_EMOTIONS,
};
use face_landmarks::Landmark;
use image::RgbImage;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use video_io::{FrameSequence, FrameSource};

/// Render a still frame deformed toward an emotion
#[derive(Debug, Parser)]
#[command(name = "expression-render", version, about)]
struct Args {
    /// Engine configuration file (TOML, JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Idle frame to deform
    #[arg(short, long)]
    frame: PathBuf,

    /// Neutral baseline landmarks (JSON array of {x, y, z})
    #[arg(short, long)]
    baseline: PathBuf,

    /// Delta snapshot; defaults to the configured store path
    #[arg(short, long)]
    deltas: Option<PathBuf>,

    /// Target emotion
    #[arg(short, long, default_value = "happy")]
    emotion: String,

    /// Render cycles to run before writing the output
    #[arg(long, default_value_t = 30)]
    cycles: u32,

    /// Composed frame destination
    #[arg(short, long, default_value = "expression.png")]
    output: PathBuf,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose).context("installing tracing subscriber")?;

    info!("=== Expression Renderer v{} ===", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::load(args.config.as_deref()).context("loading configuration")?;

    let image = image::open(&args.frame)
        .with_context(|| format!("decoding frame {}", args.frame.display()))?
        .to_rgb8();

    let baseline: Vec<Landmark> = serde_json::from_slice(
        &std::fs::read(&args.baseline)
            .with_context(|| format!("reading {}", args.baseline.display()))?,
    )
    .context("parsing baseline landmarks")?;

    let store = match (&args.deltas, config.store.open()) {
        (Some(path), _) => FileStore::new(path, config.store.format),
        (None, Some(store)) => store,
        (None, None) => bail!("no delta snapshot given and no store path configured"),
    };

    let mut manager = DeltaManager::with_store(store);
    manager.set_baseline(baseline);
    if !manager.restore().context("loading delta snapshot")? {
        bail!("delta snapshot is missing");
    }

    let target = ExpressionTarget::from(args.emotion.as_str());
    match describe(target.name()) {
        Some(description) => info!("Target: {} ({})", target, description),
        None => warn!(
            "'{}' is not one of {:?}",
            target,
            KNOWN_EMOTIONS.map(|(name, _)| name)
        ),
    }

    let (width, height) = (config.surface.width, config.surface.height);
    let mut controller = ExpressionController::new(manager, config.render.clone(), width, height)
        .with_observer(MetricsObserver::new());
    controller.request(target);

    let mut source = FrameSequence::still(image);
    let mut surface = RgbImage::new(width, height);
    let step = config.render.cycle_interval();

    let mut last = CycleOutcome::Skipped;
    for cycle in 0..args.cycles {
        last = controller.render_cycle(source.poll_frame(step), &mut surface);
        debug!("Cycle {}: {:?}", cycle, last);
    }

    surface
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!(
        "Wrote {} after {} cycles (last: {:?}, progress {:.2})",
        args.output.display(),
        args.cycles,
        last,
        controller.progress()
    );

    Ok(())
}
