mod app;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use eframe::egui::vec2;
use tracing::{Level, info};

use taxonomy_explorer::config::EngineConfig;
use taxonomy_explorer::dataset::load_dataset;
use taxonomy_explorer::engine::{Engine, LoadOutcome};
use taxonomy_explorer::render::HeadlessRenderer;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory holding the taxonomy CSV files.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Optional JSON file overriding engine tunables.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Build the graph without a window and print statistics as JSON.
    #[arg(long)]
    headless: bool,

    /// Load-more rounds to run before printing (headless only).
    #[arg(long, default_value_t = 0, requires = "headless")]
    load_more: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_target(false)
        .init();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if args.headless {
        return run_headless(&args, config);
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };
    let data_dir = args.data_dir.clone();
    eframe::run_native(
        "Taxonomy Explorer",
        options,
        Box::new(move |cc| Ok(Box::new(app::TaxonomyApp::new(cc, data_dir, config)))),
    )
    .map_err(|error| anyhow!("viewer exited with an error: {error}"))
}

fn run_headless(args: &Args, config: EngineConfig) -> Result<()> {
    let dataset = load_dataset(&args.data_dir, config.timing.parse_yield(), |progress| {
        info!(percent = progress.percent, stage = %progress.stage, "load progress");
    })
    .with_context(|| format!("failed to load dataset from {}", args.data_dir.display()))?;

    let now = Instant::now();
    let renderer = HeadlessRenderer::new(vec2(1280.0, 800.0));
    let mut engine = Engine::mount(dataset, renderer, config, now);
    info!(percent = 100.0, stage = "Complete!", "load progress");
    engine.run_until_idle(now);

    for round in 1..=args.load_more {
        match engine.load_more(None) {
            LoadOutcome::Started { skills } => {
                info!(round, skills, "loading more skills");
                engine.run_until_idle(now);
            }
            LoadOutcome::Skipped(reason) => {
                info!(round, ?reason, "load more skipped");
                break;
            }
        }
    }

    let stats = engine.stats();
    println!(
        "{}",
        serde_json::to_string_pretty(&stats).context("failed to encode statistics")?
    );
    engine.dispose();
    Ok(())
}
