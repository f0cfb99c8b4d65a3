// src/main.rs
//! bgmusic - background music for game screens, driven from the terminal.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bgmusic::{
    app::App,
    audio::{AudioSessionController, CatalogLoader, RodioBackend, SessionSettings, TrackCatalog},
    config::{Config, LoggingConfig},
    ui,
};

#[derive(Parser, Debug)]
#[command(name = "bgmusic", version, about = "Background music session player")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "BGMUSIC_CONFIG")]
    config: Option<PathBuf>,

    /// Override the asset directory from the config
    #[arg(long)]
    asset_dir: Option<PathBuf>,

    /// Start muted
    #[arg(long)]
    muted: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(dir) = args.asset_dir {
        config.asset_dir = dir;
    }
    if args.muted {
        config.playback.start_muted = true;
    }
    init_logging(&config.logging)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("bgmusic-worker")
        .build()
        .context("Failed to start async runtime")?;
    // Sync controller calls spawn onto the current runtime
    let guard = runtime.enter();

    let catalog = TrackCatalog::builtin(&config.asset_dir).with_overrides(&config.tracks);
    if !catalog.asset_dir().is_dir() {
        warn!("Asset directory {} does not exist", catalog.asset_dir().display());
    }
    let tracks = catalog.keys().cloned().collect();

    let backend = RodioBackend::new().context("Failed to open audio output")?;
    let controller = AudioSessionController::new(
        CatalogLoader::new(catalog),
        backend,
        SessionSettings::from(&config),
    );
    info!(asset_dir = %config.asset_dir.display(), "bgmusic starting");

    let mut app = App::new(controller, runtime.handle().clone(), tracks);
    let result = ui::run(&mut app);

    app.controller.cleanup();
    drop(app);
    drop(guard);
    runtime.shutdown_timeout(std::time::Duration::from_secs(1));
    result
}

/// Log to the configured file. The TUI owns the terminal, so without a file
/// logging stays off.
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let Some(path) = &logging.file else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
