//! Artwalk Experience Engine - Main entry point
//!
//! Boots the experience engine service: configuration resolution, SQLite
//! persistence, the engine loop, and the HTTP/SSE surface for the UI layer.
//! The AR renderer host connects over the renderer channel pair; in this
//! binary the command side is drained by a logging stub until a host
//! attaches.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use artwalk_common::config::TomlConfig;
use artwalk_common::Catalog;
use artwalk_engine::api;
use artwalk_engine::config::Config;
use artwalk_engine::db;
use artwalk_engine::experience::ExperienceEngine;
use artwalk_engine::progress::ProgressTracker;
use artwalk_engine::recording::FileMediaStore;
use artwalk_engine::scan::{QrIngest, QrSymbol};
use artwalk_engine::state::SharedState;
use artwalk_engine::submission::SubmissionClient;

/// Command-line arguments for artwalk-engine
#[derive(Parser, Debug)]
#[command(name = "artwalk-engine")]
#[command(about = "Experience engine for the Artwalk AR scavenger hunt")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(short, long, env = "ARTWALK_BIND_ADDR")]
    bind_addr: Option<String>,

    /// Root folder for database and captured clips
    #[arg(short, long)]
    root_folder: Option<PathBuf>,
}

/// Stub decoder used until a real symbol decoder is linked in; sees nothing
struct NullDecoder;

impl artwalk_engine::scan::QrDecoder for NullDecoder {
    fn scan_grayscale(
        &self,
        _data: &[u8],
        _width: u32,
        _height: u32,
    ) -> artwalk_engine::Result<Vec<QrSymbol>> {
        Ok(vec![])
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "artwalk_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    // Resolve configuration: CLI > env > TOML > platform default
    let toml_config = TomlConfig::load().context("Failed to load config file")?;
    let root_folder = artwalk_common::config::resolve_root_folder(
        args.root_folder.as_deref().and_then(|p| p.to_str()),
        "ARTWALK_ROOT_FOLDER",
        &toml_config,
    );
    let config = Config::from_parts(root_folder, &toml_config, args.bind_addr);

    info!("Starting Artwalk Experience Engine on {}", config.bind_addr);
    info!("Root folder: {}", config.root_folder.display());

    std::fs::create_dir_all(&config.root_folder)
        .context("Failed to create root folder")?;

    // Open database and initialize schema + defaults
    let db_pool = db::open_pool(&config.db_path)
        .await
        .context("Failed to open database")?;
    db::init::create_schema(&db_pool)
        .await
        .context("Failed to create schema")?;
    db::init::init_settings_defaults(&db_pool)
        .await
        .context("Failed to seed settings")?;
    let user_id = db::init::ensure_user_id(&db_pool)
        .await
        .context("Failed to resolve user id")?;

    // Shared context
    let shared = Arc::new(SharedState::new());
    let catalog = Arc::new(Catalog::new());
    let submission = config
        .submission_endpoint
        .clone()
        .map(|endpoint| Arc::new(SubmissionClient::new(endpoint)));

    let progress = Arc::new(
        ProgressTracker::load(
            db_pool.clone(),
            Arc::clone(&catalog),
            Arc::clone(&shared),
            submission,
            user_id,
        )
        .await
        .context("Failed to load progress")?,
    );

    // Renderer channel pair; the host process attaches to the far ends
    let (cmd_tx, mut cmd_rx, _event_tx, event_rx) = artwalk_engine::render::renderer_channels();

    // Until a renderer host attaches, log outgoing commands so the engine
    // remains drivable end-to-end
    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            debug!("renderer command: {:?}", cmd);
        }
    });

    // QR ingestion feeding the engine loop
    let (scan_tx, scan_rx) = tokio::sync::mpsc::unbounded_channel();
    let ingest = Arc::new(QrIngest::new(
        Arc::new(NullDecoder),
        config.scans_per_second,
        scan_tx,
    ));

    // Experience engine
    let media_store = Arc::new(FileMediaStore::new(&config.root_folder));
    let engine = Arc::new(ExperienceEngine::new(
        Arc::clone(&shared),
        Arc::clone(&catalog),
        Arc::clone(&progress),
        media_store,
        cmd_tx,
    ));
    engine.start(event_rx, scan_rx);
    info!("Experience engine initialized");

    // HTTP/SSE surface
    let ctx = api::AppContext {
        state: shared,
        engine,
        catalog,
        progress,
        ingest,
        db_pool,
    };

    api::run(&config.bind_addr, ctx)
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}
