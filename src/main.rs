//! CRASHLENS — Crash Game Statistics Tracker
//!
//! Entry point. Loads configuration, initialises structured logging, opens
//! the round store, spawns the collector (when enabled) and the HTTP API,
//! then waits for a shutdown signal.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

use crashlens::api::{self, ApiState};
use crashlens::collector::Collector;
use crashlens::config::AppConfig;
use crashlens::engine::CrashCalculator;
use crashlens::storage::RoundStore;

const BANNER: &str = r#"
   ____ ____      _    ____  _   _ _     _____ _   _ ____
  / ___|  _ \    / \  / ___|| | | | |   | ____| \ | / ___|
 | |   | |_) |  / _ \ \___ \| |_| | |   |  _| |  \| \___ \
 | |___|  _ <  / ___ \ ___) |  _  | |___| |___| |\  |___) |
  \____|_| \_\/_/   \_\____/|_| |_|_____|_____|_| \_|____/

  Crash Game Statistics Tracker
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        service = %cfg.service.name,
        game = %cfg.service.game,
        port = cfg.service.port,
        database = %cfg.database.url,
        "CRASHLENS starting up"
    );

    // -- Storage -----------------------------------------------------------

    let store = RoundStore::connect(&cfg.database.url, cfg.database.max_connections).await?;

    // -- Analytics engine --------------------------------------------------

    // Threshold validation happens here, before anything is served.
    let calculator = CrashCalculator::new(cfg.thresholds)?;

    // -- Collector ---------------------------------------------------------

    let collector_task = if cfg.collector.enabled {
        let mut collector = Collector::new(store.clone(), cfg.collector.clone())?;
        Some(tokio::spawn(async move {
            if let Err(e) = collector.run().await {
                error!(error = %e, "Collector stopped");
            }
        }))
    } else {
        info!("Collector disabled; serving stored rounds only");
        None
    };

    // -- API server --------------------------------------------------------

    let state = Arc::new(ApiState {
        store,
        calculator,
        game: cfg.service.game.clone(),
        cashout_targets: cfg.analysis.cashout_targets.clone(),
        streak_threshold: cfg.analysis.streak_threshold,
    });

    let server_task = tokio::spawn(api::serve(state, cfg.service.port));

    // -- Shutdown ----------------------------------------------------------

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received.");

    server_task.abort();
    if let Some(task) = collector_task {
        task.abort();
    }

    info!("CRASHLENS shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crashlens=info"));

    let json_logging = std::env::var("CRASHLENS_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
