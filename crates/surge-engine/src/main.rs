//! Market engine binary for Surge.
//!
//! This is the main entry point that wires together the market store, the
//! dynamics simulator, the market API server, and the operator controls.
//! It loads configuration, initializes all subsystems, and runs the tick
//! loop until a stop is requested (operator endpoint or Ctrl-C).
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `surge-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Create the market engine and commit the initial snapshot
//! 4. Create the dynamics simulator
//! 5. Start the market API server
//! 6. Install the Ctrl-C handler
//! 7. Run the tick loop
//! 8. Wait for the server to drain and log the result

mod error;
mod summary_callback;

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use surge_core::runner::{self, run_market_loop};
use surge_core::{DynamicsSimulator, EngineConfig, MarketBounds, MarketEngine};
use surge_observer::{AppState, ServerConfig, start_server};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::summary_callback::SummaryCallback;

/// Configuration file looked up relative to the working directory.
const CONFIG_PATH: &str = "surge-config.yaml";

/// Application entry point for the market engine.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the simulator cannot be
/// built, or the API server fails to bind or serve.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config);
    info!("surge-engine starting");
    if !from_file {
        info!(path = CONFIG_PATH, "Config file not found, using defaults");
    }
    info!(
        tick_interval_ms = config.dynamics.tick_interval_ms,
        seed = ?config.dynamics.seed,
        min_level = config.market.min_level,
        max_level = config.market.max_level,
        subscriber_capacity = config.broadcast.subscriber_capacity,
        "Configuration loaded"
    );

    // 3. Create the engine and commit the initial snapshot.
    let engine = Arc::new(MarketEngine::new(&config));
    let initial = engine.initialize(Utc::now());
    info!(
        sequence = initial.sequence,
        demand = initial.demand,
        supply = initial.supply,
        weather = %initial.weather,
        "Market initialized"
    );

    // 4. Create the dynamics simulator.
    let mut simulator =
        DynamicsSimulator::new(&config.dynamics, MarketBounds::from_config(&config.market))?;

    // 5. Start the market API server. It shuts down with the tick loop, and
    //    a server failure stops the tick loop.
    let server_config = ServerConfig::from(&config.server);
    let app_state = Arc::new(AppState::new(Arc::clone(&engine)));
    let server = {
        let shutdown_engine = Arc::clone(&engine);
        let failure_engine = Arc::clone(&engine);
        tokio::spawn(async move {
            let shutdown = async move { shutdown_engine.control().stopped().await };
            let result = start_server(&server_config, app_state, shutdown).await;
            if let Err(e) = &result {
                error!(error = %e, "Market API server failed, stopping engine");
                failure_engine.control().request_stop();
            }
            result
        })
    };

    // 6. Ctrl-C requests a clean stop.
    {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, stopping");
                    engine.control().request_stop();
                }
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
        });
    }

    // 7. Run the tick loop.
    let mut callback = SummaryCallback::new(config.logging.summary_every_ticks);
    let summary = run_market_loop(&engine, &mut simulator, &mut callback).await;
    runner::log_run_end(&summary);

    // 8. Drain the server.
    engine.control().request_stop();
    server
        .await
        .map_err(|e| EngineError::ServerTask {
            message: e.to_string(),
        })??;

    let stats = engine.hub().stats();
    info!(
        ticks = summary.ticks,
        failed_ticks = summary.failed_ticks,
        published_updates = stats.published,
        dropped_updates = stats.dropped,
        "surge-engine shutdown complete"
    );
    Ok(())
}

/// Load `surge-config.yaml` from the working directory, falling back to
/// defaults when it does not exist. The flag reports whether the file was
/// read.
fn load_config() -> Result<(EngineConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok((EngineConfig::from_file(config_path)?, true))
    } else {
        let mut config = EngineConfig::default();
        config.server.apply_env_overrides();
        Ok((config, false))
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
fn init_tracing(config: &EngineConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
