//! Market tick loop with operator controls.
//!
//! [`run_market_loop`] drives [`MarketEngine::tick`] on the configured
//! interval with support for:
//!
//! - **Pause/resume**: the loop waits while paused, still honouring stop
//! - **Variable tick speed**: the interval is re-read before every sleep
//! - **Clean shutdown**: a stop request ends the loop after the current tick
//!
//! A failed tick is logged and counted; the loop keeps going with the
//! previous snapshot authoritative.

use std::time::Duration;

use chrono::Utc;
use surge_types::MarketStatus;
use tracing::{info, warn};

use crate::dynamics::DynamicsSimulator;
use crate::engine::MarketEngine;

/// Callback invoked after each committed tick.
pub trait TickCallback: Send {
    /// Called with the status of the snapshot just committed.
    fn on_tick(&mut self, status: &MarketStatus);
}

/// A no-op tick callback.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _status: &MarketStatus) {}
}

/// Result of a market loop run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks committed over the engine's lifetime.
    pub ticks: u64,
    /// Ticks aborted before commit over the engine's lifetime.
    pub failed_ticks: u64,
}

/// Run the tick loop until a stop is requested.
///
/// The first tick runs immediately. A stop request never interrupts a tick
/// in progress; it prevents the next one and cuts a pending sleep or pause
/// short.
pub async fn run_market_loop(
    engine: &MarketEngine,
    simulator: &mut DynamicsSimulator,
    callback: &mut dyn TickCallback,
) -> RunSummary {
    let control = engine.control();
    info!(
        tick_interval_ms = control.tick_interval_ms(),
        "Market loop starting"
    );

    loop {
        // --- Check pause ---
        if control.is_paused() {
            info!("Market loop paused, waiting for resume...");
            tokio::select! {
                () = control.wait_if_paused() => info!("Market loop resumed"),
                () = control.stopped() => {}
            }
        }

        // --- Check stop request (before tick) ---
        if control.is_stop_requested() {
            info!("Stop requested");
            break;
        }

        // --- Execute tick ---
        match engine.tick(simulator, Utc::now()) {
            Ok(status) => {
                control.record_tick();
                callback.on_tick(&status);
            }
            Err(e) => {
                control.record_failed_tick();
                warn!(error = %e, "Market tick failed, keeping previous state");
            }
        }

        // --- Sleep for tick interval ---
        let interval = Duration::from_millis(control.tick_interval_ms());
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = control.stopped() => {
                info!("Stop requested");
                break;
            }
        }
    }

    RunSummary {
        ticks: control.ticks(),
        failed_ticks: control.failed_ticks(),
    }
}

/// Log the end of a market loop run.
pub fn log_run_end(summary: &RunSummary) {
    info!(
        ticks = summary.ticks,
        failed_ticks = summary.failed_ticks,
        "Market loop ended"
    );
    if summary.ticks == 0 {
        warn!("Market loop ended with no ticks committed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{DynamicsConfig, EngineConfig};
    use crate::store::MarketBounds;

    fn setup(config: &EngineConfig) -> (Arc<MarketEngine>, DynamicsSimulator) {
        let engine = Arc::new(MarketEngine::new(config));
        engine.initialize(Utc::now());
        let simulator =
            DynamicsSimulator::new(&config.dynamics, MarketBounds::from_config(&config.market))
                .unwrap();
        (engine, simulator)
    }

    fn config() -> EngineConfig {
        EngineConfig {
            dynamics: DynamicsConfig {
                seed: Some(23),
                tick_interval_ms: 1000,
                ..DynamicsConfig::default()
            },
            ..EngineConfig::default()
        }
    }

    struct CountCallback {
        count: u64,
    }

    impl TickCallback for CountCallback {
        fn on_tick(&mut self, _status: &MarketStatus) {
            self.count = self.count.saturating_add(1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_request_ends_loop() {
        let (engine, mut simulator) = setup(&config());
        let runner = Arc::clone(&engine);
        let task = tokio::spawn(async move {
            let mut cb = CountCallback { count: 0 };
            let summary = run_market_loop(&runner, &mut simulator, &mut cb).await;
            (summary, cb.count)
        });

        // Ticks at t = 0, 1s, 2s; stop lands during the third sleep.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        engine.control().request_stop();
        let (summary, callbacks) = task.await.unwrap();

        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.failed_ticks, 0);
        assert_eq!(callbacks, 3);
        assert_eq!(engine.status().unwrap().sequence, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_start_runs_no_ticks() {
        let (engine, mut simulator) = setup(&config());
        engine.control().request_stop();
        let summary = run_market_loop(&engine, &mut simulator, &mut NoOpCallback).await;
        assert_eq!(summary.ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_while_paused_ends_loop() {
        let (engine, mut simulator) = setup(&config());
        engine.control().pause();
        let runner = Arc::clone(&engine);
        let task = tokio::spawn(async move {
            run_market_loop(&runner, &mut simulator, &mut NoOpCallback).await
        });

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!task.is_finished());
        engine.control().request_stop();
        let summary = task.await.unwrap();
        assert_eq!(summary.ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_ticks_are_counted_and_contained() {
        let mut config = config();
        config.dynamics.patterns.hourly_demand = [f64::NAN; 24];
        let (engine, mut simulator) = setup(&config);
        let runner = Arc::clone(&engine);
        let task = tokio::spawn(async move {
            run_market_loop(&runner, &mut simulator, &mut NoOpCallback).await
        });

        tokio::time::sleep(Duration::from_millis(1500)).await;
        engine.control().request_stop();
        let summary = task.await.unwrap();

        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.failed_ticks, 2);
        assert_eq!(engine.status().unwrap().sequence, 1);
    }
}
