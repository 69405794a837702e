//! Tick callback that logs the market as the loop runs.
//!
//! Every tick is logged at debug level. Every `summary_every_ticks`
//! committed ticks a one-line market summary is logged at info level so a
//! long-running engine leaves a readable trail without debug logging.

use surge_core::TickCallback;
use surge_types::{MarketStatus, SurgeBand};
use tracing::{debug, info};

/// Callback that writes tick and summary lines to the log.
pub struct SummaryCallback {
    every: u64,
    seen: u64,
    peak_surge: f64,
}

impl SummaryCallback {
    /// Create a callback that summarizes every `every` ticks (0 disables
    /// the summary line).
    pub const fn new(every: u64) -> Self {
        Self {
            every,
            seen: 0,
            peak_surge: 1.0,
        }
    }

    /// Whether the tick just counted should produce a summary line.
    const fn summary_due(&self) -> bool {
        self.every != 0 && self.seen % self.every == 0
    }
}

impl TickCallback for SummaryCallback {
    fn on_tick(&mut self, status: &MarketStatus) {
        self.seen = self.seen.saturating_add(1);
        self.peak_surge = self.peak_surge.max(status.surge_multiplier);

        debug!(
            sequence = status.sequence,
            demand = status.demand,
            supply = status.supply,
            weather = %status.weather,
            traffic_factor = status.traffic_factor,
            surge = status.surge_multiplier,
            "Tick committed"
        );

        if self.summary_due() {
            info!(
                sequence = status.sequence,
                ticks = self.seen,
                surge = status.surge_multiplier,
                band = ?SurgeBand::classify(status.surge_multiplier),
                ratio = status.demand_supply_ratio,
                weather = %status.weather,
                peak_surge = self.peak_surge,
                "Market summary"
            );
            self.peak_surge = status.surge_multiplier;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use surge_types::Weather;

    use super::*;

    fn status(surge: f64) -> MarketStatus {
        MarketStatus {
            demand: 1.2,
            supply: 1.0,
            weather: Weather::Clear,
            weather_multiplier: 1.0,
            traffic_factor: 1.0,
            surge_multiplier: surge,
            demand_supply_ratio: 1.2,
            timestamp: Utc::now(),
            sequence: 2,
        }
    }

    #[test]
    fn summary_fires_on_the_configured_cadence() {
        let mut callback = SummaryCallback::new(3);
        let mut due = Vec::new();
        for _ in 0..6 {
            callback.on_tick(&status(1.3));
            due.push(callback.summary_due());
        }
        assert_eq!(due, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn zero_disables_summaries() {
        let mut callback = SummaryCallback::new(0);
        callback.on_tick(&status(1.3));
        assert!(!callback.summary_due());
    }

    #[test]
    fn peak_surge_resets_after_summary() {
        let mut callback = SummaryCallback::new(2);
        callback.on_tick(&status(2.4));
        assert!((callback.peak_surge - 2.4).abs() < f64::EPSILON);
        callback.on_tick(&status(1.1));
        assert!((callback.peak_surge - 1.1).abs() < f64::EPSILON);
    }
}
