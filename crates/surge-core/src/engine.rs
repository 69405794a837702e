//! The market engine facade.
//!
//! [`MarketEngine`] owns the store, pricing engine, broadcast hub, history,
//! forecaster, zone and event models, and control state. It is shared
//! behind an `Arc` by the tick runner and every HTTP handler, so all
//! methods take `&self`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use surge_types::{
    ForecastPoint, MarketEvent, MarketState, MarketStatus, MarketUpdate, PriceQuote, PriceRequest,
    SurgeZone,
};
use tracing::{debug, info, warn};

use crate::broadcast::{BroadcastHub, SubscriberHandle};
use crate::config::{EngineConfig, MarketConfig, WeatherImpacts};
use crate::control::EngineControl;
use crate::dynamics::{DynamicsSimulator, TickError};
use crate::error::MarketError;
use crate::events::EventModel;
use crate::forecast::DemandForecaster;
use crate::history::MarketHistory;
use crate::pricing::{PricingEngine, Trip};
use crate::store::{MarketBounds, MarketStore};
use crate::surge::{round_dp, surge_for};
use crate::zones::SurgeZoneModel;

/// Operator-facing view of the engine's runtime state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    /// Whether ticking is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Current tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Committed ticks since start.
    pub ticks: u64,
    /// Ticks aborted before commit.
    pub failed_ticks: u64,
    /// Live update subscribers.
    pub subscribers: usize,
    /// Updates published since start.
    pub published_updates: u64,
    /// Queued updates discarded for lagging subscribers.
    pub dropped_updates: u64,
    /// Sequence number of the current snapshot, if any.
    pub sequence: Option<u64>,
    /// Seconds since the engine was created.
    pub elapsed_seconds: u64,
    /// When the engine was created.
    pub started_at: DateTime<Utc>,
}

/// Shared entry point for every market operation.
#[derive(Debug)]
pub struct MarketEngine {
    store: MarketStore,
    pricing: PricingEngine,
    hub: BroadcastHub,
    history: MarketHistory,
    forecaster: DemandForecaster,
    zones: SurgeZoneModel,
    events: EventModel,
    control: EngineControl,
    initial: MarketConfig,
    impacts: WeatherImpacts,
}

impl MarketEngine {
    /// Build an engine with an empty store.
    ///
    /// Call [`initialize`](Self::initialize) before serving reads.
    pub fn new(config: &EngineConfig) -> Self {
        let bounds = MarketBounds::from_config(&config.market);
        Self {
            store: MarketStore::new(bounds),
            pricing: PricingEngine::new(config.pricing.clone()),
            hub: BroadcastHub::new(config.broadcast.subscriber_capacity),
            history: MarketHistory::new(config.history.capacity),
            forecaster: DemandForecaster::new(
                &config.dynamics.patterns,
                bounds,
                config.dynamics.utc_offset_minutes,
            ),
            zones: SurgeZoneModel::new(config.dynamics.utc_offset_minutes),
            events: EventModel::new(config.events.probability),
            control: EngineControl::new(config.dynamics.tick_interval_ms),
            initial: config.market.clone(),
            impacts: config.pricing.weather_impacts,
        }
    }

    /// Commit the configured starting snapshot if the store is still empty.
    ///
    /// Returns the current snapshot either way.
    pub fn initialize(&self, now: DateTime<Utc>) -> Arc<MarketState> {
        if let Ok(current) = self.store.read() {
            return current;
        }
        let bounds = self.store.bounds();
        let initial = MarketState::new(
            bounds.clamp_level(self.initial.initial_demand),
            bounds.clamp_level(self.initial.initial_supply),
            self.initial.initial_weather,
            1.0,
            now,
        );
        let committed = self
            .store
            .commit_with(initial, |state| self.history.record(self.status_of(state)));
        info!(
            demand = committed.demand,
            supply = committed.supply,
            weather = %committed.weather,
            "Market initialized"
        );
        committed
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The market store.
    pub const fn store(&self) -> &MarketStore {
        &self.store
    }

    /// The broadcast hub.
    pub const fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// The tick loop control state.
    pub const fn control(&self) -> &EngineControl {
        &self.control
    }

    /// The pricing engine.
    pub const fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    /// Public view of the current snapshot.
    pub fn status(&self) -> Result<MarketStatus, MarketError> {
        let snapshot = self.store.read()?;
        Ok(self.status_of(&snapshot))
    }

    /// Project a snapshot into its public view, with derived surge and
    /// rounded fields.
    pub fn status_of(&self, state: &MarketState) -> MarketStatus {
        MarketStatus {
            demand: round_dp(state.demand, 2),
            supply: round_dp(state.supply, 2),
            weather: state.weather,
            weather_multiplier: round_dp(self.impacts.impact(state.weather), 2),
            traffic_factor: round_dp(state.traffic_factor, 2),
            surge_multiplier: round_dp(surge_for(state, &self.impacts), 2),
            demand_supply_ratio: round_dp(state.demand_supply_ratio(), 3),
            timestamp: state.timestamp,
            sequence: state.sequence,
        }
    }

    /// Price a trip against the current snapshot.
    ///
    /// Geometry is validated before the store is read.
    pub fn quote(&self, request: &PriceRequest) -> Result<PriceQuote, MarketError> {
        let trip = Trip::from_request(request)?;
        let snapshot = self.store.read()?;
        let quote = self.pricing.price_trip(&trip, &snapshot);
        debug!(
            ride_class = %quote.ride_class,
            distance_km = quote.distance_km,
            total_price = quote.total_price,
            sequence = snapshot.sequence,
            "Price quoted"
        );
        Ok(quote)
    }

    /// Up to `limit` recent snapshots, oldest first.
    pub fn history(&self, limit: usize) -> Vec<MarketStatus> {
        self.history.recent(limit)
    }

    /// Demand forecast for the next `hours` hours.
    pub fn forecast(&self, now: DateTime<Utc>, hours: u32) -> Vec<ForecastPoint> {
        self.forecaster.forecast(now, hours)
    }

    /// Per-neighbourhood surge around the current global surge.
    pub fn surge_zones(&self, now: DateTime<Utc>) -> Result<Vec<SurgeZone>, MarketError> {
        let snapshot = self.store.read()?;
        let global = surge_for(&snapshot, &self.impacts);
        Ok(self.zones.zones(global, now, &mut rand::rng()))
    }

    /// City events currently raising demand (zero or one).
    pub fn events(&self) -> Vec<MarketEvent> {
        self.events.active_events(&mut rand::rng())
    }

    /// Operator view of the runtime state.
    pub fn engine_status(&self) -> EngineStatus {
        let hub = self.hub.stats();
        EngineStatus {
            paused: self.control.is_paused(),
            stop_requested: self.control.is_stop_requested(),
            tick_interval_ms: self.control.tick_interval_ms(),
            ticks: self.control.ticks(),
            failed_ticks: self.control.failed_ticks(),
            subscribers: hub.subscribers,
            published_updates: hub.published,
            dropped_updates: hub.dropped,
            sequence: self.store.read().ok().map(|s| s.sequence),
            elapsed_seconds: self.control.elapsed_seconds(),
            started_at: self.control.started_at(),
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Override the demand level. Returns the clamped value actually stored.
    pub fn override_demand(&self, demand: f64) -> Result<f64, MarketError> {
        let committed = self.override_level("demand", demand, |state| MarketState {
            demand,
            timestamp: Utc::now(),
            ..*state
        })?;
        Ok(committed.demand)
    }

    /// Override the supply level. Returns the clamped value actually stored.
    pub fn override_supply(&self, supply: f64) -> Result<f64, MarketError> {
        let committed = self.override_level("supply", supply, |state| MarketState {
            supply,
            timestamp: Utc::now(),
            ..*state
        })?;
        Ok(committed.supply)
    }

    fn override_level<F>(
        &self,
        field: &'static str,
        value: f64,
        mutator: F,
    ) -> Result<Arc<MarketState>, MarketError>
    where
        F: FnOnce(&MarketState) -> MarketState,
    {
        if !value.is_finite() {
            return Err(MarketError::InvalidLevel { field, value });
        }
        let committed = self
            .store
            .force_set_with(mutator, |state| self.history.record(self.status_of(state)))?;
        info!(
            field,
            requested = value,
            sequence = committed.sequence,
            "Market level overridden"
        );
        Ok(committed)
    }

    /// Register a live update subscriber.
    pub fn subscribe(&self) -> SubscriberHandle {
        self.hub.subscribe()
    }

    /// Run one dynamics step: derive, commit, record, publish.
    ///
    /// History is recorded under the store's write guard, so it stays in
    /// commit order even while overrides race the tick.
    ///
    /// On error nothing is committed and the previous snapshot stays
    /// authoritative. A failed publish is logged and does not fail the tick.
    pub fn tick(
        &self,
        simulator: &mut DynamicsSimulator,
        now: DateTime<Utc>,
    ) -> Result<MarketStatus, TickError> {
        let previous = self.store.read()?;
        let next = simulator.step(&previous, now)?;
        let committed = self
            .store
            .commit_with(next, |state| self.history.record(self.status_of(state)));
        let status = self.status_of(&committed);

        if let Err(e) = self.hub.publish(&MarketUpdate::from(status.clone())) {
            warn!(error = %e, sequence = status.sequence, "Failed to publish market update");
        }
        Ok(status)
    }
}
