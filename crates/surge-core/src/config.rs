//! Configuration loading and typed config structures for the Surge engine.
//!
//! The canonical configuration lives in `surge-config.yaml` at the project
//! root. Every section and field has a default, so an empty or partial
//! file is valid. [`EngineConfig::validate`] rejects combinations the
//! engine cannot run with (inverted ranges, probabilities outside `[0, 1]`,
//! non-finite tariffs).

use std::path::Path;

use serde::Deserialize;
use surge_types::{RideClass, Weather};

use crate::patterns::MarketPatterns;

/// Smallest tick interval accepted from configuration.
pub const MIN_TICK_INTERVAL_MS: u64 = 100;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but holds values the engine cannot use.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `surge-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Level ranges and the starting snapshot.
    #[serde(default)]
    pub market: MarketConfig,

    /// Tick period, noise, and transition probabilities.
    #[serde(default)]
    pub dynamics: DynamicsConfig,

    /// Tariffs and price multipliers.
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Update fan-out settings.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// In-memory market history settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// City event draws.
    #[serde(default)]
    pub events: EventsConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the listener:
    /// - `SURGE_HOST` overrides `server.host`
    /// - `SURGE_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.server.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.market.validate()?;
        self.dynamics.validate()?;
        self.pricing.validate()?;
        if self.broadcast.subscriber_capacity == 0 {
            return Err(invalid("broadcast.subscriber_capacity must be at least 1"));
        }
        if self.history.capacity == 0 {
            return Err(invalid("history.capacity must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.events.probability) {
            return Err(invalid("events.probability must be within [0, 1]"));
        }
        Ok(())
    }
}

/// Demand/supply level range and the snapshot the engine starts from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketConfig {
    /// Lower clamp for demand and supply levels.
    #[serde(default = "default_min_level")]
    pub min_level: f64,

    /// Upper clamp for demand and supply levels.
    #[serde(default = "default_max_level")]
    pub max_level: f64,

    /// Demand level of the initial snapshot.
    #[serde(default = "default_initial_level")]
    pub initial_demand: f64,

    /// Supply level of the initial snapshot.
    #[serde(default = "default_initial_level")]
    pub initial_supply: f64,

    /// Weather of the initial snapshot.
    #[serde(default = "default_initial_weather")]
    pub initial_weather: Weather,
}

impl MarketConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_level.is_finite() && self.max_level.is_finite()) {
            return Err(invalid("market level range must be finite"));
        }
        if self.min_level <= 0.0 || self.min_level >= self.max_level {
            return Err(invalid(format!(
                "market level range must satisfy 0 < min_level < max_level (got {} .. {})",
                self.min_level, self.max_level
            )));
        }
        if !(self.initial_demand.is_finite() && self.initial_supply.is_finite()) {
            return Err(invalid("initial demand and supply must be finite"));
        }
        Ok(())
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            min_level: default_min_level(),
            max_level: default_max_level(),
            initial_demand: default_initial_level(),
            initial_supply: default_initial_level(),
            initial_weather: default_initial_weather(),
        }
    }
}

/// Settings for the periodic dynamics simulator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DynamicsConfig {
    /// Real-time milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Seed for reproducible runs. `None` seeds from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Standard deviation of the multiplicative demand noise.
    #[serde(default = "default_demand_noise_sd")]
    pub demand_noise_sd: f64,

    /// Standard deviation of the multiplicative supply noise.
    #[serde(default = "default_supply_noise_sd")]
    pub supply_noise_sd: f64,

    /// Per-tick probability that the weather is re-drawn.
    #[serde(default = "default_weather_change_probability")]
    pub weather_change_probability: f64,

    /// Per-tick probability of a traffic incident.
    #[serde(default = "default_incident_probability")]
    pub incident_probability: f64,

    /// Smallest traffic multiplier an incident applies.
    #[serde(default = "default_incident_min")]
    pub incident_min: f64,

    /// Largest traffic multiplier an incident applies.
    #[serde(default = "default_incident_max")]
    pub incident_max: f64,

    /// Standard deviation of the additive traffic noise.
    #[serde(default = "default_traffic_noise_sd")]
    pub traffic_noise_sd: f64,

    /// Fixed UTC offset for hour/weekday lookups. `None` uses the host's
    /// local time zone.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,

    /// Hourly and weekday demand/supply tables.
    #[serde(default)]
    pub patterns: MarketPatterns,
}

impl DynamicsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            return Err(invalid(format!(
                "dynamics.tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}"
            )));
        }
        for (name, sd) in [
            ("demand_noise_sd", self.demand_noise_sd),
            ("supply_noise_sd", self.supply_noise_sd),
            ("traffic_noise_sd", self.traffic_noise_sd),
        ] {
            if !sd.is_finite() || sd < 0.0 {
                return Err(invalid(format!(
                    "dynamics.{name} must be a finite non-negative number"
                )));
            }
        }
        for (name, p) in [
            ("weather_change_probability", self.weather_change_probability),
            ("incident_probability", self.incident_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid(format!("dynamics.{name} must be within [0, 1]")));
            }
        }
        if !(self.incident_min.is_finite() && self.incident_max.is_finite())
            || self.incident_min < 1.0
            || self.incident_min > self.incident_max
        {
            return Err(invalid(
                "dynamics incident range must satisfy 1.0 <= incident_min <= incident_max",
            ));
        }
        if let Some(minutes) = self.utc_offset_minutes
            && !(-1439..=1439).contains(&minutes)
        {
            return Err(invalid("dynamics.utc_offset_minutes must be within +/- 23:59"));
        }
        self.patterns
            .validate()
            .map_err(|reason| ConfigError::Invalid { reason })
    }
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            seed: None,
            demand_noise_sd: default_demand_noise_sd(),
            supply_noise_sd: default_supply_noise_sd(),
            weather_change_probability: default_weather_change_probability(),
            incident_probability: default_incident_probability(),
            incident_min: default_incident_min(),
            incident_max: default_incident_max(),
            traffic_noise_sd: default_traffic_noise_sd(),
            utc_offset_minutes: None,
            patterns: MarketPatterns::default(),
        }
    }
}

/// Flat fare and per-kilometre rate for one ride class.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Tariff {
    /// Flat fare charged on every trip.
    pub base_fare: f64,
    /// Charge per kilometre of great-circle distance.
    pub per_km: f64,
}

/// Tariff for every ride class.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TariffTable {
    /// Economy tariff.
    #[serde(default = "default_economy")]
    pub economy: Tariff,
    /// Comfort tariff.
    #[serde(default = "default_comfort")]
    pub comfort: Tariff,
    /// Premium tariff.
    #[serde(default = "default_premium")]
    pub premium: Tariff,
    /// Luxury tariff.
    #[serde(default = "default_luxury")]
    pub luxury: Tariff,
}

impl TariffTable {
    /// Tariff for the given ride class.
    pub const fn for_class(&self, class: RideClass) -> Tariff {
        match class {
            RideClass::Economy => self.economy,
            RideClass::Comfort => self.comfort,
            RideClass::Premium => self.premium,
            RideClass::Luxury => self.luxury,
        }
    }
}

impl Default for TariffTable {
    fn default() -> Self {
        Self {
            economy: default_economy(),
            comfort: default_comfort(),
            premium: default_premium(),
            luxury: default_luxury(),
        }
    }
}

/// Price multiplier applied for each weather condition.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WeatherImpacts {
    /// Multiplier in clear weather.
    #[serde(default = "default_clear_impact")]
    pub clear: f64,
    /// Multiplier in rain.
    #[serde(default = "default_rain_impact")]
    pub rain: f64,
    /// Multiplier in snow.
    #[serde(default = "default_snow_impact")]
    pub snow: f64,
    /// Multiplier in fog.
    #[serde(default = "default_fog_impact")]
    pub fog: f64,
}

impl WeatherImpacts {
    /// Multiplier for the given weather.
    pub const fn impact(&self, weather: Weather) -> f64 {
        match weather {
            Weather::Clear => self.clear,
            Weather::Rain => self.rain,
            Weather::Snow => self.snow,
            Weather::Fog => self.fog,
        }
    }
}

impl Default for WeatherImpacts {
    fn default() -> Self {
        Self {
            clear: default_clear_impact(),
            rain: default_rain_impact(),
            snow: default_snow_impact(),
            fog: default_fog_impact(),
        }
    }
}

/// Pricing parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PricingConfig {
    /// Free-flow city speed used for ETA estimates.
    #[serde(default = "default_base_speed_kmh")]
    pub base_speed_kmh: f64,

    /// Charge per estimated minute, shared by all ride classes.
    #[serde(default = "default_per_minute_rate")]
    pub per_minute_rate: f64,

    /// Floor applied to every final price.
    #[serde(default = "default_minimum_fare")]
    pub minimum_fare: f64,

    /// Per-class tariffs.
    #[serde(default)]
    pub tariffs: TariffTable,

    /// Per-weather price multipliers.
    #[serde(default)]
    pub weather_impacts: WeatherImpacts,
}

impl PricingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_speed_kmh.is_finite() || self.base_speed_kmh <= 0.0 {
            return Err(invalid("pricing.base_speed_kmh must be positive"));
        }
        if !self.per_minute_rate.is_finite() || self.per_minute_rate < 0.0 {
            return Err(invalid("pricing.per_minute_rate must be non-negative"));
        }
        if !self.minimum_fare.is_finite() || self.minimum_fare < 0.0 {
            return Err(invalid("pricing.minimum_fare must be non-negative"));
        }
        for class in RideClass::ALL {
            let tariff = self.tariffs.for_class(class);
            let valid = tariff.base_fare.is_finite()
                && tariff.per_km.is_finite()
                && tariff.base_fare >= 0.0
                && tariff.per_km >= 0.0;
            if !valid {
                return Err(invalid(format!(
                    "pricing.tariffs.{class} must have non-negative base_fare and per_km"
                )));
            }
        }
        for weather in Weather::ALL {
            let impact = self.weather_impacts.impact(weather);
            if !impact.is_finite() || impact < 1.0 {
                return Err(invalid(format!(
                    "pricing.weather_impacts.{weather} must be at least 1.0"
                )));
            }
        }
        Ok(())
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_speed_kmh: default_base_speed_kmh(),
            per_minute_rate: default_per_minute_rate(),
            minimum_fare: default_minimum_fare(),
            tariffs: TariffTable::default(),
            weather_impacts: WeatherImpacts::default(),
        }
    }
}

/// Update fan-out settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastConfig {
    /// Pending messages each subscriber may hold before the oldest is dropped.
    #[serde(default = "default_subscriber_capacity")]
    pub subscriber_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: default_subscriber_capacity(),
        }
    }
}

/// In-memory market history settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryConfig {
    /// Number of recent snapshots retained.
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
        }
    }
}

/// City event settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EventsConfig {
    /// Chance that an events query finds an active event.
    #[serde(default = "default_event_probability")]
    pub probability: f64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            probability: default_event_probability(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    /// Override listener settings with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SURGE_HOST") {
            self.host = val;
        }
        if let Some(port) = std::env::var("SURGE_PORT")
            .ok()
            .and_then(|val| val.parse::<u16>().ok())
        {
            self.port = port;
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,

    /// Log a market summary line every N successful ticks (0 disables).
    #[serde(default = "default_summary_every_ticks")]
    pub summary_every_ticks: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            summary_every_ticks: default_summary_every_ticks(),
        }
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

const fn default_min_level() -> f64 {
    0.5
}

const fn default_max_level() -> f64 {
    2.0
}

const fn default_initial_level() -> f64 {
    1.0
}

const fn default_initial_weather() -> Weather {
    Weather::Clear
}

const fn default_tick_interval_ms() -> u64 {
    5000
}

const fn default_demand_noise_sd() -> f64 {
    0.1
}

const fn default_supply_noise_sd() -> f64 {
    0.08
}

const fn default_weather_change_probability() -> f64 {
    0.1
}

const fn default_incident_probability() -> f64 {
    0.05
}

const fn default_incident_min() -> f64 {
    1.3
}

const fn default_incident_max() -> f64 {
    2.0
}

const fn default_traffic_noise_sd() -> f64 {
    0.1
}

const fn default_economy() -> Tariff {
    Tariff {
        base_fare: 2.5,
        per_km: 1.75,
    }
}

const fn default_comfort() -> Tariff {
    Tariff {
        base_fare: 3.5,
        per_km: 2.25,
    }
}

const fn default_premium() -> Tariff {
    Tariff {
        base_fare: 5.0,
        per_km: 3.0,
    }
}

const fn default_luxury() -> Tariff {
    Tariff {
        base_fare: 8.0,
        per_km: 4.5,
    }
}

const fn default_clear_impact() -> f64 {
    1.0
}

const fn default_rain_impact() -> f64 {
    1.3
}

const fn default_snow_impact() -> f64 {
    1.6
}

const fn default_fog_impact() -> f64 {
    1.2
}

const fn default_base_speed_kmh() -> f64 {
    30.0
}

const fn default_per_minute_rate() -> f64 {
    0.35
}

const fn default_minimum_fare() -> f64 {
    5.0
}

const fn default_subscriber_capacity() -> usize {
    16
}

const fn default_history_capacity() -> usize {
    288
}

const fn default_event_probability() -> f64 {
    0.2
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_summary_every_ticks() -> u64 {
    12
}
