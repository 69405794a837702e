//! Error types shared by the market store, geometry, and pricing paths.
//!
//! Tick, broadcast, and configuration failures have their own error types
//! next to the code that produces them.

/// Errors surfaced to callers of the market engine's read and write paths.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarketError {
    /// A coordinate was non-finite or outside its valid range.
    #[error("invalid {field}: {value} is not a valid coordinate")]
    InvalidGeometry {
        /// Name of the offending request field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A demand or supply override was non-finite.
    #[error("invalid {field} level: {value}")]
    InvalidLevel {
        /// `demand` or `supply`.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The store has not committed its first snapshot yet.
    #[error("market state is not available yet")]
    StoreUnavailable,
}
