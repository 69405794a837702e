//! Error types for the market engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and shutdown.

/// Top-level error for the market engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: surge_core::ConfigError,
    },

    /// The dynamics simulator could not be built.
    #[error("simulator error: {source}")]
    Simulator {
        /// The underlying simulator error.
        #[from]
        source: surge_core::TickError,
    },

    /// The market API server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: surge_observer::ServerError,
    },

    /// The server task panicked or was cancelled.
    #[error("server task failed: {message}")]
    ServerTask {
        /// Description of the join failure.
        message: String,
    },
}
