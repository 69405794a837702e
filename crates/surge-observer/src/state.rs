//! Shared application state for the API server.

use std::sync::Arc;

use surge_core::MarketEngine;

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The market engine all endpoints operate on.
    pub engine: Arc<MarketEngine>,
}

impl AppState {
    /// Wrap a shared engine.
    pub const fn new(engine: Arc<MarketEngine>) -> Self {
        Self { engine }
    }
}
