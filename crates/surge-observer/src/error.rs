//! Error types for the API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use surge_core::MarketError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// A market operation failed.
    #[error("{0}")]
    Market(#[from] MarketError),

    /// An invalid query parameter or request body value was provided.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ObserverError {
    /// HTTP status this error maps to.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Market(MarketError::InvalidGeometry { .. } | MarketError::InvalidLevel { .. })
            | Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::Market(MarketError::StoreUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Serialization(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Serialization(e) => format!("JSON error: {e}"),
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_errors_map_to_status_codes() {
        let geometry = ObserverError::from(MarketError::InvalidGeometry {
            field: "pickup_lat",
            value: 100.0,
        });
        assert_eq!(geometry.status_code(), StatusCode::BAD_REQUEST);

        let unavailable = ObserverError::from(MarketError::StoreUnavailable);
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let internal = ObserverError::Internal("boom".to_owned());
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
