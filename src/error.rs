//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache engine and its HTTP surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache (absent or expired)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Entry is larger than the total capacity of the cache
    #[error("Value of {size} bytes exceeds maximum cache size of {max} bytes")]
    OversizedValue { size: usize, max: usize },

    /// Eviction could not free enough room for the entry
    #[error("Eviction freed {freed} of {required} required bytes")]
    EvictionInsufficient { required: usize, freed: usize },

    /// Compression, encryption or their reverse failed
    #[error("Transform failed: {0}")]
    Transform(String),

    /// A persistence backend call failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Malformed key pattern
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Malformed engine configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns true for the size-related rejections raised by `set`.
    pub fn is_capacity_error(&self) -> bool {
        matches!(
            self,
            CacheError::OversizedValue { .. } | CacheError::EvictionInsufficient { .. }
        )
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::OversizedValue { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::EvictionInsufficient { .. } => StatusCode::INSUFFICIENT_STORAGE,
            CacheError::InvalidPattern(_) | CacheError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::Transform(_)
            | CacheError::Persistence(_)
            | CacheError::Config(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Transform(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
