//! Error types for taskroute
//!
//! `AppError` covers configuration and HTTP-facing failures and implements
//! `IntoResponse` for Axum handlers. Catalog and routing failures have their
//! own types because neither is ever surfaced to routing callers as an error.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file '{path}': {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

/// Failures while discovering the backend catalog
///
/// Never propagated past the catalog: a failed load yields an empty list and
/// leaves the cache unpoisoned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Catalog discovery failed: {0}")]
    Discovery(String),

    #[error("Catalog discovery timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Failed to read catalog file '{path}': {reason}")]
    FileRead { path: String, reason: String },

    #[error("Failed to parse catalog file '{path}': {reason}")]
    Parse { path: String, reason: String },

    #[error("Invalid catalog entry '{provider}/{model}': {reason}")]
    InvalidEntry {
        provider: String,
        model: String,
        reason: String,
    },
}

/// Unexpected faults inside the routing pipeline
///
/// Converted to a `None` routing result at the router boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    #[error("Score for {provider}/{model} is not a finite number")]
    NonFiniteScore { provider: String, model: String },

    #[error("Ranking lost its primary entry after preference adjustment")]
    MissingPrimary,
}

/// Failure reported by the credential-cooldown collaborator
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Credential cooldown lookup failed for provider '{provider}': {reason}")]
pub struct CooldownError {
    pub provider: String,
    pub reason: String,
}
