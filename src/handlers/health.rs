//! Health check endpoint
//!
//! Provides a simple health check for monitoring and load balancers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    pub routing_enabled: bool,
    /// Cached catalog size, `None` until the first successful load
    pub catalog_models: Option<usize>,
    /// Backend probing: "enabled" or "disabled"
    pub probing: &'static str,
    /// Probed backends currently below the failure threshold
    pub unavailable_models: usize,
}

/// Health check handler
///
/// Always 200 OK; never triggers catalog discovery.
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let catalog_models = state.router().catalog().cached().await.map(|entries| entries.len());

    let (probing, unavailable_models) = match state.availability() {
        Some(tracker) => {
            let unavailable = tracker
                .get_all_statuses()
                .await
                .iter()
                .filter(|health| !health.is_available())
                .count();
            ("enabled", unavailable)
        }
        None => ("disabled", 0),
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            routing_enabled: state.config().routing.enabled,
            catalog_models,
            probing,
            unavailable_models,
        }),
    )
}
