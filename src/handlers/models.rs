//! Models endpoint handler
//!
//! Exposes the backend catalog via GET /models, with resolved capabilities
//! and probe status when health probing is enabled.

use crate::catalog::{CapabilityProfile, LoadOptions, ModelKey};
use crate::handlers::AppState;
use axum::{Json, extract::State};
use serde::Serialize;
use std::collections::HashMap;

/// Response for GET /models endpoint
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelStatus>,
}

/// Probe state for a backend that has a health URL
#[derive(Debug, Serialize)]
pub struct ProbeStatus {
    pub endpoint: String,
    pub available: bool,
    pub availability: f64,
    pub last_check_seconds_ago: u64,
    pub consecutive_failures: u32,
}

/// One catalog entry as seen by the router
#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub provider: String,
    pub model: String,
    pub display_name: String,
    pub capabilities: CapabilityProfile,
    pub health: Option<ProbeStatus>,
}

/// GET /models handler
pub async fn handler(State(state): State<AppState>) -> Json<ModelsResponse> {
    let catalog = state.router().catalog();
    let entries = catalog.load(LoadOptions::default()).await;

    let mut probes: HashMap<ModelKey, ProbeStatus> = HashMap::new();
    if let Some(tracker) = state.availability() {
        for health in tracker.get_all_statuses().await {
            probes.insert(
                health.key().clone(),
                ProbeStatus {
                    endpoint: health.health_url().to_string(),
                    available: health.is_available(),
                    availability: health.availability(),
                    last_check_seconds_ago: health.last_check().elapsed().as_secs(),
                    consecutive_failures: health.consecutive_failures(),
                },
            );
        }
    }

    let models: Vec<ModelStatus> = entries
        .iter()
        .map(|entry| ModelStatus {
            provider: entry.provider_id.clone(),
            model: entry.id.clone(),
            display_name: entry.display_name.clone(),
            capabilities: entry.profile(catalog.default_tier()),
            health: probes.remove(&entry.key()),
        })
        .collect();

    tracing::debug!(
        total_models = models.len(),
        probed = models.iter().filter(|m| m.health.is_some()).count(),
        "Retrieved catalog for /models endpoint"
    );

    Json(ModelsResponse { models })
}
