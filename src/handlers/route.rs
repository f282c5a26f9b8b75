//! Routing endpoint
//!
//! POST /route classifies the prompt, ranks the catalog and returns the
//! selected model with its fallback chain.

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::RequestId;
use crate::router::{ModelSelection, RouteRequest, resolve_model};
use axum::{Extension, Json, extract::State};
use serde::Serialize;
use std::time::Instant;

/// Response for POST /route
#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub request_id: String,
    #[serde(flatten)]
    pub selection: ModelSelection,
    pub duration_ms: f64,
}

/// POST /route handler
///
/// A blank prompt is rejected unless the request names an override model.
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RouteRequest>,
) -> AppResult<Json<RouteResponse>> {
    if request.prompt.trim().is_empty() && request.override_model.is_none() {
        return Err(AppError::Validation(
            "prompt must not be empty unless an override model is given".to_string(),
        ));
    }

    let start = Instant::now();
    let selection = resolve_model(state.router(), &request, None).await;
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    if let Err(e) = state.prometheus().record_routing_duration(duration_ms) {
        tracing::warn!(
            request_id = %request_id,
            error = %e,
            "Failed to record routing duration"
        );
    }

    tracing::info!(
        request_id = %request_id,
        model = selection
            .model()
            .map(|m| format!("{}/{}", m.provider, m.model))
            .unwrap_or_else(|| "<manual>".to_string()),
        duration_ms,
        "Route request completed"
    );

    Ok(Json(RouteResponse {
        request_id: request_id.to_string(),
        selection,
        duration_ms,
    }))
}
