//! Metrics endpoints
//!
//! GET /metrics serves Prometheus text for scraping; GET /metrics/snapshot
//! returns the in-process routing counters as JSON.

use axum::{Json, extract::State, http::StatusCode};

use crate::handlers::AppState;
use crate::metrics::{MetricsRecorder, MetricsSnapshot};

/// Metrics handler for Prometheus scraping
///
/// # Response
///
/// - `200 OK` with metrics in Prometheus text format
/// - `500 Internal Server Error` if metrics collection fails
///
/// # Example
///
/// ```bash
/// curl http://localhost:3000/metrics
/// # HELP taskroute_overrides_total Total manual model overrides
/// # TYPE taskroute_overrides_total counter
/// taskroute_overrides_total 3
/// ```
pub async fn handler(State(state): State<AppState>) -> (StatusCode, String) {
    match state.prometheus().gather() {
        Ok(output) => (StatusCode::OK, output),
        Err(e) => {
            tracing::error!(error = %e, "Failed to gather metrics for Prometheus scraping");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to gather metrics: {}", e),
            )
        }
    }
}

/// JSON snapshot of the routing counters
pub async fn snapshot_handler(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics().snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticSource;
    use crate::classifier::TaskType;
    use crate::config::Config;
    use crate::metrics::RoutingMetrics;
    use std::sync::Arc;

    fn create_test_state() -> AppState {
        AppState::with_parts(
            Arc::new(Config::default()),
            Arc::new(StaticSource::default()),
            Arc::new(RoutingMetrics::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_metrics_handler_returns_prometheus_format() {
        let state = create_test_state();
        state.metrics().record_override("openai", "gpt-4o");

        let (status, body) = handler(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("# HELP"));
        assert!(body.contains("# TYPE"));
        assert!(body.contains("taskroute_overrides_total 1"));
    }

    #[tokio::test]
    async fn test_snapshot_handler_reflects_counters() {
        let state = create_test_state();
        state.metrics().record_task_type(TaskType::Coding);
        state.metrics().record_fallback("anthropic", "claude-sonnet-4");

        let Json(snapshot) = snapshot_handler(State(state)).await;
        assert_eq!(snapshot.decisions_by_task_type.get("coding"), Some(&1));
        assert_eq!(snapshot.fallbacks_used, 1);
    }

    #[tokio::test]
    async fn test_concurrent_metrics_scraping() {
        let state = create_test_state();
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move { handler(State(state)).await })
            })
            .collect();

        for handle in handles {
            let (status, _) = handle.await.unwrap();
            assert_eq!(status, StatusCode::OK);
        }
    }
}
