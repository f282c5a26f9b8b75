//! HTTP request handlers for the taskroute API

use crate::catalog::{AvailabilityTracker, BackendCatalog, CatalogSource, FileSource, StaticSource};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics::{PrometheusSink, RoutingMetrics, global_metrics};
use crate::middleware::request_id_middleware;
use crate::router::TaskBasedRouter;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod health;
pub mod metrics;
pub mod models;
pub mod route;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    router: Arc<TaskBasedRouter>,
    metrics: Arc<RoutingMetrics>,
    prometheus: PrometheusSink,
    availability: Option<Arc<AvailabilityTracker>>,
}

impl AppState {
    /// Create state from configuration, using the process-wide metrics
    ///
    /// The catalog reads `catalog.path` when set and is empty otherwise.
    pub fn new(config: Arc<Config>) -> AppResult<Self> {
        let source: Arc<dyn CatalogSource> = match &config.catalog.path {
            Some(path) => Arc::new(FileSource::new(path.clone())),
            None => {
                tracing::warn!("No catalog.path configured, routing will see an empty catalog");
                Arc::new(StaticSource::default())
            }
        };
        Self::with_parts(config, source, global_metrics())
    }

    /// Create state over an explicit catalog source and metrics instance
    pub fn with_parts(
        config: Arc<Config>,
        source: Arc<dyn CatalogSource>,
        metrics: Arc<RoutingMetrics>,
    ) -> AppResult<Self> {
        let prometheus = PrometheusSink::new().map_err(|e| {
            AppError::Internal(format!("Failed to register Prometheus metrics: {}", e))
        })?;
        prometheus.attach(&metrics);

        let catalog = Arc::new(
            BackendCatalog::new(source)
                .with_default_tier(config.catalog.default_cost_tier)
                .with_discovery_timeout(config.catalog.discovery_timeout()),
        );

        let availability = config
            .health
            .enabled
            .then(|| Arc::new(AvailabilityTracker::new(config.health.timeout())));

        let mut router = TaskBasedRouter::new(config.routing.clone(), catalog, metrics.clone());
        if let Some(tracker) = &availability {
            router = router.with_availability(Arc::clone(tracker));
        }

        Ok(Self {
            config,
            router: Arc::new(router),
            metrics,
            prometheus,
            availability,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn router(&self) -> &TaskBasedRouter {
        &self.router
    }

    pub fn metrics(&self) -> &RoutingMetrics {
        &self.metrics
    }

    pub fn prometheus(&self) -> &PrometheusSink {
        &self.prometheus
    }

    pub fn availability(&self) -> Option<&Arc<AvailabilityTracker>> {
        self.availability.as_ref()
    }

    /// Register current probe targets and start background probes
    ///
    /// No-op when health probing is disabled.
    pub async fn start_health_probes(&self) {
        let Some(tracker) = &self.availability else {
            return;
        };

        let catalog = Arc::clone(self.router.catalog());
        tracker.refresh(&catalog).await;
        Arc::clone(tracker).start_background_probes(catalog, self.config.health.interval());
    }
}

/// Build the HTTP application with all routes and middleware
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/route", post(route::handler))
        .route("/models", get(models::handler))
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .route("/metrics/snapshot", get(metrics::snapshot_handler))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
