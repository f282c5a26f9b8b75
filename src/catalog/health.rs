//! Live availability tracking for catalog entries
//!
//! Optional: routing defaults to availability 1.0 for every backend. When a
//! tracker is attached, entries that declare a `health_url` are probed with an
//! HTTP HEAD request bounded by a timeout. Probe failures never fail routing;
//! they only lower the availability signal.
//!
//! - each consecutive failure lowers availability by 1/3
//! - 3 consecutive failures → availability 0.0 (unavailable)
//! - 1 successful probe → back to 1.0

use super::{BackendCatalog, CatalogEntry, LoadOptions, ModelKey};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Consecutive failures after which a backend counts as unavailable
const UNHEALTHY_THRESHOLD: u32 = 3;

/// Availability signal per backend, each value clamped to [0, 1]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvailabilitySignals {
    signals: HashMap<ModelKey, f64>,
}

impl AvailabilitySignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signal; non-finite values are treated as unavailable
    pub fn insert(&mut self, key: ModelKey, availability: f64) {
        let value = if availability.is_finite() {
            availability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.signals.insert(key, value);
    }

    pub fn with(mut self, key: ModelKey, availability: f64) -> Self {
        self.insert(key, availability);
        self
    }

    pub fn get(&self, key: &ModelKey) -> Option<f64> {
        self.signals.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

/// Health state of a single probed backend
#[derive(Clone, Debug)]
pub struct ModelHealth {
    key: ModelKey,
    health_url: String,
    last_check: Instant,
    consecutive_failures: u32,
}

impl ModelHealth {
    pub fn new(key: ModelKey, health_url: String) -> Self {
        Self {
            key,
            health_url,
            last_check: Instant::now(),
            consecutive_failures: 0,
        }
    }

    pub fn key(&self) -> &ModelKey {
        &self.key
    }

    pub fn health_url(&self) -> &str {
        &self.health_url
    }

    pub fn last_check(&self) -> Instant {
        self.last_check
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// 1.0 when healthy, decreasing linearly to 0.0 at the threshold
    pub fn availability(&self) -> f64 {
        let failures = self.consecutive_failures.min(UNHEALTHY_THRESHOLD);
        1.0 - f64::from(failures) / f64::from(UNHEALTHY_THRESHOLD)
    }

    pub fn is_available(&self) -> bool {
        self.consecutive_failures < UNHEALTHY_THRESHOLD
    }
}

/// Tracks probe results for every catalog entry with a health URL
pub struct AvailabilityTracker {
    health: Arc<RwLock<HashMap<ModelKey, ModelHealth>>>,
    probe_timeout: Duration,
}

impl AvailabilityTracker {
    pub fn new(probe_timeout: Duration) -> Self {
        Self {
            health: Arc::new(RwLock::new(HashMap::new())),
            probe_timeout,
        }
    }

    /// Start tracking entries that declare a health URL
    ///
    /// Already-tracked entries keep their state. Safe to call after every
    /// catalog load; the write lock is only taken when something is new.
    pub async fn register(&self, entries: &[CatalogEntry]) {
        let untracked: Vec<(ModelKey, String)> = {
            let health = self.health.read().await;
            entries
                .iter()
                .filter_map(|entry| {
                    let url = entry.health_url.as_ref().filter(|url| !url.trim().is_empty())?;
                    let key = entry.key();
                    (!health.contains_key(&key)).then(|| (key, url.clone()))
                })
                .collect()
        };

        if untracked.is_empty() {
            return;
        }

        let mut health = self.health.write().await;
        let added = untracked.len();
        for (key, url) in untracked {
            health
                .entry(key.clone())
                .or_insert_with(|| ModelHealth::new(key, url));
        }

        tracing::info!(
            added_models = added,
            tracked_models = health.len(),
            "Availability tracker registered models"
        );
    }

    /// Load the catalog and track any entries not seen before
    ///
    /// A failed or empty load registers nothing; the next call retries.
    pub async fn refresh(&self, catalog: &BackendCatalog) {
        let entries = catalog.load(LoadOptions::default()).await;
        if entries.is_empty() {
            tracing::debug!("Catalog empty, no availability probe targets to register");
            return;
        }
        self.register(&entries).await;
    }

    /// Current availability signals for all tracked backends
    pub async fn snapshot(&self) -> AvailabilitySignals {
        let health = self.health.read().await;
        let mut signals = AvailabilitySignals::new();
        for (key, state) in health.iter() {
            signals.insert(key.clone(), state.availability());
        }
        signals
    }

    pub async fn get_all_statuses(&self) -> Vec<ModelHealth> {
        let health = self.health.read().await;
        health.values().cloned().collect()
    }

    pub async fn mark_failure(&self, key: &ModelKey) {
        let mut health = self.health.write().await;

        let Some(state) = health.get_mut(key) else {
            tracing::warn!(model = %key, "Attempted to mark failure for untracked model");
            return;
        };

        let was_available = state.is_available();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_check = Instant::now();

        if was_available && !state.is_available() {
            tracing::warn!(
                model = %key,
                consecutive_failures = state.consecutive_failures,
                "Model marked unavailable after consecutive probe failures"
            );
        } else {
            tracing::debug!(
                model = %key,
                consecutive_failures = state.consecutive_failures,
                availability = state.availability(),
                "Probe failure recorded"
            );
        }
    }

    pub async fn mark_success(&self, key: &ModelKey) {
        let mut health = self.health.write().await;

        let Some(state) = health.get_mut(key) else {
            tracing::warn!(model = %key, "Attempted to mark success for untracked model");
            return;
        };

        let was_unavailable = !state.is_available();
        state.consecutive_failures = 0;
        state.last_check = Instant::now();

        if was_unavailable {
            tracing::info!(model = %key, "Model recovered to available");
        } else {
            tracing::debug!(model = %key, "Probe succeeded");
        }
    }

    /// HEAD the URL; any error or non-2xx status counts as a failure
    async fn probe(&self, key: &ModelKey, url: &str) -> bool {
        let client = match reqwest::Client::builder()
            .timeout(self.probe_timeout)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(
                    model = %key,
                    error = %e,
                    "Failed to create HTTP client for availability probe"
                );
                return false;
            }
        };

        match client.head(url).send().await {
            Ok(response) => {
                let is_success = response.status().is_success();
                tracing::debug!(
                    model = %key,
                    url = %url,
                    status = %response.status(),
                    available = is_success,
                    "Availability probe completed"
                );
                is_success
            }
            Err(e) => {
                tracing::debug!(model = %key, url = %url, error = %e, "Availability probe failed");
                false
            }
        }
    }

    /// Probe every tracked backend once
    pub async fn run_probes(&self) {
        let targets: Vec<(ModelKey, String)> = {
            let health = self.health.read().await;
            health
                .values()
                .map(|state| (state.key.clone(), state.health_url.clone()))
                .collect()
        };

        for (key, url) in targets {
            if self.probe(&key, &url).await {
                self.mark_success(&key).await;
            } else {
                self.mark_failure(&key).await;
            }
        }
    }

    /// Spawn a task that probes all tracked backends every `interval`
    ///
    /// Each pass refreshes probe targets from `catalog` first, so backends
    /// discovered after startup are picked up.
    pub fn start_background_probes(
        self: Arc<Self>,
        catalog: Arc<BackendCatalog>,
        interval: Duration,
    ) {
        let handle = tokio::spawn(async move {
            tracing::info!(
                interval_seconds = interval.as_secs(),
                "Starting background availability probes"
            );

            loop {
                tokio::time::sleep(interval).await;
                tracing::debug!("Running scheduled availability probes");
                self.refresh(&catalog).await;
                self.run_probes().await;
            }
        });

        tokio::spawn(async move {
            match handle.await {
                Ok(_) => {
                    tracing::error!(
                        "Background availability probe task terminated unexpectedly. \
                        Availability signals are frozen at their last values."
                    );
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        "Background availability probe task panicked. \
                        Availability signals are frozen at their last values."
                    );
                }
            }
        });
    }
}
