//! Backend catalog
//!
//! Asynchronous, memoized list of available backends with resolved capability
//! profiles. Discovery itself is delegated to a [`CatalogSource`].
//!
//! The cache is an explicit state machine:
//! - `Empty` → `Loading` on the first `load()` (or a bypass request)
//! - `Loading` → `Ready` when discovery returns at least one entry
//! - `Loading` → `Empty` on failure, timeout, or an empty result
//! - `Ready` → `Loading` only when a caller asks to bypass the cache
//!
//! Concurrent callers during `Loading` share one discovery future and one
//! outcome. State transitions happen under a single mutex, so readers never
//! observe a half-installed cache.

pub mod capability;
pub mod health;
pub mod model_key;
pub mod source;

pub use capability::{CapabilityProfile, CostTier};
pub use health::{AvailabilitySignals, AvailabilityTracker, ModelHealth};
pub use model_key::{ExclusionSet, ModelKey, ModelRef};
pub use source::{CatalogSource, FileSource, StaticSource};

use crate::error::CatalogError;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Default discovery timeout
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Input modality a backend accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputModality {
    Text,
    Image,
}

/// Declared per-million-token prices
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct CostFigures {
    #[serde(default)]
    pub input: f64,
    #[serde(default)]
    pub output: f64,
    #[serde(default)]
    pub cache_read: f64,
    #[serde(default)]
    pub cache_write: f64,
}

impl CostFigures {
    /// Sum of all figures; negative or non-finite figures count as zero
    pub fn total(&self) -> f64 {
        [self.input, self.output, self.cache_read, self.cache_write]
            .into_iter()
            .filter(|figure| figure.is_finite() && *figure > 0.0)
            .sum()
    }
}

/// One available backend
///
/// Identity is `(provider_id, id)`, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(alias = "provider")]
    pub provider_id: String,
    #[serde(default)]
    pub context_window: Option<u64>,
    #[serde(default)]
    pub reasoning: Option<bool>,
    #[serde(default)]
    pub supported_inputs: Option<Vec<InputModality>>,
    #[serde(default)]
    pub cost: Option<CostFigures>,
    #[serde(default)]
    pub capabilities: Option<CapabilityProfile>,
    /// URL probed by the availability tracker (HEAD request)
    #[serde(default)]
    pub health_url: Option<String>,
}

impl CatalogEntry {
    /// Create an entry with only its identity and display name declared
    pub fn new(
        provider_id: impl Into<String>,
        id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            provider_id: provider_id.into(),
            context_window: None,
            reasoning: None,
            supported_inputs: None,
            cost: None,
            capabilities: None,
            health_url: None,
        }
    }

    pub fn key(&self) -> ModelKey {
        ModelKey::new(&self.provider_id, &self.id)
    }

    pub fn model_ref(&self) -> ModelRef {
        ModelRef::new(self.provider_id.clone(), self.id.clone())
    }

    /// Resolved capability profile (explicit or inferred)
    pub fn profile(&self, default_tier: CostTier) -> CapabilityProfile {
        capability::resolve(self, default_tier)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidEntry {
            provider: self.provider_id.clone(),
            model: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if self.provider_id.trim().is_empty() {
            return Err(invalid("provider must not be empty"));
        }
        if let Some(profile) = &self.capabilities
            && profile.context_window == 0
        {
            return Err(invalid("capabilities.context_window must be greater than 0"));
        }
        Ok(())
    }
}

/// Options for a single `load()` call
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Ignore a `Ready` cache and run discovery again
    pub bypass_cache: bool,
}

impl LoadOptions {
    pub fn bypass() -> Self {
        Self { bypass_cache: true }
    }
}

/// `None` means discovery failed or returned nothing usable
type LoadOutcome = Option<Arc<Vec<CatalogEntry>>>;
type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;

enum CacheState {
    Empty,
    Loading { generation: u64, load: SharedLoad },
    Ready(Arc<Vec<CatalogEntry>>),
}

/// Memoized, single-flight backend catalog
pub struct BackendCatalog {
    source: Arc<dyn CatalogSource>,
    state: Mutex<CacheState>,
    generation: AtomicU64,
    default_tier: CostTier,
    discovery_timeout: Duration,
    /// Set after the first failure of a streak so later failures log quietly
    failure_logged: Arc<AtomicBool>,
}

impl std::fmt::Debug for BackendCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendCatalog")
            .field("default_tier", &self.default_tier)
            .field("discovery_timeout", &self.discovery_timeout)
            .finish_non_exhaustive()
    }
}

impl BackendCatalog {
    /// Create a catalog over the given discovery source
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            state: Mutex::new(CacheState::Empty),
            generation: AtomicU64::new(0),
            default_tier: CostTier::default(),
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            failure_logged: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cost tier assumed for entries without cost figures
    pub fn with_default_tier(mut self, tier: CostTier) -> Self {
        self.default_tier = tier;
        self
    }

    /// Upper bound on a single discovery call
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    pub fn default_tier(&self) -> CostTier {
        self.default_tier
    }

    /// Load the catalog, sorted by provider then display name
    ///
    /// Never fails: a failed, timed-out or empty discovery returns an empty
    /// list and leaves the cache `Empty`, so the next call retries.
    pub async fn load(&self, options: LoadOptions) -> Arc<Vec<CatalogEntry>> {
        let (generation, load) = {
            let mut state = self.state.lock().await;
            match &*state {
                CacheState::Ready(entries) if !options.bypass_cache => {
                    return Arc::clone(entries);
                }
                CacheState::Loading { generation, load } => {
                    tracing::debug!(generation, "Joining in-flight catalog discovery");
                    (*generation, load.clone())
                }
                CacheState::Empty | CacheState::Ready(_) => {
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                    let load = self.start_discovery(generation);
                    *state = CacheState::Loading {
                        generation,
                        load: load.clone(),
                    };
                    (generation, load)
                }
            }
        };

        let outcome = load.await;

        {
            let mut state = self.state.lock().await;
            let still_current = matches!(
                &*state,
                CacheState::Loading { generation: current, .. } if *current == generation
            );
            if still_current {
                *state = match &outcome {
                    Some(entries) => CacheState::Ready(Arc::clone(entries)),
                    None => CacheState::Empty,
                };
            }
        }

        outcome.unwrap_or_default()
    }

    /// Return the cached list without triggering discovery
    pub async fn cached(&self) -> Option<Arc<Vec<CatalogEntry>>> {
        match &*self.state.lock().await {
            CacheState::Ready(entries) => Some(Arc::clone(entries)),
            CacheState::Empty | CacheState::Loading { .. } => None,
        }
    }

    /// Drop a `Ready` cache; an in-flight load is left alone
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        if matches!(&*state, CacheState::Ready(_)) {
            *state = CacheState::Empty;
        }
    }

    /// Case-insensitive lookup by `(provider, model)`
    pub async fn find_by_identity(
        &self,
        provider_id: &str,
        model_id: &str,
    ) -> Option<CatalogEntry> {
        let entries = self.load(LoadOptions::default()).await;
        find_by_identity(&entries, provider_id, model_id).cloned()
    }

    fn start_discovery(&self, generation: u64) -> SharedLoad {
        let source = Arc::clone(&self.source);
        let timeout = self.discovery_timeout;
        let default_tier = self.default_tier;
        let failure_logged = Arc::clone(&self.failure_logged);

        async move {
            tracing::debug!(
                generation,
                timeout_ms = timeout.as_millis() as u64,
                "Starting catalog discovery"
            );

            let discovered = match tokio::time::timeout(timeout, source.discover()).await {
                Ok(result) => result,
                Err(_) => Err(CatalogError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };

            let failure = match discovered {
                Ok(raw) => {
                    let discovered_count = raw.len();
                    let entries = normalize(raw, default_tier);
                    if !entries.is_empty() {
                        failure_logged.store(false, Ordering::Relaxed);
                        tracing::info!(
                            generation,
                            discovered = discovered_count,
                            models = entries.len(),
                            "Catalog loaded"
                        );
                        return Some(Arc::new(entries));
                    }
                    "discovery returned no usable models".to_string()
                }
                Err(e) => e.to_string(),
            };

            if failure_logged.swap(true, Ordering::Relaxed) {
                tracing::debug!(generation, reason = %failure, "Catalog discovery failed again");
            } else {
                tracing::warn!(
                    generation,
                    reason = %failure,
                    "Catalog discovery failed; returning empty catalog and retrying on next load"
                );
            }
            None
        }
        .boxed()
        .shared()
    }
}

/// Case-insensitive lookup in an already-loaded list
pub fn find_by_identity<'a>(
    entries: &'a [CatalogEntry],
    provider_id: &str,
    model_id: &str,
) -> Option<&'a CatalogEntry> {
    let key = ModelKey::new(provider_id, model_id);
    entries.iter().find(|entry| entry.key() == key)
}

/// Validate, resolve capabilities, dedupe (first wins) and sort
fn normalize(raw: Vec<CatalogEntry>, default_tier: CostTier) -> Vec<CatalogEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(raw.len());

    for mut entry in raw {
        if let Err(e) = entry.validate() {
            tracing::warn!(error = %e, "Skipping invalid catalog entry");
            continue;
        }
        if !seen.insert(entry.key()) {
            tracing::debug!(model = %entry.key(), "Skipping duplicate catalog entry");
            continue;
        }
        if entry.display_name.trim().is_empty() {
            entry.display_name = entry.id.clone();
        }
        entry.capabilities = Some(capability::resolve(&entry, default_tier));
        entries.push(entry);
    }

    entries.sort_by(|a, b| {
        a.provider_id
            .to_lowercase()
            .cmp(&b.provider_id.to_lowercase())
            .then_with(|| a.display_name.to_lowercase().cmp(&b.display_name.to_lowercase()))
    });
    entries
}
