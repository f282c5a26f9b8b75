//! In-process routing metrics
//!
//! [`RoutingMetrics`] keeps counters for every routing decision and exposes a
//! point-in-time [`MetricsSnapshot`]. Counters are atomics; per-key maps sit
//! behind a mutex, so concurrent recorders never lose an update.
//!
//! An optional observer sees every recorded event as a `(name, value)` pair.
//! [`PrometheusSink`](prometheus::PrometheusSink) is one such observer.

pub mod prometheus;

pub use self::prometheus::PrometheusSink;

use crate::classifier::TaskType;
use crate::router::RoutingDecision;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Observer event names
pub mod events {
    pub const DECISION: &str = "routing.decision";
    pub const TASK_TYPE_PREFIX: &str = "routing.task_type.";
    pub const PROVIDER_PREFIX: &str = "routing.provider.";
    pub const SELECTION_SCORE: &str = "routing.selection_score";
    pub const FALLBACK: &str = "routing.fallback";
    pub const OVERRIDE: &str = "routing.override";
    pub const ERROR: &str = "routing.error";
}

/// Callback invoked for every recorded event
pub type MetricObserver = Arc<dyn Fn(&str, f64) + Send + Sync>;

/// Sink for routing events
pub trait MetricsRecorder: Send + Sync {
    fn record_decision(&self, decision: &RoutingDecision);
    fn record_task_type(&self, task_type: TaskType);
    fn record_model_selection(&self, provider: &str, model: &str, score: f64);
    fn record_fallback(&self, provider: &str, model: &str);
    fn record_override(&self, provider: &str, model: &str);
    fn record_error(&self, message: &str);
    fn snapshot(&self) -> MetricsSnapshot;
    fn reset(&self);
}

/// Selection count and mean score for one `provider/model`
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct ModelSelectionStats {
    pub count: u64,
    pub avg_score: f64,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MetricsSnapshot {
    pub total_decisions: u64,
    pub decisions_by_task_type: BTreeMap<String, u64>,
    pub decisions_by_strategy: BTreeMap<String, u64>,
    pub selections_by_provider: BTreeMap<String, u64>,
    pub model_selections: BTreeMap<String, ModelSelectionStats>,
    pub fallbacks_used: u64,
    pub overrides_used: u64,
    pub errors: u64,
    pub last_error: Option<String>,
    /// Milliseconds since the Unix epoch
    pub snapshot_at_ms: u64,
}

#[derive(Debug, Default)]
struct ScoreAccumulator {
    count: u64,
    score_sum: f64,
}

#[derive(Debug, Default)]
struct KeyedCounters {
    by_task_type: HashMap<String, u64>,
    by_strategy: HashMap<String, u64>,
    by_provider: HashMap<String, u64>,
    by_model: HashMap<String, ScoreAccumulator>,
    last_error: Option<String>,
}

/// Process-wide routing counters
#[derive(Default)]
pub struct RoutingMetrics {
    total_decisions: AtomicU64,
    fallbacks_used: AtomicU64,
    overrides_used: AtomicU64,
    errors: AtomicU64,
    keyed: Mutex<KeyedCounters>,
    observer: RwLock<Option<MetricObserver>>,
}

impl std::fmt::Debug for RoutingMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingMetrics")
            .field("total_decisions", &self.total_decisions.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn now_ms() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as u64,
        Err(e) => {
            tracing::warn!(error = %e, "System clock is before the Unix epoch");
            0
        }
    }
}

impl RoutingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the per-event observer, replacing any previous one
    pub fn set_observer(&self, observer: MetricObserver) {
        *self
            .observer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(observer);
    }

    fn emit(&self, name: &str, value: f64) {
        let observer = self
            .observer
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        if let Some(observer) = observer {
            observer(name, value);
        }
    }

    /// Counter maps stay consistent even if a holder panicked
    fn keyed(&self) -> MutexGuard<'_, KeyedCounters> {
        self.keyed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MetricsRecorder for RoutingMetrics {
    fn record_decision(&self, decision: &RoutingDecision) {
        self.total_decisions.fetch_add(1, Ordering::Relaxed);
        *self
            .keyed()
            .by_strategy
            .entry(decision.kind.as_str().to_string())
            .or_default() += 1;
        self.emit(events::DECISION, 1.0);
    }

    fn record_task_type(&self, task_type: TaskType) {
        *self
            .keyed()
            .by_task_type
            .entry(task_type.as_str().to_string())
            .or_default() += 1;
        self.emit(&format!("{}{}", events::TASK_TYPE_PREFIX, task_type), 1.0);
    }

    fn record_model_selection(&self, provider: &str, model: &str, score: f64) {
        {
            let mut keyed = self.keyed();
            *keyed.by_provider.entry(provider.to_string()).or_default() += 1;
            let stats = keyed
                .by_model
                .entry(format!("{}/{}", provider, model))
                .or_default();
            stats.count += 1;
            stats.score_sum += score;
        }
        self.emit(&format!("{}{}", events::PROVIDER_PREFIX, provider), 1.0);
        self.emit(events::SELECTION_SCORE, score);
    }

    fn record_fallback(&self, provider: &str, model: &str) {
        self.fallbacks_used.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(provider = %provider, model = %model, "Recorded fallback model use");
        self.emit(events::FALLBACK, 1.0);
    }

    fn record_override(&self, provider: &str, model: &str) {
        self.overrides_used.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(provider = %provider, model = %model, "Recorded manual override");
        self.emit(events::OVERRIDE, 1.0);
    }

    fn record_error(&self, message: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        self.keyed().last_error = Some(message.to_string());
        self.emit(events::ERROR, 1.0);
    }

    fn snapshot(&self) -> MetricsSnapshot {
        let keyed = self.keyed();
        let sorted = |map: &HashMap<String, u64>| -> BTreeMap<String, u64> {
            map.iter().map(|(k, v)| (k.clone(), *v)).collect()
        };

        MetricsSnapshot {
            total_decisions: self.total_decisions.load(Ordering::Relaxed),
            decisions_by_task_type: sorted(&keyed.by_task_type),
            decisions_by_strategy: sorted(&keyed.by_strategy),
            selections_by_provider: sorted(&keyed.by_provider),
            model_selections: keyed
                .by_model
                .iter()
                .map(|(key, acc)| {
                    let avg_score = if acc.count == 0 {
                        0.0
                    } else {
                        acc.score_sum / acc.count as f64
                    };
                    (
                        key.clone(),
                        ModelSelectionStats {
                            count: acc.count,
                            avg_score,
                        },
                    )
                })
                .collect(),
            fallbacks_used: self.fallbacks_used.load(Ordering::Relaxed),
            overrides_used: self.overrides_used.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            last_error: keyed.last_error.clone(),
            snapshot_at_ms: now_ms(),
        }
    }

    fn reset(&self) {
        let mut keyed = self.keyed();
        *keyed = KeyedCounters::default();
        self.total_decisions.store(0, Ordering::Relaxed);
        self.fallbacks_used.store(0, Ordering::Relaxed);
        self.overrides_used.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }
}

/// Recorder that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsRecorder for NoopMetrics {
    fn record_decision(&self, _decision: &RoutingDecision) {}
    fn record_task_type(&self, _task_type: TaskType) {}
    fn record_model_selection(&self, _provider: &str, _model: &str, _score: f64) {}
    fn record_fallback(&self, _provider: &str, _model: &str) {}
    fn record_override(&self, _provider: &str, _model: &str) {}
    fn record_error(&self, _message: &str) {}

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            snapshot_at_ms: now_ms(),
            ..MetricsSnapshot::default()
        }
    }

    fn reset(&self) {}
}

static GLOBAL_METRICS: Mutex<Option<Arc<RoutingMetrics>>> = Mutex::new(None);

/// Shared process-wide instance, created on first use
///
/// Returns the same instance until [`reset_global_metrics`] is called.
pub fn global_metrics() -> Arc<RoutingMetrics> {
    let mut global = GLOBAL_METRICS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(global.get_or_insert_with(|| Arc::new(RoutingMetrics::new())))
}

/// Discard the process-wide instance; the next accessor call creates a new one
pub fn reset_global_metrics() {
    GLOBAL_METRICS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
}
