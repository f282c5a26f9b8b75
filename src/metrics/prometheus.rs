//! Prometheus export for routing metrics
//!
//! [`PrometheusSink`] mirrors the in-process counters into a Prometheus
//! registry. It is fed through the [`RoutingMetrics`] observer, so the
//! in-process counters stay the source of truth.
//!
//! Label cardinality is bounded: task types are a closed set, and providers
//! come from the configured catalog.

use super::{RoutingMetrics, events};
use ::prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Prometheus mirror of the routing counters
#[derive(Clone)]
pub struct PrometheusSink {
    pub registry: Arc<Registry>,
    decisions_total: IntCounter,
    task_types_total: IntCounterVec,
    selections_total: IntCounterVec,
    selection_score: Histogram,
    fallbacks_total: IntCounter,
    overrides_total: IntCounter,
    errors_total: IntCounter,
    routing_duration: Histogram,
}

impl PrometheusSink {
    /// Register all metrics with a new registry
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, ::prometheus::Error> {
        let registry = Registry::new();

        let decisions_total = IntCounter::with_opts(Opts::new(
            "taskroute_decisions_total",
            "Total routing decisions, including manual overrides",
        ))?;

        let task_types_total = IntCounterVec::new(
            Opts::new(
                "taskroute_task_types_total",
                "Routed tasks by classified task type",
            ),
            &["task_type"],
        )?;

        let selections_total = IntCounterVec::new(
            Opts::new(
                "taskroute_selections_total",
                "Primary model selections by provider",
            ),
            &["provider"],
        )?;

        let selection_score = Histogram::with_opts(
            HistogramOpts::new(
                "taskroute_selection_score",
                "Total score of the selected primary model",
            )
            .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]),
        )?;

        let fallbacks_total = IntCounter::with_opts(Opts::new(
            "taskroute_fallbacks_total",
            "Times the configured default model stood in for a routing decision",
        ))?;

        let overrides_total = IntCounter::with_opts(Opts::new(
            "taskroute_overrides_total",
            "Manual model overrides",
        ))?;

        let errors_total = IntCounter::with_opts(Opts::new(
            "taskroute_routing_errors_total",
            "Routing pipeline faults converted to a no-decision result",
        ))?;

        let routing_duration = Histogram::with_opts(
            HistogramOpts::new(
                "taskroute_routing_duration_ms",
                "Routing decision latency in milliseconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0]),
        )?;

        registry.register(Box::new(decisions_total.clone()))?;
        registry.register(Box::new(task_types_total.clone()))?;
        registry.register(Box::new(selections_total.clone()))?;
        registry.register(Box::new(selection_score.clone()))?;
        registry.register(Box::new(fallbacks_total.clone()))?;
        registry.register(Box::new(overrides_total.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(routing_duration.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            decisions_total,
            task_types_total,
            selections_total,
            selection_score,
            fallbacks_total,
            overrides_total,
            errors_total,
            routing_duration,
        })
    }

    /// Install this sink as the observer of `metrics`
    pub fn attach(&self, metrics: &RoutingMetrics) {
        let sink = self.clone();
        metrics.set_observer(Arc::new(move |name: &str, value: f64| {
            sink.observe(name, value)
        }));
    }

    /// Mirror one observer event
    pub fn observe(&self, name: &str, value: f64) {
        if let Some(task_type) = name.strip_prefix(events::TASK_TYPE_PREFIX) {
            self.inc_labeled(&self.task_types_total, task_type);
            return;
        }
        if let Some(provider) = name.strip_prefix(events::PROVIDER_PREFIX) {
            self.inc_labeled(&self.selections_total, provider);
            return;
        }

        match name {
            events::DECISION => self.decisions_total.inc(),
            events::SELECTION_SCORE if value.is_finite() => self.selection_score.observe(value),
            events::FALLBACK => self.fallbacks_total.inc(),
            events::OVERRIDE => self.overrides_total.inc(),
            events::ERROR => self.errors_total.inc(),
            _ => tracing::debug!(event = %name, value, "Ignoring unmapped metric event"),
        }
    }

    fn inc_labeled(&self, counter: &IntCounterVec, label: &str) {
        match counter.get_metric_with_label_values(&[label]) {
            Ok(metric) => metric.inc(),
            Err(e) => tracing::warn!(label = %label, error = %e, "Failed to record labeled metric"),
        }
    }

    /// Record routing decision duration
    ///
    /// # Errors
    ///
    /// Returns an error if `duration_ms` is NaN, infinite, or negative.
    pub fn record_routing_duration(&self, duration_ms: f64) -> Result<(), ::prometheus::Error> {
        if !duration_ms.is_finite() {
            return Err(::prometheus::Error::Msg(format!(
                "Histogram value must be finite (not NaN or Infinity), got: {}",
                duration_ms
            )));
        }
        if duration_ms < 0.0 {
            return Err(::prometheus::Error::Msg(format!(
                "Histogram value must be non-negative (duration cannot be negative), got: {}",
                duration_ms
            )));
        }

        self.routing_duration.observe(duration_ms);
        Ok(())
    }

    /// Encode all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, ::prometheus::Error> {
        let metric_families = self.registry.gather();
        let metric_count = metric_families.len();

        tracing::debug!(
            metric_family_count = metric_count,
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();

        encoder.encode(&metric_families, &mut buffer).map_err(|e| {
            tracing::error!(
                error = %e,
                metric_family_count = metric_count,
                "Prometheus text encoder failed"
            );
            ::prometheus::Error::Msg(format!(
                "Failed to encode {} metric families: {}",
                metric_count, e
            ))
        })?;

        String::from_utf8(buffer).map_err(|e| {
            ::prometheus::Error::Msg(format!("Prometheus output is not valid UTF-8: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::TaskType;
    use crate::metrics::MetricsRecorder;

    #[test]
    fn test_sink_registers_metrics() {
        let sink = PrometheusSink::new().expect("Failed to create sink");
        sink.observe(events::DECISION, 1.0);
        sink.observe("routing.task_type.coding", 1.0);
        sink.observe("routing.provider.ollama", 1.0);
        sink.observe(events::SELECTION_SCORE, 0.8);

        let names: Vec<String> = sink
            .registry
            .gather()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert!(names.contains(&"taskroute_decisions_total".to_string()));
        assert!(names.contains(&"taskroute_task_types_total".to_string()));
        assert!(names.contains(&"taskroute_selections_total".to_string()));
        assert!(names.contains(&"taskroute_selection_score".to_string()));
    }

    #[test]
    fn test_attached_sink_mirrors_routing_metrics() {
        let metrics = RoutingMetrics::new();
        let sink = PrometheusSink::new().expect("Failed to create sink");
        sink.attach(&metrics);

        metrics.record_task_type(TaskType::Reasoning);
        metrics.record_model_selection("anthropic", "claude-opus-4", 0.9);
        metrics.record_override("openai", "gpt-4o");
        metrics.record_error("boom");

        let output = sink.gather().expect("Failed to gather metrics");
        assert!(output.contains("task_type=\"reasoning\""));
        assert!(output.contains("provider=\"anthropic\""));
        assert!(output.contains("taskroute_overrides_total 1"));
        assert!(output.contains("taskroute_routing_errors_total 1"));
    }

    #[test]
    fn test_gather_produces_prometheus_text_format() {
        let sink = PrometheusSink::new().expect("Failed to create sink");
        sink.observe(events::FALLBACK, 1.0);

        let output = sink.gather().expect("Failed to gather metrics");
        assert!(output.contains("# HELP taskroute_fallbacks_total"));
        assert!(output.contains("# TYPE taskroute_fallbacks_total counter"));
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        let sink = PrometheusSink::new().expect("Failed to create sink");
        sink.observe("routing.something_new", 3.0);
        assert!(sink.gather().is_ok());
    }

    #[test]
    fn test_routing_duration_rejects_invalid_values() {
        let sink = PrometheusSink::new().expect("Failed to create sink");
        assert!(sink.record_routing_duration(f64::NAN).is_err());
        assert!(sink.record_routing_duration(f64::INFINITY).is_err());
        assert!(sink.record_routing_duration(-1.0).is_err());
        assert!(sink.record_routing_duration(0.0).is_ok());
        assert!(sink.record_routing_duration(2.5).is_ok());

        let output = sink.gather().expect("Failed to gather metrics");
        assert!(output.contains("taskroute_routing_duration_ms_count 2"));
    }
}
