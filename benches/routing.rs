//! Routing performance benchmarks
//!
//! Measures the synchronous routing core: classification, ranking, the full
//! decision pipeline over a loaded catalog, and config parsing. Catalog
//! discovery and health probes are excluded.
//!
//! ## Expected Performance Characteristics
//!
//! - Classification: single-digit microseconds (a few dozen regex tests)
//! - Ranking: grows linearly with catalog size
//! - Config parsing: one-time startup cost
//!
//! **Note**: Actual measurements vary with compiler version, CPU architecture, and system load.
//!
//! Run with: `cargo bench`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::str::FromStr;
use std::sync::Arc;
use taskroute::catalog::{
    AvailabilitySignals, BackendCatalog, CatalogEntry, CostFigures, CostTier, StaticSource,
};
use taskroute::classifier::TaskClassifier;
use taskroute::config::{Config, RoutingConfig};
use taskroute::metrics::NoopMetrics;
use taskroute::router::{RouteRequest, TaskBasedRouter};
use taskroute::scoring::{ScoringWeights, rank};

const PROMPTS: [(&str, &str); 4] = [
    ("coding", "Debug this function"),
    (
        "reasoning",
        "Analyze this complex mathematical proof step by step and explain the reasoning",
    ),
    ("chat", "Hey, how was your weekend?"),
    (
        "analysis",
        "Compare the quarterly revenue trends across regions and summarize the key differences",
    ),
];

fn catalog(size: usize) -> Vec<CatalogEntry> {
    let providers = ["ollama", "openai", "anthropic", "google"];
    (0..size)
        .map(|i| {
            let provider = providers[i % providers.len()];
            let model = format!("model-{}-{}k", i, 8 << (i % 6));
            let mut entry = CatalogEntry::new(provider, model, "");
            entry.reasoning = Some(i % 3 == 0);
            entry.cost = Some(CostFigures {
                input: (i % 5) as f64,
                output: (i % 7) as f64 * 2.0,
                ..CostFigures::default()
            });
            entry
        })
        .collect()
}

/// Benchmark prompt classification
fn bench_classification(c: &mut Criterion) {
    let classifier = TaskClassifier::new();
    let mut group = c.benchmark_group("classification");

    for (name, prompt) in PROMPTS {
        group.bench_with_input(BenchmarkId::from_parameter(name), &prompt, |b, prompt| {
            b.iter(|| classifier.classify(black_box(prompt), false, None));
        });
    }

    group.finish();
}

/// Benchmark scoring and ranking across catalog sizes
fn bench_ranking(c: &mut Criterion) {
    let task = TaskClassifier::new().classify(PROMPTS[0].1, false, None);
    let weights = ScoringWeights::default();
    let signals = AvailabilitySignals::new();
    let mut group = c.benchmark_group("ranking");

    for size in [4, 32, 128] {
        let entries = catalog(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, entries| {
            b.iter(|| rank(black_box(entries), &task, &weights, &signals, CostTier::Medium));
        });
    }

    group.finish();
}

/// Benchmark the full decision pipeline over an already-loaded catalog
fn bench_route_with_catalog(c: &mut Criterion) {
    let config = RoutingConfig {
        enabled: true,
        ..RoutingConfig::default()
    };
    let router = TaskBasedRouter::new(
        config,
        Arc::new(BackendCatalog::new(Arc::new(StaticSource::default()))),
        Arc::new(NoopMetrics),
    );
    let entries = catalog(32);
    let signals = AvailabilitySignals::new();
    let mut group = c.benchmark_group("route_with_catalog");

    for (name, prompt) in PROMPTS {
        let request = RouteRequest::new(prompt);
        group.bench_with_input(BenchmarkId::from_parameter(name), &request, |b, request| {
            b.iter(|| router.route_with_catalog(black_box(request), &entries, &signals));
        });
    }

    group.finish();
}

/// Benchmark configuration parsing and validation
///
/// Called once during startup.
fn bench_config_parsing(c: &mut Criterion) {
    let toml_str = r#"
[server]
host = "127.0.0.1"
port = 3000

[routing]
enabled = true
strategy = "cost-optimized"
default_model = "anthropic/claude-sonnet-4"

[[routing.task_rules]]
task_type = "coding"
preferred_providers = ["anthropic"]

[catalog]
default_cost_tier = "low"
"#;

    c.bench_function("config_parsing", |b| {
        b.iter(|| Config::from_str(black_box(toml_str)));
    });
}

criterion_group!(
    benches,
    bench_classification,
    bench_ranking,
    bench_route_with_catalog,
    bench_config_parsing
);
criterion_main!(benches);
