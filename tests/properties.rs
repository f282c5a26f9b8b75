//! Property-based tests for scoring, ranking and fallback invariants

use proptest::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;
use taskroute::catalog::{
    AvailabilitySignals, BackendCatalog, CatalogEntry, CostFigures, CostTier, StaticSource,
};
use taskroute::classifier::{Complexity, TaskClassification, TaskType};
use taskroute::config::RoutingConfig;
use taskroute::metrics::NoopMetrics;
use taskroute::router::{RouteRequest, RoutingStrategy, TaskBasedRouter};
use taskroute::scoring::{
    ModelScore, SCORE_EPSILON, ScoreBreakdown, ScoringWeights, compare_scores, rank, score,
    sort_scores,
};

fn task_type() -> impl Strategy<Value = TaskType> {
    prop_oneof![
        Just(TaskType::Coding),
        Just(TaskType::Reasoning),
        Just(TaskType::Chat),
        Just(TaskType::Vision),
        Just(TaskType::Analysis),
        Just(TaskType::General),
    ]
}

fn complexity() -> impl Strategy<Value = Complexity> {
    prop_oneof![
        Just(Complexity::Simple),
        Just(Complexity::Moderate),
        Just(Complexity::Complex),
    ]
}

fn task() -> impl Strategy<Value = TaskClassification> {
    (
        task_type(),
        complexity(),
        any::<bool>(),
        any::<bool>(),
        proptest::option::of(0u64..2_000_000),
    )
        .prop_map(
            |(task_type, complexity, requires_vision, requires_reasoning, tokens)| {
                TaskClassification {
                    task_type,
                    complexity,
                    requires_vision,
                    requires_reasoning,
                    estimated_context_tokens: tokens,
                    confidence: 1.0,
                }
            },
        )
}

fn entry() -> impl Strategy<Value = CatalogEntry> {
    (
        prop::sample::select(vec!["ollama", "openai", "anthropic", "google", "mistral"]),
        prop::sample::select(vec![
            "llama3",
            "qwen2.5-coder:32k",
            "gpt-4o",
            "claude-opus-4",
            "gemini-2.5-pro",
            "tiny",
        ]),
        proptest::option::of(0u64..2_000_000),
        proptest::option::of(any::<bool>()),
        proptest::option::of((0.0f64..50.0, 0.0f64..100.0)),
    )
        .prop_map(|(provider, model, context_window, reasoning, cost)| {
            let mut entry = CatalogEntry::new(provider, model, model);
            entry.context_window = context_window;
            entry.reasoning = reasoning;
            entry.cost = cost.map(|(input, output)| CostFigures {
                input,
                output,
                ..CostFigures::default()
            });
            entry
        })
}

fn weights() -> impl Strategy<Value = ScoringWeights> {
    (-1.0f64..10.0, -1.0f64..10.0, -1.0f64..10.0, -1.0f64..10.0)
        .prop_map(|(a, b, c, d)| ScoringWeights::new(a, b, c, d))
}

fn model_score() -> impl Strategy<Value = ModelScore> {
    (0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0, 0u32..1000).prop_map(
        |(total, cost, performance, id)| ModelScore {
            provider_id: "p".to_string(),
            model_id: format!("m{}", id),
            breakdown: ScoreBreakdown {
                capability: 0.5,
                cost,
                performance,
                availability: 1.0,
            },
            total_score: total,
            explanation: String::new(),
        },
    )
}

fn assert_adjacent_order(scores: &[ModelScore]) {
    for pair in scores.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if (a.total_score - b.total_score).abs() > SCORE_EPSILON {
            assert!(a.total_score >= b.total_score);
        } else {
            assert!(a.breakdown.cost >= b.breakdown.cost);
            if a.breakdown.cost == b.breakdown.cost {
                assert!(a.breakdown.performance >= b.breakdown.performance);
            }
        }
        assert_ne!(compare_scores(a, b), Ordering::Greater);
    }
}

proptest! {
    #[test]
    fn prop_positive_weights_normalize_to_one(
        a in 0.0f64..100.0,
        b in 0.0f64..100.0,
        c in 0.0f64..100.0,
        d in 0.001f64..100.0,
    ) {
        let normalized = ScoringWeights::new(a, b, c, d).normalized();
        prop_assert!((normalized.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn prop_any_weights_normalize_to_one(w in weights()) {
        let normalized = w.normalized();
        prop_assert!((normalized.sum() - 1.0).abs() < 1e-9);
        prop_assert!(normalized.capability >= 0.0);
        prop_assert!(normalized.cost >= 0.0);
        prop_assert!(normalized.performance >= 0.0);
        prop_assert!(normalized.availability >= 0.0);
    }

    #[test]
    fn prop_strategy_weights_normalize_to_one(w in weights()) {
        for strategy in [
            RoutingStrategy::CostOptimized,
            RoutingStrategy::PerformanceOptimized,
            RoutingStrategy::Balanced,
        ] {
            prop_assert!((strategy.adjust_weights(&w).sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_scores_are_bounded(
        entry in entry(),
        task in task(),
        w in weights(),
        availability in proptest::option::of(-2.0f64..3.0),
    ) {
        let s = score(&entry, &task, &w, availability, CostTier::Medium);
        for sub in [
            s.breakdown.capability,
            s.breakdown.cost,
            s.breakdown.performance,
            s.breakdown.availability,
        ] {
            prop_assert!((0.0..=1.0).contains(&sub));
        }
        prop_assert!((0.0..=1.0).contains(&s.total_score));
        prop_assert!(s.explanation.contains(&entry.id));
    }

    #[test]
    fn prop_sorted_scores_respect_comparator(
        mut scores in prop::collection::vec(model_score(), 0..20),
    ) {
        let len = scores.len();
        sort_scores(&mut scores);
        prop_assert_eq!(scores.len(), len);
        assert_adjacent_order(&scores);
    }

    #[test]
    fn prop_ranking_is_ordered(
        entries in prop::collection::vec(entry(), 2..10),
        task in task(),
        w in weights(),
    ) {
        let ranked = rank(&entries, &task, &w, &AvailabilitySignals::new(), CostTier::Medium);
        prop_assert_eq!(ranked.len(), entries.len());
        assert_adjacent_order(&ranked);
    }

    #[test]
    fn prop_fallbacks_exclude_primary_and_respect_maximum(
        entries in prop::collection::vec(entry(), 1..12),
        max_fallbacks in 0usize..6,
        prompt in "[a-zA-Z ]{0,80}",
        prefer_local in any::<bool>(),
    ) {
        let config = RoutingConfig {
            enabled: true,
            max_fallbacks,
            prefer_local,
            ..RoutingConfig::default()
        };
        let catalog = Arc::new(BackendCatalog::new(Arc::new(StaticSource::default())));
        let router = TaskBasedRouter::new(config, catalog, Arc::new(NoopMetrics));

        let result = router
            .route_with_catalog(&RouteRequest::new(prompt), &entries, &AvailabilitySignals::new())
            .expect("non-empty catalog always routes");

        prop_assert!(result.fallbacks.len() <= max_fallbacks);
        let primary = result.primary.key();
        prop_assert!(result.fallbacks.iter().all(|f| f.key() != primary));

        let mut seen = std::collections::HashSet::new();
        prop_assert!(result.fallbacks.iter().all(|f| seen.insert(f.key())));
    }
}
