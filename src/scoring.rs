//! Model scoring and ranking
//!
//! Scores one backend against one task classification on four independent
//! dimensions (capability, cost, performance, availability), each in [0, 1],
//! and combines them with normalized weights. Pure and synchronous.

use crate::catalog::{
    AvailabilitySignals, CapabilityProfile, CatalogEntry, CostTier, ModelKey, ModelRef,
};
use crate::classifier::{Complexity, TaskClassification};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Totals closer than this are ties
pub const SCORE_EPSILON: f64 = 0.001;

/// Relative weight of each scoring dimension
///
/// Fields missing from a configured table keep their default weight.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub capability: f64,
    pub cost: f64,
    pub performance: f64,
    pub availability: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            capability: 0.4,
            cost: 0.3,
            performance: 0.2,
            availability: 0.1,
        }
    }
}

impl ScoringWeights {
    pub fn new(capability: f64, cost: f64, performance: f64, availability: f64) -> Self {
        Self {
            capability,
            cost,
            performance,
            availability,
        }
    }

    /// Rescale so the weights sum to 1.0
    ///
    /// Negative and non-finite weights count as zero. A zero sum falls back to
    /// the default weights. Never fails.
    pub fn normalized(&self) -> Self {
        let sanitize = |weight: f64| {
            if weight.is_finite() && weight > 0.0 {
                weight
            } else {
                0.0
            }
        };
        let cleaned = Self::new(
            sanitize(self.capability),
            sanitize(self.cost),
            sanitize(self.performance),
            sanitize(self.availability),
        );

        let sum = cleaned.sum();
        if sum <= 0.0 || !sum.is_finite() {
            return Self::default();
        }

        Self::new(
            cleaned.capability / sum,
            cleaned.cost / sum,
            cleaned.performance / sum,
            cleaned.availability / sum,
        )
    }

    pub fn sum(&self) -> f64 {
        self.capability + self.cost + self.performance + self.availability
    }
}

/// Per-dimension sub-scores, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ScoreBreakdown {
    pub capability: f64,
    pub cost: f64,
    pub performance: f64,
    pub availability: f64,
}

impl ScoreBreakdown {
    /// All dimensions at full credit
    pub fn maximal() -> Self {
        Self {
            capability: 1.0,
            cost: 1.0,
            performance: 1.0,
            availability: 1.0,
        }
    }

    fn weighted_total(&self, weights: &ScoringWeights) -> f64 {
        self.capability * weights.capability
            + self.cost * weights.cost
            + self.performance * weights.performance
            + self.availability * weights.availability
    }
}

/// Score of one backend for one task
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelScore {
    pub provider_id: String,
    pub model_id: String,
    pub breakdown: ScoreBreakdown,
    pub total_score: f64,
    pub explanation: String,
}

impl ModelScore {
    pub fn key(&self) -> ModelKey {
        ModelKey::new(&self.provider_id, &self.model_id)
    }

    pub fn model_ref(&self) -> ModelRef {
        ModelRef::new(self.provider_id.clone(), self.model_id.clone())
    }

    /// Synthetic full-credit score for a manual override
    pub fn manual_override(model: &ModelRef) -> Self {
        Self {
            provider_id: model.provider.clone(),
            model_id: model.model.clone(),
            breakdown: ScoreBreakdown::maximal(),
            total_score: 1.0,
            explanation: format!("Manual override: {}", model),
        }
    }

    /// Multiply the total by `factor`, capped at 1.0
    pub fn boost(&mut self, factor: f64) {
        self.total_score = (self.total_score * factor).min(1.0);
    }
}

/// Capability fit: task type, complexity, vision, reasoning, context
pub fn capability_score(profile: &CapabilityProfile, task: &TaskClassification) -> f64 {
    let task_type = if profile.supports_task(task.task_type) {
        0.3
    } else {
        0.0
    };

    let complexity = if profile.max_complexity >= task.complexity {
        0.25
    } else {
        0.25 * f64::from(profile.max_complexity.level()) / f64::from(task.complexity.level())
    };

    let vision = if !task.requires_vision || profile.supports_vision {
        0.2
    } else {
        0.0
    };

    let reasoning = if !task.requires_reasoning || profile.supports_reasoning {
        0.15
    } else {
        0.05
    };

    let context = match task.estimated_context_tokens {
        Some(estimate) if estimate > profile.context_window => {
            0.1 * profile.context_window as f64 / estimate as f64
        }
        _ => 0.1,
    };

    (task_type + complexity + vision + reasoning + context).clamp(0.0, 1.0)
}

/// Cheaper tiers score higher
pub fn cost_score(tier: CostTier) -> f64 {
    match tier {
        CostTier::Free => 1.0,
        CostTier::Low => 0.7,
        CostTier::Medium => 0.4,
        CostTier::High => 0.2,
    }
}

/// Context-window band plus a reasoning bonus, capped at 1.0
pub fn performance_score(profile: &CapabilityProfile, task: &TaskClassification) -> f64 {
    let window = profile.context_window;
    let band: f64 = if window >= 200_000 {
        0.6
    } else if window >= 128_000 {
        0.5
    } else if window >= 32_000 {
        0.4
    } else if window >= 8_000 {
        0.2
    } else {
        0.1
    };

    let demanding = task.requires_reasoning || task.complexity == Complexity::Complex;
    let bonus = match (demanding, profile.supports_reasoning) {
        (true, true) => 0.4,
        (true, false) => 0.1,
        (false, _) => 0.3,
    };

    (band + bonus).min(1.0)
}

/// External health signal clamped to [0, 1]; 1.0 when absent
pub fn availability_score(signal: Option<f64>) -> f64 {
    match signal {
        Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
        Some(_) => 0.0,
        None => 1.0,
    }
}

/// Score one backend
///
/// `weights` need not be normalized.
pub fn score(
    entry: &CatalogEntry,
    task: &TaskClassification,
    weights: &ScoringWeights,
    availability: Option<f64>,
    default_tier: CostTier,
) -> ModelScore {
    let profile = entry.profile(default_tier);
    let weights = weights.normalized();

    let breakdown = ScoreBreakdown {
        capability: capability_score(&profile, task),
        cost: cost_score(profile.cost_tier),
        performance: performance_score(&profile, task),
        availability: availability_score(availability),
    };
    let total_score = breakdown.weighted_total(&weights).clamp(0.0, 1.0);

    ModelScore {
        provider_id: entry.provider_id.clone(),
        model_id: entry.id.clone(),
        explanation: explain(&entry.provider_id, &entry.id, task, &breakdown, total_score),
        breakdown,
        total_score,
    }
}

fn percent(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

fn explain(
    provider: &str,
    model: &str,
    task: &TaskClassification,
    breakdown: &ScoreBreakdown,
    total: f64,
) -> String {
    format!(
        "{}/{} for {} task: capability {}%, cost {}%, performance {}%, availability {}% (total {}%)",
        provider,
        model,
        task.task_type,
        percent(breakdown.capability),
        percent(breakdown.cost),
        percent(breakdown.performance),
        percent(breakdown.availability),
        percent(total),
    )
}

/// Best-first ordering
///
/// Totals within [`SCORE_EPSILON`] tie and fall through to the higher cost
/// sub-score (cheaper), then the higher performance sub-score.
pub fn compare_scores(a: &ModelScore, b: &ModelScore) -> Ordering {
    if (a.total_score - b.total_score).abs() > SCORE_EPSILON {
        return b
            .total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(Ordering::Equal);
    }

    b.breakdown
        .cost
        .partial_cmp(&a.breakdown.cost)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.breakdown
                .performance
                .partial_cmp(&a.breakdown.performance)
                .unwrap_or(Ordering::Equal)
        })
}

/// Stable insertion sort with [`compare_scores`]
///
/// The epsilon tie is not transitive (0.5000 ~ 0.5008 ~ 0.5016), so the std
/// sorts, which require a total order, are not usable here. Guarantees every
/// adjacent pair is in order.
pub fn sort_scores(scores: &mut [ModelScore]) {
    for i in 1..scores.len() {
        let mut j = i;
        while j > 0 && compare_scores(&scores[j - 1], &scores[j]) == Ordering::Greater {
            scores.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Score and rank a set of backends, best first
pub fn rank(
    entries: &[CatalogEntry],
    task: &TaskClassification,
    weights: &ScoringWeights,
    availability: &AvailabilitySignals,
    default_tier: CostTier,
) -> Vec<ModelScore> {
    let mut scores: Vec<ModelScore> = entries
        .iter()
        .map(|entry| score(entry, task, weights, availability.get(&entry.key()), default_tier))
        .collect();
    sort_scores(&mut scores);
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CostFigures;
    use crate::classifier::{Complexity, TaskClassifier, TaskType};
    use std::collections::BTreeSet;

    fn free_local_coder() -> CatalogEntry {
        let mut entry = CatalogEntry::new("ollama", "qwen2.5-coder", "Qwen 2.5 Coder");
        entry.context_window = Some(32_768);
        entry.cost = Some(CostFigures::default());
        entry
    }

    fn expensive_cloud_reasoner() -> CatalogEntry {
        let mut entry = CatalogEntry::new("anthropic", "claude-opus-4", "Claude Opus 4");
        entry.context_window = Some(200_000);
        entry.reasoning = Some(true);
        entry.cost = Some(CostFigures {
            input: 15.0,
            output: 75.0,
            cache_read: 1.5,
            cache_write: 18.75,
        });
        entry
    }

    fn task(task_type: TaskType, complexity: Complexity, reasoning: bool) -> TaskClassification {
        TaskClassification {
            task_type,
            complexity,
            requires_vision: false,
            requires_reasoning: reasoning,
            estimated_context_tokens: None,
            confidence: 1.0,
        }
    }

    fn score_with_totals(total: f64, cost: f64, performance: f64) -> ModelScore {
        ModelScore {
            provider_id: "p".to_string(),
            model_id: format!("{total}-{cost}-{performance}"),
            breakdown: ScoreBreakdown {
                capability: 0.5,
                cost,
                performance,
                availability: 1.0,
            },
            total_score: total,
            explanation: String::new(),
        }
    }

    #[test]
    fn test_weights_normalize_to_one() {
        let weights = ScoringWeights::new(2.0, 1.0, 1.0, 0.0).normalized();
        assert!((weights.sum() - 1.0).abs() < 1e-9);
        assert!((weights.capability - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_weights_fall_back_to_defaults() {
        let weights = ScoringWeights::new(0.0, 0.0, 0.0, 0.0).normalized();
        assert_eq!(weights, ScoringWeights::default());

        let negative = ScoringWeights::new(-1.0, -2.0, f64::NAN, 0.0).normalized();
        assert_eq!(negative, ScoringWeights::default());
    }

    #[test]
    fn test_cost_score_lookup() {
        assert_eq!(cost_score(CostTier::Free), 1.0);
        assert_eq!(cost_score(CostTier::Low), 0.7);
        assert_eq!(cost_score(CostTier::Medium), 0.4);
        assert_eq!(cost_score(CostTier::High), 0.2);
    }

    #[test]
    fn test_capability_full_credit() {
        let profile = CapabilityProfile {
            task_types: BTreeSet::from([TaskType::Coding, TaskType::General]),
            max_complexity: Complexity::Complex,
            supports_vision: true,
            supports_reasoning: true,
            context_window: 128_000,
            cost_tier: CostTier::Low,
        };
        let score = capability_score(&profile, &task(TaskType::Coding, Complexity::Complex, true));
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_capability_partial_credit() {
        let profile = CapabilityProfile {
            task_types: BTreeSet::from([TaskType::Chat, TaskType::General]),
            max_complexity: Complexity::Simple,
            supports_vision: false,
            supports_reasoning: false,
            context_window: 1_000,
            cost_tier: CostTier::Free,
        };
        let mut classification = task(TaskType::Vision, Complexity::Complex, true);
        classification.requires_vision = true;
        classification.estimated_context_tokens = Some(4_000);

        // type 0 + complexity 0.25/3 + vision 0 + reasoning 0.05 + context 0.1/4
        let expected = 0.25 / 3.0 + 0.05 + 0.025;
        let score = capability_score(&profile, &classification);
        assert!((score - expected).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_performance_bands_and_bonus() {
        let mut profile = CapabilityProfile {
            task_types: BTreeSet::new(),
            max_complexity: Complexity::Complex,
            supports_vision: false,
            supports_reasoning: true,
            context_window: 200_000,
            cost_tier: CostTier::High,
        };
        let hard = task(TaskType::Reasoning, Complexity::Complex, true);
        let easy = task(TaskType::Chat, Complexity::Simple, false);

        assert!((performance_score(&profile, &hard) - 1.0).abs() < 1e-9);
        assert!((performance_score(&profile, &easy) - 0.9).abs() < 1e-9);

        profile.supports_reasoning = false;
        profile.context_window = 4_000;
        assert!((performance_score(&profile, &hard) - 0.2).abs() < 1e-9);
        assert!((performance_score(&profile, &easy) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_availability_defaults_and_clamps() {
        assert_eq!(availability_score(None), 1.0);
        assert_eq!(availability_score(Some(1.7)), 1.0);
        assert_eq!(availability_score(Some(-0.2)), 0.0);
        assert_eq!(availability_score(Some(f64::NAN)), 0.0);
    }

    #[test]
    fn test_explanation_lists_all_dimensions() {
        let score = score(
            &free_local_coder(),
            &task(TaskType::Coding, Complexity::Simple, false),
            &ScoringWeights::default(),
            None,
            CostTier::Medium,
        );
        assert!(score.explanation.starts_with("ollama/qwen2.5-coder for coding task"));
        assert!(score.explanation.contains("cost 100%"));
        assert!(score.explanation.contains("availability 100%"));
        assert!(score.explanation.contains("capability"));
        assert!(score.explanation.contains("performance"));
    }

    #[test]
    fn test_simple_coding_prefers_free_backend() {
        let entries = vec![expensive_cloud_reasoner(), free_local_coder()];
        let classification = TaskClassifier::new().classify("Debug this function", false, None);

        let ranked = rank(
            &entries,
            &classification,
            &ScoringWeights::default(),
            &AvailabilitySignals::new(),
            CostTier::Medium,
        );
        assert_eq!(ranked[0].model_id, "qwen2.5-coder");
    }

    #[test]
    fn test_complex_reasoning_prefers_reasoning_backend() {
        let entries = vec![free_local_coder(), expensive_cloud_reasoner()];
        let classification = TaskClassifier::new().classify(
            "Analyze this complex mathematical proof step by step and explain the reasoning",
            false,
            None,
        );

        let ranked = rank(
            &entries,
            &classification,
            &ScoringWeights::default(),
            &AvailabilitySignals::new(),
            CostTier::Medium,
        );
        assert_eq!(ranked[0].model_id, "claude-opus-4");
    }

    #[test]
    fn test_availability_signal_lowers_total() {
        let entry = free_local_coder();
        let classification = task(TaskType::Coding, Complexity::Simple, false);
        let healthy = score(
            &entry,
            &classification,
            &ScoringWeights::default(),
            None,
            CostTier::Medium,
        );
        let down = score(
            &entry,
            &classification,
            &ScoringWeights::default(),
            Some(0.0),
            CostTier::Medium,
        );
        assert!((healthy.total_score - down.total_score - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_ties_break_on_cost_then_performance() {
        let mut scores = vec![
            score_with_totals(0.8000, 0.4, 0.9),
            score_with_totals(0.8005, 0.4, 0.5),
            score_with_totals(0.7995, 1.0, 0.1),
        ];
        sort_scores(&mut scores);

        assert_eq!(scores[0].breakdown.cost, 1.0);
        assert_eq!(scores[1].breakdown.performance, 0.9);
        assert_eq!(scores[2].breakdown.performance, 0.5);
    }

    #[test]
    fn test_scores_outside_epsilon_sort_by_total() {
        let mut scores = vec![score_with_totals(0.5, 1.0, 1.0), score_with_totals(0.6, 0.2, 0.1)];
        sort_scores(&mut scores);
        assert_eq!(scores[0].total_score, 0.6);
    }

    #[test]
    fn test_boost_is_capped() {
        let mut score = score_with_totals(0.95, 0.2, 0.2);
        score.boost(1.1);
        assert_eq!(score.total_score, 1.0);
    }

    #[test]
    fn test_manual_override_score_is_maximal() {
        let score = ModelScore::manual_override(&ModelRef::new("openai", "gpt-4o"));
        assert_eq!(score.total_score, 1.0);
        assert_eq!(score.breakdown, ScoreBreakdown::maximal());
        assert!(score.explanation.contains("openai/gpt-4o"));
    }
}
