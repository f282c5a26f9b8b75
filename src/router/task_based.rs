//! Task-based router
//!
//! Runs the decision pipeline, strictly in this order:
//!
//! 1. manual override (terminal, ignores `enabled`)
//! 2. enabled check (terminal when disabled)
//! 3. classification
//! 4. caller allow-list
//! 5. task rules
//! 6. strategy weight adjustment
//! 7. ranking
//! 8. provider-preference boost
//! 9. primary selection
//! 10. fallback list (cooldown-filtered, truncated)
//! 11. decision record
//!
//! Steps 3-10 never surface an error: faults become `None` and are recorded
//! through the metrics recorder.

use super::filters::{apply_task_rules, filter_allowed_providers};
use super::{DecisionKind, PreferenceBoost, RouteRequest, RoutingDecision, RoutingResult};
use crate::catalog::{
    AvailabilitySignals, AvailabilityTracker, BackendCatalog, CatalogEntry, ExclusionSet,
    LoadOptions, ModelRef,
};
use crate::classifier::{Complexity, TaskClassification, TaskClassifier};
use crate::config::{RoutingConfig, contains_provider};
use crate::error::{CooldownError, RoutingError};
use crate::metrics::MetricsRecorder;
use crate::scoring::{ModelScore, rank, sort_scores};
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use uuid::Uuid;

/// Multiplier applied to preferred providers' totals (capped at 1.0)
pub const PREFERENCE_BOOST: f64 = 1.1;

/// Credential-cooldown collaborator
///
/// Given one provider and its fallback candidates, returns the candidates
/// whose credentials are usable right now.
pub trait CooldownFilter: Send + Sync {
    fn filter(
        &self,
        provider: &str,
        candidates: Vec<ModelRef>,
    ) -> Result<Vec<ModelRef>, CooldownError>;
}

/// Routes tasks to backends using classification, scoring and policy
pub struct TaskBasedRouter {
    config: Arc<RoutingConfig>,
    catalog: Arc<BackendCatalog>,
    classifier: TaskClassifier,
    metrics: Arc<dyn MetricsRecorder>,
    availability: Option<Arc<AvailabilityTracker>>,
    cooldown: Option<Arc<dyn CooldownFilter>>,
}

impl TaskBasedRouter {
    pub fn new(
        config: RoutingConfig,
        catalog: Arc<BackendCatalog>,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            classifier: TaskClassifier::new(),
            metrics,
            availability: None,
            cooldown: None,
        }
    }

    /// Read live availability signals from `tracker` on every decision
    pub fn with_availability(mut self, tracker: Arc<AvailabilityTracker>) -> Self {
        self.availability = Some(tracker);
        self
    }

    pub fn with_cooldown_filter(mut self, cooldown: Arc<dyn CooldownFilter>) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<BackendCatalog> {
        &self.catalog
    }

    pub fn metrics(&self) -> &Arc<dyn MetricsRecorder> {
        &self.metrics
    }

    /// Choose a primary backend and ordered fallbacks for one task
    ///
    /// Returns `None` when routing is disabled, when no backend is available,
    /// or when the pipeline faults. Callers resolve `None` through their
    /// fallback behavior (see [`resolve_model`](super::resolve_model)).
    pub async fn select_for_task(&self, request: &RouteRequest) -> Option<RoutingResult> {
        if let Some(result) = self.try_override(request) {
            return Some(result);
        }

        if !self.config.enabled {
            tracing::debug!("Task-based routing disabled, leaving model choice to caller");
            return None;
        }

        let entries = self.catalog.load(LoadOptions::default()).await;
        let availability = match &self.availability {
            Some(tracker) => {
                tracker.register(&entries).await;
                tracker.snapshot().await
            }
            None => AvailabilitySignals::new(),
        };

        self.route_with_catalog(request, &entries, &availability)
    }

    /// Steps 3-11 against an already-loaded catalog
    ///
    /// Override and enabled checks are the caller's job; see
    /// [`select_for_task`](Self::select_for_task).
    pub fn route_with_catalog(
        &self,
        request: &RouteRequest,
        entries: &[CatalogEntry],
        availability: &AvailabilitySignals,
    ) -> Option<RoutingResult> {
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_pipeline(request, entries, availability)
        }));

        match outcome {
            Ok(Ok(Some(result))) => {
                self.record_routed(&result);
                Some(result)
            }
            Ok(Ok(None)) => None,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Routing pipeline failed, no decision produced");
                self.metrics.record_error(&e.to_string());
                None
            }
            Err(_) => {
                tracing::error!("Routing pipeline panicked, no decision produced");
                self.metrics.record_error("routing pipeline panicked");
                None
            }
        }
    }

    fn try_override(&self, request: &RouteRequest) -> Option<RoutingResult> {
        let raw = request
            .override_model
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())?;

        let Some(model) = ModelRef::parse(raw, &self.config.default_provider) else {
            tracing::warn!(
                override_model = %raw,
                "Ignoring malformed model override"
            );
            return None;
        };

        let selected = ModelScore::manual_override(&model);
        let decision = RoutingDecision {
            id: Uuid::new_v4(),
            kind: DecisionKind::Override,
            reasoning: format!("Manual override: {} selected by caller", model),
            ranked: vec![selected.clone()],
            selected,
            task: TaskClassification::unclassified(),
            rules_applied: Vec::new(),
            boost: None,
        };

        tracing::info!(
            decision_id = %decision.id,
            provider = %model.provider,
            model = %model.model,
            "Route decision made via manual override"
        );

        self.metrics.record_override(&model.provider, &model.model);
        self.metrics.record_decision(&decision);

        Some(RoutingResult {
            primary: model,
            fallbacks: Vec::new(),
            decision,
        })
    }

    fn run_pipeline(
        &self,
        request: &RouteRequest,
        entries: &[CatalogEntry],
        availability: &AvailabilitySignals,
    ) -> Result<Option<RoutingResult>, RoutingError> {
        let default_tier = self.catalog.default_tier();
        let task = self
            .classifier
            .classify(&request.prompt, request.has_images, request.hints.as_ref());

        let allowed = filter_allowed_providers(entries, &request.allowed_providers);
        let rules = apply_task_rules(
            &allowed,
            &self.config.task_rules,
            &task,
            &self.config.default_provider,
            default_tier,
        );

        let weights = self.config.strategy.adjust_weights(&self.config.weights);
        let mut ranked = rank(&rules.entries, &task, &weights, availability, default_tier);

        if ranked.is_empty() {
            tracing::warn!(
                task_type = %task.task_type,
                catalog_size = entries.len(),
                "No candidate backends to rank, routing produced no decision"
            );
            return Ok(None);
        }

        if let Some(bad) = ranked.iter().find(|score| !score.total_score.is_finite()) {
            return Err(RoutingError::NonFiniteScore {
                provider: bad.provider_id.clone(),
                model: bad.model_id.clone(),
            });
        }

        let boost = self.preference_boost(&task);
        if let Some(preference) = boost {
            let preferred = match preference {
                PreferenceBoost::Cloud => &self.config.cloud_providers,
                PreferenceBoost::Local => &self.config.local_providers,
            };
            for score in ranked.iter_mut() {
                if contains_provider(preferred, &score.provider_id) {
                    score.boost(PREFERENCE_BOOST);
                }
            }
            sort_scores(&mut ranked);
        }

        let selected = ranked.first().cloned().ok_or(RoutingError::MissingPrimary)?;
        let primary = selected.model_ref();
        let fallbacks = self.build_fallbacks(&ranked, &primary);

        let reasoning = self.explain(&selected, &task, boost, &rules.applied);
        let decision = RoutingDecision {
            id: Uuid::new_v4(),
            kind: DecisionKind::Routed(self.config.strategy),
            selected,
            task,
            ranked,
            reasoning,
            rules_applied: rules.applied,
            boost,
        };

        Ok(Some(RoutingResult {
            primary,
            fallbacks,
            decision,
        }))
    }

    /// At most one provider preference applies per decision
    fn preference_boost(&self, task: &TaskClassification) -> Option<PreferenceBoost> {
        let cloud_driven = task.complexity == Complexity::Complex || task.requires_reasoning;

        if cloud_driven && !self.config.cloud_providers.is_empty() {
            Some(PreferenceBoost::Cloud)
        } else if self.config.prefer_local
            && !cloud_driven
            && task.complexity == Complexity::Simple
            && !self.config.local_providers.is_empty()
        {
            Some(PreferenceBoost::Local)
        } else {
            None
        }
    }

    /// Ranked candidates after the primary, cooldown-filtered, truncated
    fn build_fallbacks(&self, ranked: &[ModelScore], primary: &ModelRef) -> Vec<ModelRef> {
        let mut seen: ExclusionSet = HashSet::from([primary.key()]);
        let candidates: Vec<ModelRef> = ranked
            .iter()
            .map(ModelScore::model_ref)
            .filter(|model| seen.insert(model.key()))
            .collect();

        let usable = match &self.cooldown {
            Some(cooldown) => self.apply_cooldown(cooldown.as_ref(), candidates),
            None => candidates,
        };

        usable.into_iter().take(self.config.max_fallbacks).collect()
    }

    /// Filter candidates provider by provider, keeping rank order
    ///
    /// The collaborator can only remove candidates; anything it returns that
    /// was not offered is ignored.
    fn apply_cooldown(
        &self,
        cooldown: &dyn CooldownFilter,
        candidates: Vec<ModelRef>,
    ) -> Vec<ModelRef> {
        let mut providers: Vec<&str> = Vec::new();
        for candidate in &candidates {
            if !providers
                .iter()
                .any(|seen| seen.eq_ignore_ascii_case(&candidate.provider))
            {
                providers.push(&candidate.provider);
            }
        }

        let mut keep: ExclusionSet = HashSet::new();
        for provider in providers {
            let group: Vec<ModelRef> = candidates
                .iter()
                .filter(|candidate| candidate.provider.eq_ignore_ascii_case(provider))
                .cloned()
                .collect();

            match cooldown.filter(provider, group.clone()) {
                Ok(kept) => {
                    if kept.len() < group.len() {
                        tracing::debug!(
                            provider = %provider,
                            offered = group.len(),
                            kept = kept.len(),
                            "Cooldown filter removed fallback candidates"
                        );
                    }
                    keep.extend(kept.iter().map(ModelRef::key));
                }
                Err(e) => {
                    tracing::warn!(
                        provider = %provider,
                        error = %e,
                        "Cooldown lookup unavailable, keeping fallbacks unfiltered"
                    );
                    keep.extend(group.iter().map(ModelRef::key));
                }
            }
        }

        candidates
            .into_iter()
            .filter(|candidate| keep.contains(&candidate.key()))
            .collect()
    }

    fn explain(
        &self,
        selected: &ModelScore,
        task: &TaskClassification,
        boost: Option<PreferenceBoost>,
        rules_applied: &[usize],
    ) -> String {
        let mut reasoning = format!(
            "Selected {}/{} for {} {} task (confidence {}%) using {} strategy",
            selected.provider_id,
            selected.model_id,
            task.complexity,
            task.task_type,
            (task.confidence * 100.0).round() as i64,
            self.config.strategy,
        );
        if let Some(boost) = boost {
            let label = match boost {
                PreferenceBoost::Cloud => "cloud",
                PreferenceBoost::Local => "local",
            };
            reasoning.push_str(&format!("; {} providers preferred", label));
        }
        if !rules_applied.is_empty() {
            reasoning.push_str(&format!("; task rules applied: {:?}", rules_applied));
        }
        reasoning.push_str(". ");
        reasoning.push_str(&selected.explanation);
        reasoning
    }

    fn record_routed(&self, result: &RoutingResult) {
        let decision = &result.decision;
        tracing::info!(
            decision_id = %decision.id,
            provider = %result.primary.provider,
            model = %result.primary.model,
            task_type = %decision.task.task_type,
            complexity = %decision.task.complexity,
            score = decision.selected.total_score,
            fallbacks = result.fallbacks.len(),
            strategy = %decision.kind.as_str(),
            "Route decision made via task-based routing"
        );

        self.metrics.record_decision(decision);
        self.metrics.record_task_type(decision.task.task_type);
        self.metrics.record_model_selection(
            &result.primary.provider,
            &result.primary.model,
            decision.selected.total_score,
        );
    }
}
