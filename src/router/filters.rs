//! Candidate filters applied before ranking
//!
//! No filter here ever leaves the router without candidates: a restriction
//! that would empty the set falls back to the broader set it started from.

use crate::catalog::{CatalogEntry, CostTier, ModelKey, ModelRef};
use crate::classifier::TaskClassification;
use crate::config::{TaskRule, contains_provider};
use std::collections::HashSet;

/// Hard requirements a backend must meet to stay a candidate
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CapabilityRequirements {
    pub requires_vision: bool,
    pub requires_reasoning: bool,
    pub min_context_window: Option<u64>,
}

impl CapabilityRequirements {
    /// Task requirements, with a rule's reasoning flag taking precedence
    pub fn for_rule(task: &TaskClassification, rule: &TaskRule) -> Self {
        Self {
            requires_vision: task.requires_vision,
            requires_reasoning: rule.require_reasoning.unwrap_or(task.requires_reasoning),
            min_context_window: rule.min_context_window,
        }
    }
}

/// Candidates after task rules, and which rules matched
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub entries: Vec<CatalogEntry>,
    pub applied: Vec<usize>,
    /// True when the rules emptied the set and the full set was restored
    pub reverted: bool,
}

/// Restrict to the caller's provider allow-list
///
/// An empty allow-list, or one that matches nothing, keeps every entry.
pub fn filter_allowed_providers(entries: &[CatalogEntry], allowed: &[String]) -> Vec<CatalogEntry> {
    if allowed.is_empty() {
        return entries.to_vec();
    }

    let restricted: Vec<CatalogEntry> = entries
        .iter()
        .filter(|entry| contains_provider(allowed, &entry.provider_id))
        .cloned()
        .collect();

    if restricted.is_empty() {
        tracing::debug!(
            allowed = ?allowed,
            "Allowed-provider filter matched no backend, using full catalog"
        );
        return entries.to_vec();
    }
    restricted
}

/// Drop every backend that misses a hard requirement
pub fn filter_by_capability(
    entries: Vec<CatalogEntry>,
    requirements: &CapabilityRequirements,
    default_tier: CostTier,
) -> Vec<CatalogEntry> {
    entries
        .into_iter()
        .filter(|entry| {
            let profile = entry.profile(default_tier);
            (!requirements.requires_vision || profile.supports_vision)
                && (!requirements.requires_reasoning || profile.supports_reasoning)
                && requirements
                    .min_context_window
                    .is_none_or(|min| profile.context_window >= min)
        })
        .collect()
}

/// Keep the subset matching `keep` unless that subset is empty
fn restrict_non_empty<F>(entries: Vec<CatalogEntry>, keep: F) -> Vec<CatalogEntry>
where
    F: Fn(&CatalogEntry) -> bool,
{
    if entries.iter().any(&keep) {
        entries.into_iter().filter(|entry| keep(entry)).collect()
    } else {
        entries
    }
}

fn apply_rule(
    entries: Vec<CatalogEntry>,
    rule: &TaskRule,
    task: &TaskClassification,
    default_provider: &str,
    default_tier: CostTier,
) -> Vec<CatalogEntry> {
    let mut entries = entries;

    if let Some(excluded) = &rule.exclude_providers {
        entries.retain(|entry| !contains_provider(excluded, &entry.provider_id));
    }

    if let Some(preferred) = rule.preferred_providers.as_ref().filter(|p| !p.is_empty()) {
        entries = restrict_non_empty(entries, |entry| {
            contains_provider(preferred, &entry.provider_id)
        });
    }

    if let Some(models) = rule.preferred_models.as_ref().filter(|m| !m.is_empty()) {
        let preferred: HashSet<ModelKey> = models
            .iter()
            .filter_map(|raw| ModelRef::parse(raw, default_provider))
            .map(|model| model.key())
            .collect();
        entries = restrict_non_empty(entries, |entry| preferred.contains(&entry.key()));
    }

    let requirements = CapabilityRequirements::for_rule(task, rule);
    filter_by_capability(entries, &requirements, default_tier)
}

/// Apply every matching rule in declaration order
///
/// If the rules leave nothing, the unfiltered candidates are restored.
pub fn apply_task_rules(
    entries: &[CatalogEntry],
    rules: &[TaskRule],
    task: &TaskClassification,
    default_provider: &str,
    default_tier: CostTier,
) -> RuleOutcome {
    let mut filtered = entries.to_vec();
    let mut applied = Vec::new();

    for (index, rule) in rules.iter().enumerate() {
        if !rule.matches(task) {
            continue;
        }
        applied.push(index);
        filtered = apply_rule(filtered, rule, task, default_provider, default_tier);
        tracing::debug!(
            rule = index,
            task_type = %rule.task_type,
            remaining = filtered.len(),
            "Applied task rule"
        );
    }

    if filtered.is_empty() && !applied.is_empty() {
        tracing::debug!(
            rules = ?applied,
            "Task rules left no candidates, reverting to pre-rule catalog"
        );
        return RuleOutcome {
            entries: entries.to_vec(),
            applied,
            reverted: true,
        };
    }

    RuleOutcome {
        entries: filtered,
        applied,
        reverted: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InputModality;
    use crate::classifier::{Complexity, TaskType};

    fn entry(provider: &str, id: &str) -> CatalogEntry {
        CatalogEntry::new(provider, id, id)
    }

    fn catalog() -> Vec<CatalogEntry> {
        let mut vision = entry("openai", "gpt-4o");
        vision.supported_inputs = Some(vec![InputModality::Text, InputModality::Image]);
        vision.context_window = Some(128_000);

        let mut reasoner = entry("anthropic", "claude-opus-4");
        reasoner.reasoning = Some(true);
        reasoner.context_window = Some(200_000);
        reasoner.supported_inputs = Some(vec![InputModality::Text]);

        let mut local = entry("ollama", "llama3");
        local.reasoning = Some(false);
        local.supported_inputs = Some(vec![InputModality::Text]);

        vec![vision, reasoner, local]
    }

    fn coding_task() -> TaskClassification {
        TaskClassification {
            task_type: TaskType::Coding,
            complexity: Complexity::Moderate,
            requires_vision: false,
            requires_reasoning: false,
            estimated_context_tokens: None,
            confidence: 0.8,
        }
    }

    fn providers(entries: &[CatalogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.provider_id.as_str()).collect()
    }

    fn apply(rules: &[TaskRule], task: &TaskClassification) -> RuleOutcome {
        apply_task_rules(&catalog(), rules, task, "anthropic", CostTier::Medium)
    }

    #[test]
    fn test_allowed_providers_restricts() {
        let filtered = filter_allowed_providers(&catalog(), &["OLLAMA".to_string()]);
        assert_eq!(providers(&filtered), vec!["ollama"]);
    }

    #[test]
    fn test_allowed_providers_empty_or_unmatched_keeps_all() {
        assert_eq!(filter_allowed_providers(&catalog(), &[]).len(), 3);
        assert_eq!(
            filter_allowed_providers(&catalog(), &["mistral".to_string()]).len(),
            3
        );
    }

    #[test]
    fn test_non_matching_rule_is_not_applied() {
        let outcome = apply(&[TaskRule::for_task(TaskType::Chat)], &coding_task());
        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.entries.len(), 3);
    }

    #[test]
    fn test_exclude_providers() {
        let mut rule = TaskRule::for_task(TaskType::Coding);
        rule.exclude_providers = Some(vec!["openai".to_string()]);

        let outcome = apply(&[rule], &coding_task());
        assert_eq!(outcome.applied, vec![0]);
        assert_eq!(providers(&outcome.entries), vec!["anthropic", "ollama"]);
    }

    #[test]
    fn test_preferred_providers_never_filter_to_zero() {
        let mut rule = TaskRule::for_task(TaskType::Coding);
        rule.preferred_providers = Some(vec!["mistral".to_string()]);

        let outcome = apply(&[rule], &coding_task());
        assert_eq!(outcome.entries.len(), 3);
        assert!(!outcome.reverted);
    }

    #[test]
    fn test_preferred_models_restrict_to_exact_refs() {
        let mut rule = TaskRule::for_task(TaskType::Coding);
        rule.preferred_models = Some(vec![
            "ollama/llama3".to_string(),
            "claude-opus-4".to_string(),
        ]);

        let outcome = apply(&[rule], &coding_task());
        let ids: Vec<&str> = outcome.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["claude-opus-4", "llama3"]);
    }

    #[test]
    fn test_rule_reasoning_requirement_overrides_task() {
        let mut rule = TaskRule::for_task(TaskType::Coding);
        rule.require_reasoning = Some(true);

        let outcome = apply(&[rule], &coding_task());
        assert_eq!(providers(&outcome.entries), vec!["anthropic"]);
    }

    #[test]
    fn test_rule_can_relax_task_reasoning_requirement() {
        let mut task = coding_task();
        task.requires_reasoning = true;
        let mut rule = TaskRule::for_task(TaskType::Coding);
        rule.require_reasoning = Some(false);

        let outcome = apply(&[rule], &task);
        assert_eq!(outcome.entries.len(), 3);
    }

    #[test]
    fn test_vision_requirement_filters_when_rule_matches() {
        let mut task = coding_task();
        task.requires_vision = true;

        let outcome = apply(&[TaskRule::for_task(TaskType::Coding)], &task);
        assert_eq!(providers(&outcome.entries), vec!["openai"]);
    }

    #[test]
    fn test_min_context_window() {
        let mut rule = TaskRule::for_task(TaskType::Coding);
        rule.min_context_window = Some(150_000);

        let outcome = apply(&[rule], &coding_task());
        assert_eq!(providers(&outcome.entries), vec!["anthropic"]);
    }

    #[test]
    fn test_rules_apply_cumulatively_in_order() {
        let mut first = TaskRule::for_task(TaskType::Coding);
        first.exclude_providers = Some(vec!["ollama".to_string()]);
        let mut second = TaskRule::for_task(TaskType::Coding);
        second.complexity = Some(Complexity::Moderate);
        second.exclude_providers = Some(vec!["openai".to_string()]);

        let outcome = apply(&[first, second], &coding_task());
        assert_eq!(outcome.applied, vec![0, 1]);
        assert_eq!(providers(&outcome.entries), vec!["anthropic"]);
    }

    #[test]
    fn test_empty_result_reverts_to_full_catalog() {
        let mut rule = TaskRule::for_task(TaskType::Coding);
        rule.exclude_providers = Some(vec![
            "openai".to_string(),
            "anthropic".to_string(),
            "ollama".to_string(),
        ]);

        let outcome = apply(&[rule], &coding_task());
        assert!(outcome.reverted);
        assert_eq!(outcome.entries.len(), 3);
        assert_eq!(outcome.applied, vec![0]);
    }
}
