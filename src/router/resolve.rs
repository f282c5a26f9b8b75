//! Default-model resolution
//!
//! Turns a routing attempt into a concrete answer for the caller, applying
//! `routing.fallback_behavior` when the router does not decide.

use super::{RouteRequest, RoutingResult, TaskBasedRouter};
use crate::catalog::ModelRef;
use crate::config::FallbackBehavior;
use serde::Serialize;

/// Outcome of model resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "selection", rename_all = "snake_case")]
pub enum ModelSelection {
    /// The router decided
    Routed(Box<RoutingResult>),
    /// The configured default model stands in
    Default { model: ModelRef },
    /// Nothing decided; the caller must pick a model
    ManualSelectionRequired,
}

impl ModelSelection {
    /// The model to use, if one was chosen
    pub fn model(&self) -> Option<&ModelRef> {
        match self {
            Self::Routed(result) => Some(&result.primary),
            Self::Default { model } => Some(model),
            Self::ManualSelectionRequired => None,
        }
    }
}

/// Route `request`, falling back per the router's configuration
///
/// `default_model` is the non-routed default supplied by the caller; when
/// `None` the configured `routing.default_model` is used.
pub async fn resolve_model(
    router: &TaskBasedRouter,
    request: &RouteRequest,
    default_model: Option<&ModelRef>,
) -> ModelSelection {
    if let Some(result) = router.select_for_task(request).await {
        return ModelSelection::Routed(Box::new(result));
    }

    let config = router.config();
    if config.fallback_behavior == FallbackBehavior::ManualSelection {
        tracing::info!("Routing produced no decision, manual model selection required");
        return ModelSelection::ManualSelectionRequired;
    }

    let model = default_model.cloned().or_else(|| config.default_model_ref());
    match model {
        Some(model) => {
            tracing::info!(
                provider = %model.provider,
                model = %model.model,
                "Routing produced no decision, using default model"
            );
            router.metrics().record_fallback(&model.provider, &model.model);
            ModelSelection::Default { model }
        }
        None => {
            tracing::warn!(
                "Routing produced no decision and no default model is configured, \
                manual model selection required"
            );
            ModelSelection::ManualSelectionRequired
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BackendCatalog, CatalogEntry, StaticSource};
    use crate::config::RoutingConfig;
    use crate::metrics::{MetricsRecorder, RoutingMetrics};
    use std::sync::Arc;

    fn router(config: RoutingConfig, metrics: Arc<RoutingMetrics>) -> TaskBasedRouter {
        let catalog = Arc::new(BackendCatalog::new(Arc::new(StaticSource::new(vec![
            CatalogEntry::new("ollama", "llama3", "Llama 3"),
        ]))));
        TaskBasedRouter::new(config, catalog, metrics)
    }

    #[tokio::test]
    async fn test_routed_when_router_decides() {
        let config = RoutingConfig {
            enabled: true,
            ..RoutingConfig::default()
        };
        let selection = resolve_model(
            &router(config, Arc::new(RoutingMetrics::new())),
            &RouteRequest::new("hello"),
            None,
        )
        .await;

        assert!(matches!(selection, ModelSelection::Routed(_)));
        assert_eq!(selection.model(), Some(&ModelRef::new("ollama", "llama3")));
    }

    #[tokio::test]
    async fn test_disabled_routing_uses_supplied_default() {
        let metrics = Arc::new(RoutingMetrics::new());
        let default = ModelRef::new("anthropic", "claude-sonnet-4");
        let selection = resolve_model(
            &router(RoutingConfig::default(), metrics.clone()),
            &RouteRequest::new("hello"),
            Some(&default),
        )
        .await;

        assert_eq!(selection, ModelSelection::Default { model: default });
        assert_eq!(metrics.snapshot().fallbacks_used, 1);
    }

    #[tokio::test]
    async fn test_configured_default_model_is_used() {
        let config = RoutingConfig {
            default_model: Some("openai/gpt-4o".to_string()),
            ..RoutingConfig::default()
        };
        let selection = resolve_model(
            &router(config, Arc::new(RoutingMetrics::new())),
            &RouteRequest::new("hello"),
            None,
        )
        .await;
        assert_eq!(selection.model(), Some(&ModelRef::new("openai", "gpt-4o")));
    }

    #[tokio::test]
    async fn test_manual_selection_behavior_ignores_default() {
        let metrics = Arc::new(RoutingMetrics::new());
        let config = RoutingConfig {
            fallback_behavior: FallbackBehavior::ManualSelection,
            default_model: Some("openai/gpt-4o".to_string()),
            ..RoutingConfig::default()
        };
        let selection = resolve_model(
            &router(config, metrics.clone()),
            &RouteRequest::new("hello"),
            None,
        )
        .await;

        assert_eq!(selection, ModelSelection::ManualSelectionRequired);
        assert_eq!(selection.model(), None);
        assert_eq!(metrics.snapshot().fallbacks_used, 0);
    }

    #[tokio::test]
    async fn test_no_default_requires_manual_selection() {
        let selection = resolve_model(
            &router(RoutingConfig::default(), Arc::new(RoutingMetrics::new())),
            &RouteRequest::new("hello"),
            None,
        )
        .await;
        assert_eq!(selection, ModelSelection::ManualSelectionRequired);
    }

    #[tokio::test]
    async fn test_override_wins_over_fallback_behavior() {
        let config = RoutingConfig {
            fallback_behavior: FallbackBehavior::ManualSelection,
            ..RoutingConfig::default()
        };
        let selection = resolve_model(
            &router(config, Arc::new(RoutingMetrics::new())),
            &RouteRequest::new("hello").with_override("google/gemini-2.5-pro"),
            None,
        )
        .await;
        assert_eq!(
            selection.model(),
            Some(&ModelRef::new("google", "gemini-2.5-pro"))
        );
    }

    #[test]
    fn test_selection_serializes_with_tag() {
        let json = serde_json::to_value(ModelSelection::ManualSelectionRequired).unwrap();
        assert_eq!(json["selection"], "manual_selection_required");

        let json = serde_json::to_value(ModelSelection::Default {
            model: ModelRef::new("openai", "gpt-4o"),
        })
        .unwrap();
        assert_eq!(json["selection"], "default");
        assert_eq!(json["model"]["provider"], "openai");
    }
}
