//! Routing logic for taskroute
//!
//! Chooses a primary backend plus ordered fallbacks for each task. The
//! [`TaskBasedRouter`] runs the decision pipeline; [`resolve_model`] applies
//! the configured fallback behavior when routing does not decide.

pub mod filters;
pub mod resolve;
pub mod strategy;
pub mod task_based;

pub use resolve::{ModelSelection, resolve_model};
pub use strategy::RoutingStrategy;
pub use task_based::{CooldownFilter, TaskBasedRouter};

use crate::catalog::ModelRef;
use crate::classifier::{TaskClassification, TaskHints};
use crate::scoring::ModelScore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One routing request
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RouteRequest {
    pub prompt: String,
    #[serde(default)]
    pub has_images: bool,
    #[serde(default)]
    pub hints: Option<TaskHints>,
    /// `provider/model` or bare `model`; bypasses the whole pipeline
    #[serde(default, rename = "override")]
    pub override_model: Option<String>,
    /// Provider allow-list; empty means every provider
    #[serde(default)]
    pub allowed_providers: Vec<String>,
}

impl RouteRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_images(mut self, has_images: bool) -> Self {
        self.has_images = has_images;
        self
    }

    pub fn with_hints(mut self, hints: TaskHints) -> Self {
        self.hints = Some(hints);
        self
    }

    pub fn with_override(mut self, model: impl Into<String>) -> Self {
        self.override_model = Some(model.into());
        self
    }

    pub fn with_allowed_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_providers = providers.into_iter().map(Into::into).collect();
        self
    }
}

/// How a decision was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// Caller named the model explicitly
    Override,
    /// Full pipeline under the given strategy
    Routed(RoutingStrategy),
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Override => "override",
            Self::Routed(strategy) => strategy.as_str(),
        }
    }
}

/// Provider-preference boost applied after ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceBoost {
    Cloud,
    Local,
}

/// Immutable record of one routing act
///
/// Used for logging, metrics and debugging; never fed back into routing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RoutingDecision {
    pub id: Uuid,
    pub kind: DecisionKind,
    pub selected: ModelScore,
    pub task: TaskClassification,
    /// Full ranking after preference boosting, best first
    pub ranked: Vec<ModelScore>,
    pub reasoning: String,
    /// Indices into `routing.task_rules` of the rules that matched
    #[serde(default)]
    pub rules_applied: Vec<usize>,
    #[serde(default)]
    pub boost: Option<PreferenceBoost>,
}

/// Primary selection plus ordered fallbacks
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RoutingResult {
    pub primary: ModelRef,
    /// Never contains `primary`; at most `routing.max_fallbacks` long
    pub fallbacks: Vec<ModelRef>,
    pub decision: RoutingDecision,
}
