//! Configuration management for taskroute
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Every section and field has a default, so an empty file is a valid
//! configuration with routing disabled.

use crate::catalog::{CostTier, ModelRef};
use crate::classifier::{Complexity, TaskClassification, TaskType};
use crate::error::{AppError, AppResult};
use crate::router::RoutingStrategy;
use crate::scoring::ScoringWeights;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for every configurable timeout, in seconds
const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

/// What to do when routing produces no decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackBehavior {
    /// Ask the caller to pick a model
    ManualSelection,
    /// Use `routing.default_model`
    #[default]
    DefaultModel,
}

/// Per-task-type routing policy
///
/// Applies only when `task_type` matches the classification, and
/// `complexity` too when set.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TaskRule {
    pub task_type: TaskType,
    #[serde(default)]
    pub complexity: Option<Complexity>,
    #[serde(default)]
    pub preferred_providers: Option<Vec<String>>,
    /// Exact `provider/model` references
    #[serde(default)]
    pub preferred_models: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_providers: Option<Vec<String>>,
    #[serde(default)]
    pub min_context_window: Option<u64>,
    /// Overrides the task's own reasoning requirement
    #[serde(default)]
    pub require_reasoning: Option<bool>,
}

impl TaskRule {
    pub fn for_task(task_type: TaskType) -> Self {
        Self {
            task_type,
            complexity: None,
            preferred_providers: None,
            preferred_models: None,
            exclude_providers: None,
            min_context_window: None,
            require_reasoning: None,
        }
    }

    pub fn matches(&self, task: &TaskClassification) -> bool {
        self.task_type == task.task_type
            && self
                .complexity
                .is_none_or(|complexity| complexity == task.complexity)
    }
}

/// Routing policy
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub strategy: RoutingStrategy,
    #[serde(default = "default_true")]
    pub prefer_local: bool,
    #[serde(default = "default_local_providers")]
    pub local_providers: Vec<String>,
    #[serde(default = "default_cloud_providers")]
    pub cloud_providers: Vec<String>,
    #[serde(default)]
    pub task_rules: Vec<TaskRule>,
    /// Never rejected: zero or negative weights are corrected at ranking time
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default)]
    pub fallback_behavior: FallbackBehavior,
    #[serde(default = "default_max_fallbacks")]
    pub max_fallbacks: usize,
    /// Provider assumed for bare override strings
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// `provider/model` used when routing does not decide
    #[serde(default)]
    pub default_model: Option<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strategy: RoutingStrategy::default(),
            prefer_local: true,
            local_providers: default_local_providers(),
            cloud_providers: default_cloud_providers(),
            task_rules: Vec::new(),
            weights: ScoringWeights::default(),
            fallback_behavior: FallbackBehavior::default(),
            max_fallbacks: default_max_fallbacks(),
            default_provider: default_provider(),
            default_model: None,
        }
    }
}

impl RoutingConfig {
    /// The configured default model, if it parses
    pub fn default_model_ref(&self) -> Option<ModelRef> {
        self.default_model
            .as_deref()
            .and_then(|raw| ModelRef::parse(raw, &self.default_provider))
    }

    pub fn is_local(&self, provider: &str) -> bool {
        contains_provider(&self.local_providers, provider)
    }

    pub fn is_cloud(&self, provider: &str) -> bool {
        contains_provider(&self.cloud_providers, provider)
    }
}

/// Case-insensitive provider membership
pub fn contains_provider(providers: &[String], provider: &str) -> bool {
    providers
        .iter()
        .any(|candidate| candidate.trim().eq_ignore_ascii_case(provider.trim()))
}

fn default_true() -> bool {
    true
}

fn default_local_providers() -> Vec<String> {
    vec!["ollama".to_string()]
}

fn default_cloud_providers() -> Vec<String> {
    vec![
        "anthropic".to_string(),
        "openai".to_string(),
        "google".to_string(),
    ]
}

fn default_max_fallbacks() -> usize {
    3
}

fn default_provider() -> String {
    "anthropic".to_string()
}

/// Backend catalog configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// TOML file of `[[models]]` entries; an empty catalog when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_seconds: u64,
    /// Tier assumed for entries that declare no cost figures
    #[serde(default)]
    pub default_cost_tier: CostTier,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: None,
            discovery_timeout_seconds: default_discovery_timeout(),
            default_cost_tier: CostTier::default(),
        }
    }
}

impl CatalogConfig {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_seconds)
    }
}

fn default_discovery_timeout() -> u64 {
    10
}

/// Live availability probing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_health_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_health_timeout")]
    pub timeout_seconds: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: default_health_interval(),
            timeout_seconds: default_health_timeout(),
        }
    }
}

impl HealthConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_health_interval() -> u64 {
    30
}

fn default_health_timeout() -> u64 {
    5
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn check_timeout(name: &str, seconds: u64) -> AppResult<()> {
    if seconds == 0 {
        return Err(AppError::Config(format!(
            "{} must be greater than 0",
            name
        )));
    }
    if seconds > MAX_TIMEOUT_SECONDS {
        return Err(AppError::Config(format!(
            "{} cannot exceed {} seconds (5 minutes), got {}",
            name, MAX_TIMEOUT_SECONDS, seconds
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()` and `from_str()`. Scoring weights are never
    /// checked here.
    pub fn validate(&self) -> AppResult<()> {
        check_timeout(
            "catalog.discovery_timeout_seconds",
            self.catalog.discovery_timeout_seconds,
        )?;
        check_timeout("health.timeout_seconds", self.health.timeout_seconds)?;

        if self.health.interval_seconds == 0 {
            return Err(AppError::Config(
                "health.interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.routing.default_provider.trim().is_empty() {
            return Err(AppError::Config(
                "routing.default_provider must not be empty. \
                It is the provider assumed for override strings without a 'provider/' prefix."
                    .to_string(),
            ));
        }

        if let Some(raw) = &self.routing.default_model
            && self.routing.default_model_ref().is_none()
        {
            return Err(AppError::Config(format!(
                "routing.default_model '{}' is not a valid model reference. \
                Expected 'provider/model' or a bare model name.",
                raw
            )));
        }

        for (index, rule) in self.routing.task_rules.iter().enumerate() {
            for model in rule.preferred_models.iter().flatten() {
                if ModelRef::parse(model, &self.routing.default_provider).is_none() {
                    return Err(AppError::Config(format!(
                        "routing.task_rules[{}] lists invalid preferred model '{}'",
                        index, model
                    )));
                }
            }
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}
