//! Case-insensitive backend identity
//!
//! A backend is identified by `(provider, model)`. Comparisons ignore ASCII
//! case everywhere: catalog dedup, fallback exclusion, availability lookups.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Normalized `(provider, model)` identity
///
/// Both parts are stored lowercased so `Hash`/`Eq` are case-insensitive.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct ModelKey {
    provider: String,
    model: String,
}

impl ModelKey {
    pub fn new(provider: &str, model: &str) -> Self {
        Self {
            provider: provider.trim().to_ascii_lowercase(),
            model: model.trim().to_ascii_lowercase(),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Display for ModelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

impl From<&ModelRef> for ModelKey {
    fn from(model_ref: &ModelRef) -> Self {
        Self::new(&model_ref.provider, &model_ref.model)
    }
}

/// Set of identities to skip (primary exclusion, cooldown filtering)
pub type ExclusionSet = HashSet<ModelKey>;

/// Reference to a concrete backend as handed back to callers
///
/// Unlike [`ModelKey`] this keeps the original casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

impl ModelRef {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Parse a `provider/model` reference
    ///
    /// Splits at the first slash so model ids may themselves contain slashes
    /// (`openrouter/meta-llama/llama-3`). A bare `model` or a leading slash uses
    /// `default_provider`. Returns `None` for blank input or an empty model part.
    pub fn parse(input: &str, default_provider: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let (provider, model) = match input.split_once('/') {
            Some((provider, model)) => (provider.trim(), model.trim()),
            None => ("", input),
        };

        if model.is_empty() {
            return None;
        }

        let provider = if provider.is_empty() {
            default_provider
        } else {
            provider
        };

        Some(Self::new(provider, model))
    }

    pub fn key(&self) -> ModelKey {
        ModelKey::from(self)
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}
