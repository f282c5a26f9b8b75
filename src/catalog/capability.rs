//! Capability profiles and their resolution
//!
//! A backend either declares an explicit [`CapabilityProfile`] or has one
//! inferred from its declared attributes (name patterns, context window, input
//! modalities, cost figures). Resolution is a total, pure function: an
//! explicit profile always wins, otherwise the inference branch runs.

use super::{CatalogEntry, CostFigures, InputModality};
use crate::classifier::{Complexity, TaskType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Context window assumed when neither the entry nor its name declares one
pub const DEFAULT_CONTEXT_WINDOW: u64 = 8192;

/// Context window at which a backend is considered analysis-capable
const LARGE_CONTEXT: u64 = 32_000;

/// Context window at which a backend handles complex tasks
const HUGE_CONTEXT: u64 = 100_000;

/// Monetary cost bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CostTier {
    Free,
    Low,
    #[default]
    Medium,
    High,
}

impl CostTier {
    /// Bucket the sum of all per-token cost figures
    pub fn from_figures(figures: &CostFigures) -> Self {
        let total = figures.total();
        if total <= 0.0 {
            Self::Free
        } else if total <= 2.0 {
            Self::Low
        } else if total <= 10.0 {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Normalized declaration of what a backend can handle
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CapabilityProfile {
    pub task_types: BTreeSet<TaskType>,
    pub max_complexity: Complexity,
    pub supports_vision: bool,
    pub supports_reasoning: bool,
    /// Always positive
    pub context_window: u64,
    pub cost_tier: CostTier,
}

impl CapabilityProfile {
    pub fn supports_task(&self, task_type: TaskType) -> bool {
        self.task_types.contains(&task_type)
    }
}

fn compile(source: &str) -> Regex {
    Regex::new(source).expect("built-in capability pattern must compile")
}

static VISION_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)(vision|\bvl\b|-vl|4o|gpt-4-turbo|gpt-4\.1|gpt-5|claude-3|claude-(sonnet|opus|haiku)|gemini|llava|pixtral|moondream)",
    )
});

static REASONING_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)(\bo[134]\b|reason|\br1\b|-r1|thinking|opus|qwq|deepseek-r|sonnet-4|gpt-5|gemini-2\.5-pro)",
    )
});

static CODING_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)(code|coder|codex|codestral|devstral|starcoder|deepseek|claude|gpt-4|gpt-5|sonnet|opus|qwen2\.5|gemini)",
    )
});

/// `<number>k` token delimited by non-alphanumerics, e.g. `mistral-32k`
static CONTEXT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)(?:^|[^a-z0-9.])(\d{1,4})k(?:$|[^a-z0-9])"));

/// Resolve the capability profile of a catalog entry
///
/// `default_tier` is used when the entry declares no cost figures.
pub fn resolve(entry: &CatalogEntry, default_tier: CostTier) -> CapabilityProfile {
    match &entry.capabilities {
        Some(explicit) => explicit.clone(),
        None => infer(entry, default_tier),
    }
}

fn infer(entry: &CatalogEntry, default_tier: CostTier) -> CapabilityProfile {
    let signals = format!("{} {}", entry.id, entry.display_name);

    let supports_vision = match &entry.supported_inputs {
        Some(inputs) => inputs.contains(&InputModality::Image),
        None => VISION_MARKERS.is_match(&signals),
    };
    let supports_reasoning = entry
        .reasoning
        .unwrap_or_else(|| REASONING_MARKERS.is_match(&signals));
    let supports_coding = CODING_MARKERS.is_match(&signals);

    let context_window = entry
        .context_window
        .filter(|window| *window > 0)
        .or_else(|| parse_context_token(&entry.id))
        .or_else(|| parse_context_token(&entry.display_name))
        .unwrap_or(DEFAULT_CONTEXT_WINDOW);

    let cost_tier = entry
        .cost
        .as_ref()
        .map(CostTier::from_figures)
        .unwrap_or(default_tier);

    let max_complexity = if supports_reasoning || context_window >= HUGE_CONTEXT {
        Complexity::Complex
    } else if context_window >= LARGE_CONTEXT {
        Complexity::Moderate
    } else {
        Complexity::Simple
    };

    let mut task_types = BTreeSet::from([TaskType::General, TaskType::Chat]);
    if supports_vision {
        task_types.insert(TaskType::Vision);
    }
    if supports_reasoning {
        task_types.insert(TaskType::Reasoning);
    }
    if supports_coding {
        task_types.insert(TaskType::Coding);
    }
    if supports_reasoning || context_window >= LARGE_CONTEXT {
        task_types.insert(TaskType::Analysis);
    }

    CapabilityProfile {
        task_types,
        max_complexity,
        supports_vision,
        supports_reasoning,
        context_window,
        cost_tier,
    }
}

fn parse_context_token(text: &str) -> Option<u64> {
    CONTEXT_TOKEN
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse::<u64>().ok())
        .map(|thousands| thousands * 1000)
        .filter(|window| *window > 0)
}
