//! Task classification
//!
//! Pure, synchronous keyword classification of a prompt into a task type and
//! complexity. Zero I/O: safe to call from any number of concurrent callers.
//!
//! Each task type owns an ordered list of case-insensitive patterns. A type's
//! score is the number of distinct patterns that match the prompt; images add a
//! fixed boost to `vision`. The strictly highest score wins and ties resolve to
//! the earlier type in [`TaskType::ALL`]. That tie order is arbitrary but kept
//! stable for compatibility with existing routing rules.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Boost added to the vision score when the request carries images
const IMAGE_VISION_BOOST: usize = 3;

/// Prompts shorter than this (in chars) default to `Simple`
const SIMPLE_LENGTH_THRESHOLD: usize = 100;

/// Prompts longer than this (in chars) default to `Complex`
const COMPLEX_LENGTH_THRESHOLD: usize = 500;

/// Task type classification
///
/// Ordering follows declaration order, which is also the tie-break order.
/// The order itself carries no meaning beyond being fixed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Coding,
    Reasoning,
    Chat,
    Vision,
    Analysis,
    #[default]
    General,
}

impl TaskType {
    /// Every task type, in tie-break order
    pub const ALL: [TaskType; 6] = [
        TaskType::Coding,
        TaskType::Reasoning,
        TaskType::Chat,
        TaskType::Vision,
        TaskType::Analysis,
        TaskType::General,
    ];

    /// Convert to string representation for logging and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coding => "coding",
            Self::Reasoning => "reasoning",
            Self::Chat => "chat",
            Self::Vision => "vision",
            Self::Analysis => "analysis",
            Self::General => "general",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Coding => 0,
            Self::Reasoning => 1,
            Self::Chat => 2,
            Self::Vision => 3,
            Self::Analysis => 4,
            Self::General => 5,
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task complexity, ordered from least to most demanding
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Moderate,
    Complex,
}

impl Complexity {
    /// Numeric level used for partial-credit scoring (simple=1 .. complex=3)
    pub fn level(&self) -> u8 {
        match self {
            Self::Simple => 1,
            Self::Moderate => 2,
            Self::Complex => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied hints that override parts of the computed classification
///
/// A hinted `task_type` skips pattern scoring entirely. Every other field
/// overrides only its own computed value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TaskHints {
    #[serde(default)]
    pub task_type: Option<TaskType>,
    #[serde(default)]
    pub complexity: Option<Complexity>,
    #[serde(default)]
    pub requires_vision: Option<bool>,
    #[serde(default)]
    pub requires_reasoning: Option<bool>,
    #[serde(default)]
    pub estimated_context_tokens: Option<u64>,
}

impl TaskHints {
    /// Hint only the task type
    pub fn with_task_type(task_type: TaskType) -> Self {
        Self {
            task_type: Some(task_type),
            ..Self::default()
        }
    }
}

/// Result of classifying one task
///
/// Produced fresh for every request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TaskClassification {
    pub task_type: TaskType,
    pub complexity: Complexity,
    pub requires_vision: bool,
    pub requires_reasoning: bool,
    pub estimated_context_tokens: Option<u64>,
    pub confidence: f64,
}

impl TaskClassification {
    /// Classification used when nothing is known about the task
    pub fn unclassified() -> Self {
        Self {
            task_type: TaskType::General,
            complexity: Complexity::Moderate,
            requires_vision: false,
            requires_reasoning: false,
            estimated_context_tokens: None,
            confidence: 0.5,
        }
    }

    /// Estimate token count from a prompt string (simple heuristic: chars / 4)
    pub fn estimate_tokens(prompt: &str) -> u64 {
        (prompt.chars().count() / 4) as u64
    }
}

fn compile(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|source| Regex::new(source).expect("built-in classifier pattern must compile"))
        .collect()
}

/// Per-type patterns, indexed by `TaskType::index`
static TASK_PATTERNS: LazyLock<[Vec<Regex>; 6]> = LazyLock::new(|| {
    [
        compile(&[
            r"(?i)\b(code|coding|codebase)\b",
            r"(?i)\bfunctions?\b",
            r"(?i)\b(debug|debugging|bug|bugs)\b",
            r"(?i)\b(refactor|refactoring)\b",
            r"(?i)\b(compile|compiler|compilation)\b",
            r"(?i)\b(implement|implementation)\b",
            r"(?i)\b(class|method|variable|struct|interface)\b",
            r"(?i)\b(python|rust|javascript|typescript|java|golang|kotlin|swift|sql|bash)\b",
            r"(?i)\b(api|endpoint|sdk)\b",
            r"(?i)\b(unit tests?|test cases?|stack trace|exception)\b",
            r"(?i)\b(script|program|programming|algorithm)\b",
            r"```",
        ]),
        compile(&[
            r"(?i)\bstep[- ]by[- ]step\b",
            r"(?i)\b(proof|prove|proving)\b",
            r"(?i)\b(math|mathematical|mathematics|equation|theorem)\b",
            r"(?i)\b(reason|reasoning)\b",
            r"(?i)\b(logic|logical)\b",
            r"(?i)\b(deduce|deduction|infer|inference|derive)\b",
            r"(?i)\bwhy\b",
            r"(?i)\b(solve|puzzle|riddle)\b",
            r"(?i)\b(calculate|calculation)\b",
        ]),
        compile(&[
            r"(?i)^\s*(hi|hello|hey|greetings)\b",
            r"(?i)\bhow are you\b",
            r"(?i)\b(thanks|thank you)\b",
            r"(?i)\b(chat|talk|conversation)\b",
            r"(?i)\bgood (morning|afternoon|evening)\b",
            r"(?i)\b(joke|fun fact)\b",
        ]),
        compile(&[
            r"(?i)\b(image|images|picture|pictures|photo|photos)\b",
            r"(?i)\b(screenshot|screenshots)\b",
            r"(?i)\b(diagram|illustration)s?\b",
            r"(?i)\b(visual|visually)\b",
            r"(?i)\bwhat do you see\b",
            r"(?i)\b(ocr|handwriting)\b",
        ]),
        compile(&[
            r"(?i)\b(analy[sz]e|analysis|analy[sz]ing)\b",
            r"(?i)\b(compare|comparison|contrast)\b",
            r"(?i)\b(evaluate|evaluation|assess|assessment)\b",
            r"(?i)\b(summari[sz]e|summary)\b",
            r"(?i)\breview\b",
            r"(?i)\b(data|dataset|statistics|metrics)\b",
            r"(?i)\b(trends?|insights?)\b",
            r"(?i)\bpros and cons\b",
        ]),
        Vec::new(),
    ]
});

static COMPLEX_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(complex|complicated|intricate)\b",
        r"(?i)\b(comprehensive|thorough|in[- ]depth|detailed)\b",
        r"(?i)\b(architecture|architect)\b",
        r"(?i)\b(multi[- ]step|advanced|sophisticated)\b",
        r"(?i)\b(optimi[sz]e|optimization|optimisation)\b",
        r"(?i)\bdesign an? (system|service|platform)\b",
    ])
});

static SIMPLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(simple|quick|quickly|brief|briefly)\b",
        r"(?i)\b(short|easy|basic|trivial)\b",
        r"(?i)\bone[- ]liners?\b",
        r"(?i)\bjust\b",
    ])
});

fn count_matches(patterns: &[Regex], text: &str) -> usize {
    patterns.iter().filter(|re| re.is_match(text)).count()
}

/// Keyword-based task classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskClassifier;

impl TaskClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a prompt
    ///
    /// Never fails. A blank prompt with no hints classifies as
    /// `general`/`moderate` with confidence 0.5.
    pub fn classify(
        &self,
        prompt: &str,
        has_images: bool,
        hints: Option<&TaskHints>,
    ) -> TaskClassification {
        let hints = hints.cloned().unwrap_or_default();

        let (task_type, confidence, reasoning_keyword_score) = match hints.task_type {
            Some(hinted) => (hinted, 1.0, 0),
            None => {
                let mut scores = [0usize; 6];
                for task_type in TaskType::ALL {
                    scores[task_type.index()] =
                        count_matches(&TASK_PATTERNS[task_type.index()], prompt);
                }
                let reasoning_keyword_score = scores[TaskType::Reasoning.index()];
                if has_images {
                    scores[TaskType::Vision.index()] += IMAGE_VISION_BOOST;
                }
                let (task_type, confidence) = Self::pick_task_type(&scores);
                (task_type, confidence, reasoning_keyword_score)
            }
        };

        let complexity = hints
            .complexity
            .unwrap_or_else(|| Self::infer_complexity(prompt));

        let requires_reasoning = hints.requires_reasoning.unwrap_or(
            task_type == TaskType::Reasoning
                || complexity == Complexity::Complex
                || reasoning_keyword_score > 1,
        );

        let requires_vision = hints
            .requires_vision
            .unwrap_or(has_images || task_type == TaskType::Vision);

        let estimated_context_tokens = hints
            .estimated_context_tokens
            .or_else(|| Some(TaskClassification::estimate_tokens(prompt)));

        let classification = TaskClassification {
            task_type,
            complexity,
            requires_vision,
            requires_reasoning,
            estimated_context_tokens,
            confidence,
        };

        tracing::debug!(
            task_type = %classification.task_type,
            complexity = %classification.complexity,
            requires_vision = classification.requires_vision,
            requires_reasoning = classification.requires_reasoning,
            confidence = classification.confidence,
            hinted = hints.task_type.is_some(),
            "Task classified"
        );

        classification
    }

    /// Pick the strictly highest-scoring type; earlier types win ties
    fn pick_task_type(scores: &[usize; 6]) -> (TaskType, f64) {
        let total: usize = scores.iter().sum();
        if total == 0 {
            return (TaskType::General, 0.5);
        }

        let mut best = TaskType::ALL[0];
        let mut best_score = scores[0];
        for task_type in TaskType::ALL.iter().skip(1) {
            let score = scores[task_type.index()];
            if score > best_score {
                best = *task_type;
                best_score = score;
            }
        }

        let confidence = (best_score as f64 / total as f64 + 0.3).min(1.0);
        (best, confidence)
    }

    /// Complex keywords, then simple keywords, then prompt length
    fn infer_complexity(prompt: &str) -> Complexity {
        if prompt.trim().is_empty() {
            return Complexity::Moderate;
        }
        if count_matches(&COMPLEX_PATTERNS, prompt) > 0 {
            return Complexity::Complex;
        }
        if count_matches(&SIMPLE_PATTERNS, prompt) > 0 {
            return Complexity::Simple;
        }

        let length = prompt.chars().count();
        if length < SIMPLE_LENGTH_THRESHOLD {
            Complexity::Simple
        } else if length > COMPLEX_LENGTH_THRESHOLD {
            Complexity::Complex
        } else {
            Complexity::Moderate
        }
    }
}
