//! Routing strategies
//!
//! A strategy is a named policy that re-weights the four scoring dimensions
//! before ranking. Three fixed cases, one pure mapping.

use crate::scoring::ScoringWeights;
use serde::{Deserialize, Serialize};

/// Weight given to the favoured dimension
const FAVOURED_WEIGHT: f64 = 0.5;

/// Weight left to the dimension traded away
const TRADED_WEIGHT: f64 = 0.1;

/// Scale applied to the capability weight when trading toward cost or speed
const CAPABILITY_SCALE: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingStrategy {
    CostOptimized,
    PerformanceOptimized,
    #[default]
    Balanced,
}

impl RoutingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CostOptimized => "cost-optimized",
            Self::PerformanceOptimized => "performance-optimized",
            Self::Balanced => "balanced",
        }
    }

    /// Weights to rank with under this strategy
    ///
    /// The result is always normalized.
    pub fn adjust_weights(&self, configured: &ScoringWeights) -> ScoringWeights {
        let base = configured.normalized();
        match self {
            Self::CostOptimized => ScoringWeights::new(
                base.capability * CAPABILITY_SCALE,
                FAVOURED_WEIGHT,
                TRADED_WEIGHT,
                base.availability,
            )
            .normalized(),
            Self::PerformanceOptimized => ScoringWeights::new(
                base.capability * CAPABILITY_SCALE,
                TRADED_WEIGHT,
                FAVOURED_WEIGHT,
                base.availability,
            )
            .normalized(),
            Self::Balanced => base,
        }
    }
}

impl std::fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
