use std::fmt;

use serde::{Deserialize, Serialize};

// Signal weights in tenths so sums stay exact (0.4 + 0.3 + 0.2 + 0.1 == 1.0).
const LH_RH_DIVERGENCE_WEIGHT: u8 = 4;
const FORMAT_DEPENDENCE_WEIGHT: u8 = 3;
const SPEED_WITHOUT_DEPTH_WEIGHT: u8 = 2;
const STALLED_DIFFICULTY_WEIGHT: u8 = 1;
const WEIGHT_SCALE: f64 = 10.0;

pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Behavioral evidence that an item is "mastered" by accuracy but not retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZombieSignals {
    /// Structured recall is accurate but free-form/transfer recall is not.
    pub lh_rh_divergence: bool,
    /// Accurate only in the learner's dominant response format.
    pub format_dependence: bool,
    /// Faster than the learner's usual pace with shallow elaboration.
    pub speed_without_depth: bool,
    /// Many accurate reviews without advancing difficulty tier.
    pub stalled_difficulty: bool,
}

impl ZombieSignals {
    pub fn any(&self) -> bool {
        self.lh_rh_divergence
            || self.format_dependence
            || self.speed_without_depth
            || self.stalled_difficulty
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationType {
    Elaboration,
    FormatShift,
    NovelContext,
    EncodingReset,
}

impl RemediationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elaboration => "elaboration",
            Self::FormatShift => "format_shift",
            Self::NovelContext => "novel_context",
            Self::EncodingReset => "encoding_reset",
        }
    }
}

impl fmt::Display for RemediationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationDecision {
    pub score: f64,
    pub is_zombie: bool,
    pub remediation_type: RemediationType,
}

/// Weighted sum of the signals; the weights total 1.0 so the score is in [0, 1].
pub fn score(signals: &ZombieSignals) -> f64 {
    let mut total: u8 = 0;
    if signals.lh_rh_divergence {
        total += LH_RH_DIVERGENCE_WEIGHT;
    }
    if signals.format_dependence {
        total += FORMAT_DEPENDENCE_WEIGHT;
    }
    if signals.speed_without_depth {
        total += SPEED_WITHOUT_DEPTH_WEIGHT;
    }
    if signals.stalled_difficulty {
        total += STALLED_DIFFICULTY_WEIGHT;
    }
    f64::from(total) / WEIGHT_SCALE
}

pub fn classify(signals: &ZombieSignals, threshold: f64) -> bool {
    score(signals) >= threshold
}

/// First matching signal wins, regardless of score.
pub fn remediate(signals: &ZombieSignals) -> RemediationType {
    if signals.lh_rh_divergence {
        RemediationType::Elaboration
    } else if signals.format_dependence {
        RemediationType::FormatShift
    } else if signals.speed_without_depth {
        RemediationType::NovelContext
    } else {
        RemediationType::EncodingReset
    }
}

pub fn decide(signals: &ZombieSignals, threshold: f64) -> RemediationDecision {
    let score = score(signals);
    RemediationDecision {
        score,
        is_zombie: score >= threshold,
        remediation_type: remediate(signals),
    }
}
