//! Aggregation of raw interaction evidence into zombie signals.
//!
//! Each signal compares an item's surface accuracy against a deeper measure:
//! - LH/RH divergence: structured recall vs free-form/transfer recall of the same KC
//! - Format dependence: dominant response type vs alternate response types
//! - Speed without depth: item latency vs the learner's own fast percentile, plus elaboration
//! - Stalled difficulty: review volume and accuracy vs difficulty tier progress

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::detector::ZombieSignals;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalThresholds {
    pub high_accuracy: f64,
    pub low_accuracy: f64,
    /// Minimum attempts before an accuracy figure is trusted.
    pub min_samples: u32,
    pub low_elaboration_score: f64,
    pub short_response_chars: f64,
    pub stalled_min_reviews: u32,
    /// Learner latency percentile an item must beat to count as "fast".
    pub latency_percentile: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            high_accuracy: 0.8,
            low_accuracy: 0.5,
            min_samples: 3,
            low_elaboration_score: 0.4,
            short_response_chars: 20.0,
            stalled_min_reviews: 10,
            latency_percentile: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyTally {
    pub correct: u32,
    pub total: u32,
}

impl AccuracyTally {
    pub fn new(correct: u32, total: u32) -> Self {
        Self {
            correct: correct.min(total),
            total,
        }
    }

    pub fn accuracy(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(f64::from(self.correct.min(self.total)) / f64::from(self.total))
    }

    fn trusted(&self, min_samples: u32) -> Option<f64> {
        if self.total < min_samples {
            return None;
        }
        self.accuracy()
    }
}

/// Accuracy on one knowledge component, split by recall mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeComponentEvidence {
    /// Recognition / structured recall (multiple choice, matching).
    pub structured: AccuracyTally,
    /// Free-form production and transfer questions.
    pub transfer: AccuracyTally,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElaborationEvidence {
    pub mean_score: Option<f64>,
    pub mean_length_chars: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEvidence {
    pub review_count: u32,
    pub accuracy: AccuracyTally,
    pub median_latency_ms: Option<f64>,
    /// Accuracy keyed by response type, e.g. "multiple_choice", "typing".
    pub response_types: BTreeMap<String, AccuracyTally>,
    pub elaboration: ElaborationEvidence,
    pub difficulty_tier_start: u8,
    pub difficulty_tier_current: u8,
}

/// Linear-interpolation percentile; `None` for an empty sample.
pub fn percentile(samples: &[f64], p: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn lh_rh_divergence(kc: &KnowledgeComponentEvidence, t: &SignalThresholds) -> bool {
    match (
        kc.structured.trusted(t.min_samples),
        kc.transfer.trusted(t.min_samples),
    ) {
        (Some(structured), Some(transfer)) => {
            structured >= t.high_accuracy && transfer < t.low_accuracy
        }
        _ => false,
    }
}

pub fn format_dependence(
    response_types: &BTreeMap<String, AccuracyTally>,
    t: &SignalThresholds,
) -> bool {
    // BTreeMap iteration is ordered, so max_by_key keeps the last of equal
    // totals; reverse to prefer the alphabetically first type on ties.
    let Some((dominant_type, dominant)) = response_types
        .iter()
        .rev()
        .max_by_key(|(_, tally)| tally.total)
    else {
        return false;
    };
    let Some(dominant_accuracy) = dominant.trusted(t.min_samples) else {
        return false;
    };
    if dominant_accuracy < t.high_accuracy {
        return false;
    }
    response_types
        .iter()
        .filter(|(name, _)| *name != dominant_type)
        .filter_map(|(_, tally)| tally.trusted(t.min_samples))
        .any(|accuracy| accuracy < t.low_accuracy)
}

pub fn speed_without_depth(
    item: &ItemEvidence,
    learner_fast_latency_ms: Option<f64>,
    t: &SignalThresholds,
) -> bool {
    let (Some(latency), Some(fast)) = (item.median_latency_ms, learner_fast_latency_ms) else {
        return false;
    };
    if latency >= fast {
        return false;
    }
    let shallow_score = item
        .elaboration
        .mean_score
        .is_some_and(|score| score < t.low_elaboration_score);
    let short_answers = item
        .elaboration
        .mean_length_chars
        .is_some_and(|len| len < t.short_response_chars);
    shallow_score || short_answers
}

pub fn stalled_difficulty(item: &ItemEvidence, t: &SignalThresholds) -> bool {
    item.review_count >= t.stalled_min_reviews
        && item
            .accuracy
            .accuracy()
            .is_some_and(|accuracy| accuracy >= t.high_accuracy)
        && item.difficulty_tier_current <= item.difficulty_tier_start
}

/// Computes all four signals for one (learner, item) pair.
///
/// `kc` is the learner's evidence on the item's knowledge component, and
/// `learner_fast_latency_ms` the learner's latency at `latency_percentile`.
pub fn aggregate(
    item: &ItemEvidence,
    kc: Option<&KnowledgeComponentEvidence>,
    learner_fast_latency_ms: Option<f64>,
    thresholds: &SignalThresholds,
) -> ZombieSignals {
    ZombieSignals {
        lh_rh_divergence: kc.is_some_and(|kc| lh_rh_divergence(kc, thresholds)),
        format_dependence: format_dependence(&item.response_types, thresholds),
        speed_without_depth: speed_without_depth(item, learner_fast_latency_ms, thresholds),
        stalled_difficulty: stalled_difficulty(item, thresholds),
    }
}
