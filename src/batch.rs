//! Batch driver for the review-sweep binary.
//!
//! Loads a JSON snapshot exported by the persistence layer, runs the zombie
//! sweep against a fresh remediation ledger and optionally ranks a review
//! queue. All computation stays in the pure modules; this file only moves
//! data in and out.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::CoreConfig;
use crate::review::{build_queue, QueueCandidate, ReviewQueue};
use crate::zombie::{
    ApplyStats, InMemoryRemediationStore, RemediationRecord, SignalThresholds, StaticEvidence,
    StoreError, SweepReport, ZombieCandidate, ZombieSweep,
};

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to read sweep input: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid sweep input: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRequest {
    pub cards: Vec<QueueCandidate>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepInput {
    pub now: DateTime<Utc>,
    #[serde(default)]
    pub candidates: Vec<ZombieCandidate>,
    #[serde(default)]
    pub evidence: StaticEvidence,
    #[serde(default)]
    pub thresholds: Option<SignalThresholds>,
    pub queue: Option<QueueRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepOutput {
    pub report: SweepReport,
    pub applied: ApplyStats,
    pub remediations: Vec<RemediationRecord>,
    pub queue: Option<ReviewQueue>,
}

pub fn load_input(path: &Path) -> Result<SweepInput, BatchError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn run(input: &SweepInput, config: &CoreConfig) -> Result<SweepOutput, BatchError> {
    let thresholds = input.thresholds.unwrap_or_default();
    let sweep = ZombieSweep::new(config.zombie, thresholds);
    let store = InMemoryRemediationStore::new();

    let report = sweep.run(&input.candidates, &input.evidence);
    let applied = report.apply(&store, input.now)?;

    let queue = input
        .queue
        .as_ref()
        .map(|request| build_queue(&request.cards, input.now, request.limit, &config.queue));

    info!(
        zombies = report.zombies,
        created = applied.created,
        queued = queue.as_ref().map(|q| q.items.len()).unwrap_or(0),
        "review sweep finished"
    );

    Ok(SweepOutput {
        report,
        applied,
        remediations: store.records(),
        queue,
    })
}

pub fn run_file(path: &Path, config: &CoreConfig) -> Result<SweepOutput, BatchError> {
    let input = load_input(path)?;
    run(&input, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const INPUT: &str = r#"{
        "now": "2024-09-01T06:00:00Z",
        "candidates": [
            {
                "learnerId": "u1",
                "itemId": "w1",
                "knowledgeComponentId": "kc-1",
                "evidence": {
                    "reviewCount": 12,
                    "accuracy": { "correct": 11, "total": 12 },
                    "medianLatencyMs": 800.0,
                    "responseTypes": {
                        "multiple_choice": { "correct": 10, "total": 10 },
                        "typing": { "correct": 1, "total": 4 }
                    },
                    "elaboration": { "meanScore": 0.2, "meanLengthChars": null },
                    "difficultyTierStart": 1,
                    "difficultyTierCurrent": 1
                }
            },
            {
                "learnerId": "u1",
                "itemId": "w2",
                "knowledgeComponentId": null,
                "evidence": {
                    "reviewCount": 3,
                    "accuracy": { "correct": 3, "total": 3 },
                    "medianLatencyMs": null,
                    "responseTypes": {},
                    "elaboration": { "meanScore": null, "meanLengthChars": null },
                    "difficultyTierStart": 0,
                    "difficultyTierCurrent": 0
                }
            }
        ],
        "evidence": {
            "latencies": { "u1": [1000.0, 1500.0, 2500.0, 4000.0, 6000.0] },
            "knowledgeComponents": {
                "u1": {
                    "kc-1": {
                        "structured": { "correct": 9, "total": 10 },
                        "transfer": { "correct": 1, "total": 5 }
                    }
                }
            }
        },
        "queue": {
            "cards": [
                {
                    "id": "w3",
                    "card": {
                        "stability": 1.0, "difficulty": 5.0, "retrievability": 1.0,
                        "state": "new", "lastReview": null, "reviewCount": 0, "lapseCount": 0
                    },
                    "due": null
                }
            ],
            "limit": null
        }
    }"#;

    #[test]
    fn runs_sweep_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(INPUT.as_bytes()).unwrap();

        let output = run_file(file.path(), &CoreConfig::default()).unwrap();
        assert_eq!(output.report.evaluated, 1);
        assert_eq!(output.report.skipped, 1);
        assert_eq!(output.report.zombies, 1);
        assert_eq!(output.applied.created, 1);

        let outcome = &output.report.outcomes[0];
        assert!(outcome.signals.lh_rh_divergence);
        assert!(outcome.signals.format_dependence);
        assert!(outcome.signals.speed_without_depth);
        assert!(outcome.signals.stalled_difficulty);
        assert_eq!(outcome.decision.score, 1.0);

        assert_eq!(output.remediations.len(), 1);
        let queue = output.queue.unwrap();
        assert_eq!(queue.items.len(), 1);
        assert_eq!(queue.meta.new_count, 1);
        assert_eq!(queue.meta.rejected, 0);
        assert_eq!(queue.meta.generated_at, "2024-09-01T06:00:00.000Z");
    }

    #[test]
    fn rejects_malformed_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"now": "yesterday"}"#).unwrap();
        assert!(matches!(
            load_input(file.path()),
            Err(BatchError::Json(_))
        ));
        assert!(matches!(
            load_input(Path::new("/nonexistent/sweep.json")),
            Err(BatchError::Io(_))
        ));
    }

    #[test]
    fn rejects_unknown_card_state() {
        let bad = INPUT.replace(r#""state": "new""#, r#""state": "mastered""#);
        assert!(serde_json::from_str::<SweepInput>(&bad).is_err());
    }
}
