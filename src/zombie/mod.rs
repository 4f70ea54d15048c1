//! Zombie-item detection - items that look mastered by accuracy but are not retained
//!
//! Contains:
//! - Detector - weighted score, threshold classification, remediation precedence
//! - Signals - aggregation of interaction evidence into the four signals
//! - Sweep - batch evaluation over many (learner, item) pairs
//! - Store - idempotent remediation queue

pub mod detector;
pub mod signals;
pub mod store;
pub mod sweep;

pub use detector::{
    classify, decide, remediate, score, RemediationDecision, RemediationType, ZombieSignals,
    DEFAULT_THRESHOLD,
};
pub use signals::{
    aggregate, percentile, AccuracyTally, ElaborationEvidence, ItemEvidence,
    KnowledgeComponentEvidence, SignalThresholds,
};
pub use store::{
    InMemoryRemediationStore, RemediationKey, RemediationRecord, RemediationStatus,
    RemediationStore, StoreError, UpsertOutcome, ZOMBIE_DETECTION,
};
pub use sweep::{
    ApplyStats, CandidateOutcome, EvidenceSource, StaticEvidence, SweepReport, ZombieCandidate,
    ZombieSweep,
};
