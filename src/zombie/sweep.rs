use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::detector::{decide, RemediationDecision, ZombieSignals};
use super::signals::{aggregate, percentile, ItemEvidence, KnowledgeComponentEvidence, SignalThresholds};
use super::store::{RemediationKey, RemediationStore, StoreError, UpsertOutcome};
use crate::config::ZombieConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZombieCandidate {
    pub learner_id: String,
    pub item_id: String,
    pub knowledge_component_id: Option<String>,
    pub evidence: ItemEvidence,
}

/// Learner-level aggregates that an analytics layer computes from history.
pub trait EvidenceSource: Sync {
    fn learner_latencies(&self, learner_id: &str) -> Vec<f64>;

    fn knowledge_component(
        &self,
        learner_id: &str,
        knowledge_component_id: &str,
    ) -> Option<KnowledgeComponentEvidence>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticEvidence {
    /// Response latencies (ms) per learner.
    #[serde(default)]
    pub latencies: HashMap<String, Vec<f64>>,
    /// Learner id -> knowledge component id -> evidence.
    #[serde(default)]
    pub knowledge_components: HashMap<String, HashMap<String, KnowledgeComponentEvidence>>,
}

impl EvidenceSource for StaticEvidence {
    fn learner_latencies(&self, learner_id: &str) -> Vec<f64> {
        self.latencies.get(learner_id).cloned().unwrap_or_default()
    }

    fn knowledge_component(
        &self,
        learner_id: &str,
        knowledge_component_id: &str,
    ) -> Option<KnowledgeComponentEvidence> {
        self.knowledge_components
            .get(learner_id)?
            .get(knowledge_component_id)
            .copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateOutcome {
    pub learner_id: String,
    pub item_id: String,
    pub signals: ZombieSignals,
    pub decision: RemediationDecision,
}

impl CandidateOutcome {
    pub fn key(&self) -> RemediationKey {
        RemediationKey::zombie(self.learner_id.clone(), self.item_id.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub evaluated: usize,
    /// Candidates below the review-count gate.
    pub skipped: usize,
    pub zombies: usize,
    pub outcomes: Vec<CandidateOutcome>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyStats {
    pub created: usize,
    pub updated: usize,
    pub reopened: usize,
    pub unchanged: usize,
    pub dismissed: usize,
}

impl SweepReport {
    /// Writes outcomes into the remediation store.
    ///
    /// Zombies are upserted; pairs that no longer classify have any open
    /// record dismissed. Safe to re-run with the same report.
    pub fn apply(
        &self,
        store: &dyn RemediationStore,
        now: DateTime<Utc>,
    ) -> Result<ApplyStats, StoreError> {
        let mut stats = ApplyStats::default();
        for outcome in &self.outcomes {
            let key = outcome.key();
            if outcome.decision.is_zombie {
                match store.upsert(key, &outcome.decision, now)? {
                    UpsertOutcome::Created => stats.created += 1,
                    UpsertOutcome::Updated => stats.updated += 1,
                    UpsertOutcome::Reopened => stats.reopened += 1,
                    UpsertOutcome::Unchanged => stats.unchanged += 1,
                }
            } else if store.dismiss(&key, now)? {
                stats.dismissed += 1;
            }
        }
        Ok(stats)
    }
}

/// Aggregates shared by candidates within one sweep.
#[derive(Default)]
struct SweepCache {
    fast_latency: RwLock<HashMap<String, Option<f64>>>,
    knowledge_components: RwLock<HashMap<(String, String), Option<KnowledgeComponentEvidence>>>,
}

impl SweepCache {
    fn fast_latency(
        &self,
        source: &dyn EvidenceSource,
        learner_id: &str,
        percentile_rank: f64,
    ) -> Option<f64> {
        if let Some(cached) = self.fast_latency.read().get(learner_id) {
            return *cached;
        }
        let value = percentile(&source.learner_latencies(learner_id), percentile_rank);
        self.fast_latency
            .write()
            .insert(learner_id.to_string(), value);
        value
    }

    fn knowledge_component(
        &self,
        source: &dyn EvidenceSource,
        learner_id: &str,
        knowledge_component_id: &str,
    ) -> Option<KnowledgeComponentEvidence> {
        let key = (learner_id.to_string(), knowledge_component_id.to_string());
        if let Some(cached) = self.knowledge_components.read().get(&key) {
            return *cached;
        }
        let value = source.knowledge_component(learner_id, knowledge_component_id);
        self.knowledge_components.write().insert(key, value);
        value
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ZombieSweep {
    config: ZombieConfig,
    thresholds: SignalThresholds,
}

impl ZombieSweep {
    pub fn new(config: ZombieConfig, thresholds: SignalThresholds) -> Self {
        Self { config, thresholds }
    }

    pub fn config(&self) -> &ZombieConfig {
        &self.config
    }

    /// Classifies every eligible candidate.
    ///
    /// Candidates are independent and evaluated in parallel; outcomes are
    /// ordered by (learner, item) and duplicate pairs keep their first entry.
    pub fn run(&self, candidates: &[ZombieCandidate], source: &dyn EvidenceSource) -> SweepReport {
        let start = Instant::now();
        let cache = SweepCache::default();

        let (eligible, skipped): (Vec<&ZombieCandidate>, Vec<&ZombieCandidate>) = candidates
            .iter()
            .partition(|candidate| candidate.evidence.review_count >= self.config.min_reviews);

        let mut outcomes: Vec<(usize, CandidateOutcome)> = eligible
            .par_iter()
            .enumerate()
            .map(|(index, candidate)| (index, self.evaluate(candidate, source, &cache)))
            .collect();

        outcomes.sort_by(|(ia, a), (ib, b)| {
            (&a.learner_id, &a.item_id, ia).cmp(&(&b.learner_id, &b.item_id, ib))
        });
        outcomes.dedup_by(|(_, later), (_, earlier)| {
            later.learner_id == earlier.learner_id && later.item_id == earlier.item_id
        });
        let outcomes: Vec<CandidateOutcome> = outcomes.into_iter().map(|(_, o)| o).collect();

        let zombies = outcomes.iter().filter(|o| o.decision.is_zombie).count();

        info!(
            candidates = candidates.len(),
            evaluated = outcomes.len(),
            skipped = skipped.len(),
            zombies,
            duration_ms = start.elapsed().as_millis() as u64,
            "zombie sweep completed"
        );

        SweepReport {
            evaluated: outcomes.len(),
            skipped: skipped.len(),
            zombies,
            outcomes,
        }
    }

    fn evaluate(
        &self,
        candidate: &ZombieCandidate,
        source: &dyn EvidenceSource,
        cache: &SweepCache,
    ) -> CandidateOutcome {
        let fast_latency = cache.fast_latency(
            source,
            &candidate.learner_id,
            self.thresholds.latency_percentile,
        );
        let kc = candidate
            .knowledge_component_id
            .as_deref()
            .and_then(|kc_id| cache.knowledge_component(source, &candidate.learner_id, kc_id));

        let signals = aggregate(&candidate.evidence, kc.as_ref(), fast_latency, &self.thresholds);
        let decision = decide(&signals, self.config.threshold);

        debug!(
            learner_id = %candidate.learner_id,
            item_id = %candidate.item_id,
            score = decision.score,
            is_zombie = decision.is_zombie,
            "zombie candidate evaluated"
        );

        CandidateOutcome {
            learner_id: candidate.learner_id.clone(),
            item_id: candidate.item_id.clone(),
            signals,
            decision,
        }
    }
}
