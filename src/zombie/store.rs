use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::detector::{RemediationDecision, RemediationType};

pub const ZOMBIE_DETECTION: &str = "zombie";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationKey {
    pub learner_id: String,
    pub item_id: String,
    pub detection_type: String,
}

impl RemediationKey {
    pub fn zombie(learner_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            learner_id: learner_id.into(),
            item_id: item_id.into(),
            detection_type: ZOMBIE_DETECTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationStatus {
    Pending,
    InProgress,
    Completed,
    Dismissed,
}

impl RemediationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Dismissed => "dismissed",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationRecord {
    pub id: Uuid,
    pub key: RemediationKey,
    pub score: f64,
    pub remediation_type: RemediationType,
    pub status: RemediationStatus,
    pub detected_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
    Reopened,
    Unchanged,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("remediation record not found")]
    NotFound,
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
}

/// Remediation queue keyed by (learner, item, detection type).
///
/// Upserts must be idempotent: re-running detection never duplicates rows.
pub trait RemediationStore: Send + Sync {
    fn upsert(
        &self,
        key: RemediationKey,
        decision: &RemediationDecision,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Dismisses an open record; returns false when there was nothing open.
    fn dismiss(&self, key: &RemediationKey, now: DateTime<Utc>) -> Result<bool, StoreError>;

    fn get(&self, key: &RemediationKey) -> Option<RemediationRecord>;

    fn open_for_detection(&self, detection_type: &str) -> Vec<RemediationKey>;
}

#[derive(Debug, Default)]
pub struct InMemoryRemediationStore {
    records: RwLock<HashMap<RemediationKey, RemediationRecord>>,
}

impl InMemoryRemediationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn records(&self) -> Vec<RemediationRecord> {
        let mut records: Vec<_> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }

    pub fn mark_in_progress(
        &self,
        key: &RemediationKey,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.transition(key, RemediationStatus::Pending, RemediationStatus::InProgress, now)
    }

    pub fn complete(&self, key: &RemediationKey, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.transition(key, RemediationStatus::InProgress, RemediationStatus::Completed, now)
    }

    fn transition(
        &self,
        key: &RemediationKey,
        from: RemediationStatus,
        to: RemediationStatus,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let record = records.get_mut(key).ok_or(StoreError::NotFound)?;
        if record.status != from {
            return Err(StoreError::InvalidTransition {
                from: record.status.as_str(),
                to: to.as_str(),
            });
        }
        record.status = to;
        record.updated_at = now;
        Ok(())
    }
}

impl RemediationStore for InMemoryRemediationStore {
    fn upsert(
        &self,
        key: RemediationKey,
        decision: &RemediationDecision,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut records = self.records.write();

        let Some(record) = records.get_mut(&key) else {
            debug!(
                learner_id = %key.learner_id,
                item_id = %key.item_id,
                remediation_type = %decision.remediation_type,
                "remediation created"
            );
            records.insert(
                key.clone(),
                RemediationRecord {
                    id: Uuid::new_v4(),
                    key,
                    score: decision.score,
                    remediation_type: decision.remediation_type,
                    status: RemediationStatus::Pending,
                    detected_at: now,
                    updated_at: now,
                },
            );
            return Ok(UpsertOutcome::Created);
        };

        if !record.status.is_open() {
            record.status = RemediationStatus::Pending;
            record.score = decision.score;
            record.remediation_type = decision.remediation_type;
            record.detected_at = now;
            record.updated_at = now;
            debug!(learner_id = %key.learner_id, item_id = %key.item_id, "remediation reopened");
            return Ok(UpsertOutcome::Reopened);
        }

        if record.score == decision.score && record.remediation_type == decision.remediation_type {
            return Ok(UpsertOutcome::Unchanged);
        }
        record.score = decision.score;
        record.remediation_type = decision.remediation_type;
        record.updated_at = now;
        Ok(UpsertOutcome::Updated)
    }

    fn dismiss(&self, key: &RemediationKey, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut records = self.records.write();
        match records.get_mut(key) {
            Some(record) if record.status.is_open() => {
                record.status = RemediationStatus::Dismissed;
                record.updated_at = now;
                debug!(learner_id = %key.learner_id, item_id = %key.item_id, "remediation dismissed");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn get(&self, key: &RemediationKey) -> Option<RemediationRecord> {
        self.records.read().get(key).cloned()
    }

    fn open_for_detection(&self, detection_type: &str) -> Vec<RemediationKey> {
        let mut keys: Vec<RemediationKey> = self
            .records
            .read()
            .values()
            .filter(|record| record.status.is_open() && record.key.detection_type == detection_type)
            .map(|record| record.key.clone())
            .collect();
        keys.sort();
        keys
    }
}
