use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::QueueConfig;
use crate::memory::{elapsed_days, is_due, CardState, MemorySnapshot};

const OVERDUE_WEIGHT: f64 = 10.0;
const FORGETTING_WEIGHT: f64 = 5.0;
const NEW_CARD_BONUS: f64 = 1.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueCandidate {
    pub id: String,
    pub card: MemorySnapshot,
    /// Stored next-review date; absent for cards never scheduled.
    pub due: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    pub state: CardState,
    pub retrievability: f64,
    pub overdue_days: f64,
    pub priority: f64,
    pub is_new: bool,
    pub due: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMeta {
    /// Due candidates before truncation.
    pub total: usize,
    pub new_count: usize,
    pub due_count: usize,
    pub limit: usize,
    /// Candidates dropped for violating snapshot invariants.
    #[serde(default)]
    pub rejected: usize,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewQueue {
    pub items: Vec<QueueItem>,
    pub meta: QueueMeta,
}

/// Clamps a caller-supplied limit into `[1, max_limit]`.
pub fn effective_limit(limit: Option<i64>, config: &QueueConfig) -> usize {
    let max = config.max_limit.max(1);
    match limit {
        Some(value) => usize::try_from(value).map_or(1, |value| value.clamp(1, max)),
        None => config.default_limit.clamp(1, max),
    }
}

pub fn priority(overdue_days: f64, retrievability: f64, is_new: bool) -> f64 {
    let new_bonus = if is_new { NEW_CARD_BONUS } else { 0.0 };
    overdue_days * OVERDUE_WEIGHT + (1.0 - retrievability) * FORGETTING_WEIGHT + new_bonus
}

/// Selects due candidates and orders them by review priority.
///
/// Read-only: nothing about the candidates is mutated and "shown" events are
/// left to the caller.
pub fn build_queue(
    candidates: &[QueueCandidate],
    now: DateTime<Utc>,
    limit: Option<i64>,
    config: &QueueConfig,
) -> ReviewQueue {
    let limit = effective_limit(limit, config);

    let mut rejected = 0;
    let mut items: Vec<QueueItem> = candidates
        .iter()
        .filter(|candidate| match candidate.card.validate() {
            Ok(()) => true,
            Err(reason) => {
                warn!(id = %candidate.id, %reason, "review candidate rejected");
                rejected += 1;
                false
            }
        })
        .filter(|candidate| is_due(&candidate.card, candidate.due, now))
        .map(|candidate| rank(candidate, now))
        .collect();

    let total = items.len();
    let new_count = items.iter().filter(|item| item.is_new).count();
    let due_count = total - new_count;

    items.sort_by(compare_items);
    items.truncate(limit);

    debug!(
        candidates = candidates.len(),
        total,
        new_count,
        due_count,
        returned = items.len(),
        rejected,
        "review queue built"
    );

    ReviewQueue {
        items,
        meta: QueueMeta {
            total,
            new_count,
            due_count,
            limit,
            rejected,
            generated_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        },
    }
}

fn rank(candidate: &QueueCandidate, now: DateTime<Utc>) -> QueueItem {
    let card = &candidate.card;
    let is_new = card.state == CardState::New;
    let retrievability = card.live_retrievability(now);
    let overdue_days = match (is_new, candidate.due) {
        (false, Some(due)) => elapsed_days(due, now),
        _ => 0.0,
    };

    QueueItem {
        id: candidate.id.clone(),
        state: card.state,
        retrievability,
        overdue_days,
        priority: priority(overdue_days, retrievability, is_new),
        is_new,
        due: candidate.due,
    }
}

fn compare_items(a: &QueueItem, b: &QueueItem) -> Ordering {
    b.priority
        .total_cmp(&a.priority)
        .then_with(|| b.overdue_days.total_cmp(&a.overdue_days))
        .then_with(|| a.retrievability.total_cmp(&b.retrievability))
        .then_with(|| b.is_new.cmp(&a.is_new))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 8, 30, 0).unwrap()
    }

    fn config() -> QueueConfig {
        QueueConfig::default()
    }

    fn review(id: &str, stability: f64, reviewed_days_ago: i64, due_days_ago: i64) -> QueueCandidate {
        QueueCandidate {
            id: id.to_string(),
            card: MemorySnapshot {
                stability,
                difficulty: 5.0,
                retrievability: 1.0,
                state: CardState::Review,
                last_review: Some(now() - Duration::days(reviewed_days_ago)),
                review_count: 3,
                lapse_count: 0,
            },
            due: Some(now() - Duration::days(due_days_ago)),
        }
    }

    fn new_card(id: &str) -> QueueCandidate {
        QueueCandidate {
            id: id.to_string(),
            card: MemorySnapshot::new_card(),
            due: None,
        }
    }

    #[test]
    fn limit_clamping() {
        let c = config();
        assert_eq!(effective_limit(None, &c), 20);
        assert_eq!(effective_limit(Some(100), &c), 50);
        assert_eq!(effective_limit(Some(0), &c), 1);
        assert_eq!(effective_limit(Some(-7), &c), 1);
        assert_eq!(effective_limit(Some(35), &c), 35);
    }

    #[test]
    fn limit_clamping_survives_unbounded_max() {
        let c = QueueConfig {
            default_limit: 20,
            max_limit: usize::MAX,
        };
        assert_eq!(effective_limit(Some(100), &c), 100);
        assert_eq!(effective_limit(Some(i64::MAX), &c), i64::MAX as usize);
        assert_eq!(effective_limit(Some(-1), &c), 1);
        assert_eq!(effective_limit(None, &c), 20);
    }

    #[test]
    fn priority_formula() {
        assert!((priority(5.0, 0.7, false) - 51.5).abs() < 1e-9);
        assert!((priority(0.0, 1.0, true) - 1.0).abs() < 1e-9);
        assert!((priority(0.0, 0.0, false) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn filters_out_cards_not_yet_due() {
        let mut future = review("later", 10.0, 1, 0);
        future.due = Some(now() + Duration::days(2));
        let mut unscheduled = review("unscheduled", 10.0, 1, 0);
        unscheduled.due = None;
        let queue = build_queue(
            &[future, unscheduled, review("due", 10.0, 10, 0), new_card("fresh")],
            now(),
            None,
            &config(),
        );
        let ids: Vec<&str> = queue.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"due"));
        assert!(ids.contains(&"fresh"));
        assert_eq!(queue.meta.total, 2);
        assert_eq!(queue.meta.new_count, 1);
        assert_eq!(queue.meta.due_count, 1);
    }

    #[test]
    fn new_cards_have_no_overdue_days() {
        let mut stale_new = new_card("n");
        stale_new.due = Some(now() - Duration::days(40));
        let queue = build_queue(&[stale_new], now(), None, &config());
        assert_eq!(queue.items[0].overdue_days, 0.0);
        assert!(queue.items[0].is_new);
        assert!((queue.items[0].priority - 1.0).abs() < 1e-9);
    }

    #[test]
    fn overdue_dominates_ordering() {
        let queue = build_queue(
            &[review("a", 30.0, 31, 1), review("b", 30.0, 40, 10)],
            now(),
            None,
            &config(),
        );
        assert_eq!(queue.items[0].id, "b");
        assert!((queue.items[0].overdue_days - 10.0).abs() < 1e-9);
    }

    #[test]
    fn identical_priorities_order_by_id() {
        let queue = build_queue(
            &[review("z", 10.0, 10, 2), review("m", 10.0, 10, 2)],
            now(),
            None,
            &config(),
        );
        assert_eq!(queue.items[0].id, "m");
        assert_eq!(queue.items[1].id, "z");
    }

    #[test]
    fn generated_at_uses_millisecond_rfc3339() {
        let queue = build_queue(&[], now(), None, &config());
        assert_eq!(queue.meta.generated_at, "2024-05-20T08:30:00.000Z");
        assert_eq!(queue.meta.total, 0);
        assert!(queue.items.is_empty());
    }
}
