#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};

use danci_memory_core::memory::{CardState, MemorySnapshot};
use danci_memory_core::review::QueueCandidate;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 15, 7, 0, 0).unwrap()
}

pub fn review_card(stability: f64, difficulty: f64, reviewed_days_ago: f64) -> MemorySnapshot {
    MemorySnapshot {
        stability,
        difficulty,
        retrievability: 1.0,
        state: CardState::Review,
        last_review: Some(fixed_now() - days(reviewed_days_ago)),
        review_count: 5,
        lapse_count: 1,
    }
}

pub fn days(value: f64) -> Duration {
    Duration::milliseconds((value * 86_400_000.0).round() as i64)
}

pub fn due_candidate(id: &str, card: MemorySnapshot, overdue_days: f64) -> QueueCandidate {
    QueueCandidate {
        id: id.to_string(),
        card,
        due: Some(fixed_now() - days(overdue_days)),
    }
}

pub fn new_candidate(id: &str) -> QueueCandidate {
    QueueCandidate {
        id: id.to_string(),
        card: MemorySnapshot::new_card(),
        due: None,
    }
}
