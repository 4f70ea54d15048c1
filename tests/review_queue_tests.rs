//! Integration tests for review queue selection and ordering.

use danci_memory_core::config::QueueConfig;
use danci_memory_core::memory::{is_due, retrievability, CardState, MemorySnapshot};
use danci_memory_core::review::{build_queue, QueueCandidate};

mod common;
use common::{days, due_candidate, fixed_now, new_candidate, review_card};

/// Review card whose live retrievability at `fixed_now` equals `target`.
fn card_with_retrievability(target: f64) -> MemorySnapshot {
    let stability = 10.0;
    let elapsed = danci_memory_core::memory::interval_for_retention(stability, target);
    review_card(stability, 5.0, elapsed)
}

fn many_due(count: usize) -> Vec<QueueCandidate> {
    (0..count)
        .map(|i| due_candidate(&format!("card-{i:03}"), review_card(5.0, 5.0, 6.0), i as f64 * 0.1))
        .collect()
}

#[test]
fn lower_retrievability_wins_overdue_tie() {
    let a = due_candidate("A", card_with_retrievability(0.7), 5.0);
    let b = due_candidate("B", card_with_retrievability(0.5), 5.0);
    let queue = build_queue(&[a, b], fixed_now(), None, &QueueConfig::default());

    let ids: Vec<&str> = queue.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["B", "A"]);
    assert!((queue.items[0].retrievability - 0.5).abs() < 1e-3);
    assert!((queue.items[1].priority - (5.0 * 10.0 + 0.3 * 5.0)).abs() < 1e-3);
}

#[test]
fn limit_is_capped_at_fifty() {
    let candidates = many_due(60);
    let queue = build_queue(&candidates, fixed_now(), Some(100), &QueueConfig::default());
    assert_eq!(queue.items.len(), 50);
    assert_eq!(queue.meta.total, 60);
    assert_eq!(queue.meta.limit, 50);
}

#[test]
fn missing_limit_defaults_to_twenty() {
    let candidates = many_due(30);
    let queue = build_queue(&candidates, fixed_now(), None, &QueueConfig::default());
    assert_eq!(queue.items.len(), 20);
    assert_eq!(queue.meta.total, 30);
    assert_eq!(queue.meta.due_count, 30);
    assert_eq!(queue.meta.new_count, 0);
}

#[test]
fn meta_counts_cover_untruncated_set() {
    let mut candidates = many_due(4);
    candidates.extend((0..3).map(|i| new_candidate(&format!("new-{i}"))));
    let queue = build_queue(&candidates, fixed_now(), Some(2), &QueueConfig::default());
    assert_eq!(queue.items.len(), 2);
    assert_eq!(queue.meta.total, 7);
    assert_eq!(queue.meta.new_count, 3);
    assert_eq!(queue.meta.due_count, 4);
}

#[test]
fn repeated_builds_are_identical() {
    let mut candidates = many_due(25);
    candidates.push(new_candidate("n-1"));
    candidates.push(new_candidate("n-0"));
    candidates.reverse();
    let first = build_queue(&candidates, fixed_now(), Some(50), &QueueConfig::default());
    candidates.reverse();
    let second = build_queue(&candidates, fixed_now(), Some(50), &QueueConfig::default());
    assert_eq!(first, second);
}

#[test]
fn new_cards_rank_by_bonus_only() {
    let queue = build_queue(
        &[
            new_candidate("fresh"),
            due_candidate("barely", review_card(30.0, 5.0, 30.0), 0.0),
        ],
        fixed_now(),
        None,
        &QueueConfig::default(),
    );
    let fresh = queue.items.iter().find(|i| i.id == "fresh").unwrap();
    assert_eq!(fresh.state, CardState::New);
    assert_eq!(fresh.overdue_days, 0.0);
    assert_eq!(fresh.retrievability, 1.0);
    assert_eq!(fresh.priority, 1.0);

    let barely = queue.items.iter().find(|i| i.id == "barely").unwrap();
    let expected_r = retrievability(30.0, 30.0);
    assert!((barely.priority - (1.0 - expected_r) * 5.0).abs() < 1e-9);
}

#[test]
fn exact_due_instant_is_included() {
    let on_time = due_candidate("on-time", review_card(4.0, 5.0, 4.0), 0.0);
    let mut early = due_candidate("early", review_card(4.0, 5.0, 4.0), 0.0);
    early.due = Some(fixed_now() + days(0.001));
    let queue = build_queue(&[on_time, early], fixed_now(), None, &QueueConfig::default());
    assert_eq!(queue.meta.total, 1);
    assert_eq!(queue.items[0].id, "on-time");
}

#[test]
fn due_boundary_is_inclusive() {
    let card = review_card(4.0, 5.0, 4.0);
    let due = fixed_now();
    assert!(is_due(&card, Some(due), due));
    assert!(!is_due(&card, Some(due), due - days(0.000_001)));
    assert!(!is_due(&card, None, due));

    let fresh = MemorySnapshot::new_card();
    assert!(is_due(&fresh, None, due - days(3650.0)));
    assert!(is_due(&fresh, Some(due + days(30.0)), due));
}

#[test]
fn invalid_snapshots_are_rejected_not_ranked() {
    let broken = MemorySnapshot {
        stability: -5.0,
        difficulty: 42.0,
        ..review_card(4.0, 5.0, 4.0)
    };
    let orphan = MemorySnapshot {
        last_review: None,
        ..review_card(4.0, 5.0, 4.0)
    };
    let candidates = vec![
        due_candidate("broken", broken, 3.0),
        due_candidate("orphan", orphan, 3.0),
        due_candidate("healthy", review_card(4.0, 5.0, 4.0), 1.0),
    ];
    let queue = build_queue(&candidates, fixed_now(), None, &QueueConfig::default());

    let ids: Vec<&str> = queue.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["healthy"]);
    assert_eq!(queue.meta.rejected, 2);
    assert_eq!(queue.meta.total, 1);
    assert_eq!(queue.meta.due_count, 1);
}
