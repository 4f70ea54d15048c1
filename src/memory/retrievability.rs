//! Power-law forgetting curve shared by the scheduler and the review queue.
//!
//! - Retrievability: R(t, S) = (1 + FACTOR * t / S)^DECAY
//! - Inverse: I(S, r) = S / FACTOR * (r^(1/DECAY) - 1)
//!
//! With these constants R(S, S) = 0.9, so stability reads as "days until
//! recall probability falls to 90%".

use chrono::{DateTime, Utc};

use super::types::{CardState, MemorySnapshot};

pub const DECAY: f64 = -0.5;
pub const FACTOR: f64 = 19.0 / 81.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Probability of recall after `elapsed_days` for a memory of `stability` days.
///
/// Returns 1.0 at zero elapsed time, decreases with elapsed time and increases
/// with stability. Negative elapsed time is treated as zero.
pub fn retrievability(stability: f64, elapsed_days: f64) -> f64 {
    if stability <= 0.0 || !stability.is_finite() {
        return 0.0;
    }
    let elapsed = elapsed_days.max(0.0);
    if elapsed.is_infinite() {
        return 0.0;
    }
    (1.0 + FACTOR * elapsed / stability)
        .powf(DECAY)
        .clamp(0.0, 1.0)
}

/// Days until retrievability falls to `target_retention`.
pub fn interval_for_retention(stability: f64, target_retention: f64) -> f64 {
    stability / FACTOR * (target_retention.powf(1.0 / DECAY) - 1.0)
}

/// Fractional days between two instants, never negative.
pub fn elapsed_days(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = to.signed_duration_since(from).num_milliseconds();
    (millis as f64 / 1000.0 / SECONDS_PER_DAY).max(0.0)
}

/// New cards are always due; otherwise due once `as_of` reaches the stored date.
pub fn is_due(
    card: &MemorySnapshot,
    stored_due_date: Option<DateTime<Utc>>,
    as_of: DateTime<Utc>,
) -> bool {
    if card.state == CardState::New {
        return true;
    }
    match stored_due_date {
        Some(due) => due <= as_of,
        None => false,
    }
}
