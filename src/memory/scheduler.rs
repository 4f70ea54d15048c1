//! Difficulty/stability/retrievability scheduler.
//!
//! Updates one memory snapshot for one rating and derives the next due date
//! by inverting the forgetting curve at the target retention. No clock reads,
//! no I/O: identical inputs always give bit-identical results.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::retrievability::{elapsed_days, interval_for_retention, retrievability};
use super::types::{MemorySnapshot, Rating, ScheduleResult, MAX_DIFFICULTY, MIN_DIFFICULTY};
use super::weights::WeightVector;

pub const MIN_STABILITY: f64 = 0.01;
pub const MAX_STABILITY: f64 = 36500.0;
/// Largest interval a scheduler may be configured with.
pub const MAX_INTERVAL_DAYS: f64 = 36500.0;

/// Reviews closer together than this in a short-term state use the same-day formula.
const SHORT_TERM_WINDOW_DAYS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalBounds {
    pub maximum_interval_days: f64,
    /// Ceiling for cards landing in Learning or Relearning.
    pub relearning_max_interval_days: f64,
}

impl Default for IntervalBounds {
    fn default() -> Self {
        Self {
            maximum_interval_days: MAX_INTERVAL_DAYS,
            relearning_max_interval_days: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("target retention must be within (0, 1], got {0}")]
    InvalidTargetRetention(f64),
    #[error("invalid interval bounds: {0}")]
    InvalidBounds(String),
    #[error("weight vector contains non-finite values")]
    InvalidWeights,
    #[error("invalid memory snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("next due date is out of range: {interval} days after {now}")]
    DueDateOutOfRange { now: DateTime<Utc>, interval: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scheduler {
    weights: WeightVector,
    target_retention: f64,
    bounds: IntervalBounds,
}

impl Scheduler {
    pub fn new(weights: WeightVector, target_retention: f64) -> Result<Self, ScheduleError> {
        Self::with_bounds(weights, target_retention, IntervalBounds::default())
    }

    pub fn with_bounds(
        weights: WeightVector,
        target_retention: f64,
        bounds: IntervalBounds,
    ) -> Result<Self, ScheduleError> {
        if !(target_retention > 0.0 && target_retention <= 1.0) {
            return Err(ScheduleError::InvalidTargetRetention(target_retention));
        }
        if !weights.is_valid() {
            return Err(ScheduleError::InvalidWeights);
        }
        if !(1.0..=MAX_INTERVAL_DAYS).contains(&bounds.maximum_interval_days) {
            return Err(ScheduleError::InvalidBounds(format!(
                "maximum interval must be within [1, {MAX_INTERVAL_DAYS}], got {}",
                bounds.maximum_interval_days
            )));
        }
        if !(bounds.relearning_max_interval_days >= 1.0
            && bounds.relearning_max_interval_days <= bounds.maximum_interval_days)
        {
            return Err(ScheduleError::InvalidBounds(format!(
                "relearning interval ceiling must be within [1, {}], got {}",
                bounds.maximum_interval_days, bounds.relearning_max_interval_days
            )));
        }
        Ok(Self {
            weights,
            target_retention,
            bounds,
        })
    }

    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    pub fn target_retention(&self) -> f64 {
        self.target_retention
    }

    pub fn bounds(&self) -> IntervalBounds {
        self.bounds
    }

    pub fn schedule(
        &self,
        card: &MemorySnapshot,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<ScheduleResult, ScheduleError> {
        card.validate().map_err(ScheduleError::InvalidSnapshot)?;
        let w = &self.weights;

        if card.is_new() {
            let stability = clamp_stability(initial_stability(w, rating));
            let difficulty = initial_difficulty(w, rating);
            return self.finish(card, rating, now, stability, difficulty, 1.0, 0.0);
        }

        let elapsed = card
            .last_review
            .map(|last| elapsed_days(last, now))
            .unwrap_or(0.0);
        let r = retrievability(card.stability, elapsed);
        let difficulty = next_difficulty(w, card.difficulty, rating);

        let stability = if card.state.is_short_term() && elapsed < SHORT_TERM_WINDOW_DAYS {
            short_term_stability(w, card.stability, rating)
        } else if rating == Rating::Again {
            next_forget_stability(w, card.difficulty, card.stability, r)
        } else {
            next_recall_stability(w, card.difficulty, card.stability, r, rating)
        };

        self.finish(card, rating, now, stability, difficulty, r, elapsed)
    }

    /// Outcome of every rating, e.g. for showing intervals on answer buttons.
    pub fn preview(
        &self,
        card: &MemorySnapshot,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Rating, ScheduleResult)>, ScheduleError> {
        Rating::ALL
            .iter()
            .map(|&rating| self.schedule(card, rating, now).map(|result| (rating, result)))
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        card: &MemorySnapshot,
        rating: Rating,
        now: DateTime<Utc>,
        stability: f64,
        difficulty: f64,
        retrievability: f64,
        elapsed_days: f64,
    ) -> Result<ScheduleResult, ScheduleError> {
        let state = card.state.transition(rating);
        let lapse_count = if rating == Rating::Again && card.state.lapses_on_again() {
            card.lapse_count.saturating_add(1)
        } else {
            card.lapse_count
        };

        let ceiling = if state.is_short_term() {
            self.bounds.relearning_max_interval_days
        } else {
            self.bounds.maximum_interval_days
        };
        let interval = next_interval(stability, self.target_retention, ceiling);
        let next_due = now
            .checked_add_signed(Duration::days(interval as i64))
            .ok_or(ScheduleError::DueDateOutOfRange { now, interval })?;

        Ok(ScheduleResult {
            next_due,
            interval,
            stability,
            difficulty,
            retrievability,
            state,
            review_count: card.review_count.saturating_add(1),
            lapse_count,
            last_review: now,
            elapsed_days,
        })
    }
}

/// Schedules with default interval bounds.
pub fn schedule(
    card: &MemorySnapshot,
    rating: Rating,
    now: DateTime<Utc>,
    weights: &WeightVector,
    target_retention: f64,
) -> Result<ScheduleResult, ScheduleError> {
    Scheduler::new(*weights, target_retention)?.schedule(card, rating, now)
}

fn rating_value(rating: Rating) -> f64 {
    f64::from(rating.value())
}

fn clamp_stability(s: f64) -> f64 {
    if s.is_nan() {
        return MIN_STABILITY;
    }
    s.clamp(MIN_STABILITY, MAX_STABILITY)
}

fn clamp_difficulty(d: f64) -> f64 {
    if d.is_nan() {
        return MAX_DIFFICULTY;
    }
    d.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

fn initial_stability(w: &WeightVector, rating: Rating) -> f64 {
    match rating {
        Rating::Again => w.initial_stability_again,
        Rating::Hard => w.initial_stability_hard,
        Rating::Good => w.initial_stability_good,
        Rating::Easy => w.initial_stability_easy,
    }
}

fn initial_difficulty(w: &WeightVector, rating: Rating) -> f64 {
    let g = rating_value(rating);
    clamp_difficulty(
        w.initial_difficulty_base - (w.initial_difficulty_rating_scale * (g - 1.0)).exp() + 1.0,
    )
}

fn next_difficulty(w: &WeightVector, d: f64, rating: Rating) -> f64 {
    let delta = -w.difficulty_delta * (rating_value(rating) - 3.0);
    // linear damping: steps shrink as difficulty approaches 10
    let damped = d + delta * (MAX_DIFFICULTY - d) / 9.0;
    let target = initial_difficulty(w, Rating::Easy);
    clamp_difficulty(
        w.difficulty_mean_reversion * target + (1.0 - w.difficulty_mean_reversion) * damped,
    )
}

fn next_recall_stability(w: &WeightVector, d: f64, s: f64, r: f64, rating: Rating) -> f64 {
    let hard_penalty = if rating == Rating::Hard {
        w.hard_penalty
    } else {
        1.0
    };
    let easy_bonus = if rating == Rating::Easy {
        w.easy_bonus
    } else {
        1.0
    };

    let new_s = s
        * (1.0
            + w.recall_growth.exp()
                * (11.0 - d)
                * s.powf(-w.recall_stability_decay)
                * ((1.0 - r) * w.recall_retrievability_gain).exp_m1()
                * hard_penalty
                * easy_bonus);
    clamp_stability(new_s)
}

fn next_forget_stability(w: &WeightVector, d: f64, s: f64, r: f64) -> f64 {
    let new_s = w.forget_base
        * d.powf(-w.forget_difficulty_exponent)
        * ((s + 1.0).powf(w.forget_stability_exponent) - 1.0)
        * ((1.0 - r) * w.forget_retrievability_gain).exp();
    clamp_stability(new_s.min(s))
}

fn short_term_stability(w: &WeightVector, s: f64, rating: Rating) -> f64 {
    let exponent = w.short_term_scale * (rating_value(rating) - 3.0 + w.short_term_offset);
    clamp_stability(s * exponent.exp())
}

fn next_interval(stability: f64, target_retention: f64, ceiling: f64) -> f64 {
    let interval = interval_for_retention(stability, target_retention).round();
    if interval.is_nan() {
        return 1.0;
    }
    interval.clamp(1.0, ceiling)
}
