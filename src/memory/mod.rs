//! Memory layer - per-item memory model and spaced-repetition scheduling
//!
//! Contains:
//! - MemorySnapshot / CardState state machine
//! - WeightVector - named model coefficients
//! - Retrievability - forgetting curve, its inverse and the due check
//! - Scheduler - stability/difficulty update and next due date

pub mod retrievability;
pub mod scheduler;
pub mod types;
pub mod weights;

pub use retrievability::{elapsed_days, interval_for_retention, is_due, retrievability};
pub use scheduler::{schedule, IntervalBounds, ScheduleError, Scheduler, MAX_INTERVAL_DAYS};
pub use types::{
    CardState, MemorySnapshot, Rating, RatingError, ScheduleResult, StateParseError,
};
pub use weights::{WeightError, WeightVector, WEIGHT_COUNT};
