use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 10.0;

// ========== Card state ==========

/// Emitted as lowercase; parsed through [`FromStr`] so every boundary accepts
/// the same spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum CardState {
    New,
    Learning,
    Review,
    Relearning,
}

impl Default for CardState {
    fn default() -> Self {
        Self::New
    }
}

impl CardState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Review => "review",
            Self::Relearning => "relearning",
        }
    }

    /// Next state for a rating. The graph has no terminal state.
    pub fn transition(self, rating: Rating) -> Self {
        match (self, rating) {
            (Self::New, Rating::Again | Rating::Hard) => Self::Learning,
            (Self::New, Rating::Good | Rating::Easy) => Self::Review,
            (Self::Learning, Rating::Again) => Self::Learning,
            (Self::Learning, _) => Self::Review,
            (Self::Review, Rating::Again) => Self::Relearning,
            (Self::Review, _) => Self::Review,
            (Self::Relearning, Rating::Again) => Self::Relearning,
            (Self::Relearning, _) => Self::Review,
        }
    }

    /// Whether an `Again` in this state counts as a lapse.
    pub fn lapses_on_again(self) -> bool {
        matches!(self, Self::Review | Self::Relearning)
    }

    pub fn is_short_term(self) -> bool {
        matches!(self, Self::Learning | Self::Relearning)
    }
}

impl fmt::Display for CardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateParseError {
    #[error("unknown card state: {0}")]
    Unknown(String),
}

impl FromStr for CardState {
    type Err = StateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "learning" => Ok(Self::Learning),
            // storage layers written before the rename still emit "reviewing"
            "review" | "reviewing" => Ok(Self::Review),
            "relearning" => Ok(Self::Relearning),
            _ => Err(StateParseError::Unknown(s.to_string())),
        }
    }
}

impl TryFrom<String> for CardState {
    type Error = StateParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ========== Rating ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rating {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RatingError {
    #[error("rating must be between 1 and 4, got {0}")]
    OutOfRange(u8),
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn is_success(self) -> bool {
        self != Self::Again
    }

    /// Derives a rating from a binary outcome when the learner did not self-grade.
    pub fn from_response(is_correct: bool, response_time_ms: i64) -> Self {
        if !is_correct {
            return Self::Again;
        }
        if response_time_ms < 2000 {
            Self::Easy
        } else if response_time_ms < 5000 {
            Self::Good
        } else {
            Self::Hard
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Again),
            2 => Ok(Self::Hard),
            3 => Ok(Self::Good),
            4 => Ok(Self::Easy),
            other => Err(RatingError::OutOfRange(other)),
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.value()
    }
}

// ========== Memory snapshot ==========

/// Persisted belief about one learner's retention of one item.
///
/// `retrievability` is cached at `last_review`; use
/// [`MemorySnapshot::live_retrievability`] for any other instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    pub stability: f64,
    pub difficulty: f64,
    pub retrievability: f64,
    pub state: CardState,
    pub last_review: Option<DateTime<Utc>>,
    pub review_count: u32,
    pub lapse_count: u32,
}

impl Default for MemorySnapshot {
    fn default() -> Self {
        Self::new_card()
    }
}

impl MemorySnapshot {
    /// A card that has never been shown.
    pub fn new_card() -> Self {
        Self {
            stability: 1.0,
            difficulty: 5.0,
            retrievability: 1.0,
            state: CardState::New,
            last_review: None,
            review_count: 0,
            lapse_count: 0,
        }
    }

    pub fn is_new(&self) -> bool {
        self.state == CardState::New
    }

    pub fn live_retrievability(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = self
            .last_review
            .map(|last| super::retrievability::elapsed_days(last, now))
            .unwrap_or(0.0);
        super::retrievability::retrievability(self.stability, elapsed)
    }

    /// Checks every data-model invariant, returning the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if !self.stability.is_finite() || self.stability <= 0.0 {
            return Err(format!("stability must be positive, got {}", self.stability));
        }
        if !self.difficulty.is_finite()
            || !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.difficulty)
        {
            return Err(format!(
                "difficulty must be within [{MIN_DIFFICULTY}, {MAX_DIFFICULTY}], got {}",
                self.difficulty
            ));
        }
        if !(0.0..=1.0).contains(&self.retrievability) {
            return Err(format!(
                "retrievability must be within [0, 1], got {}",
                self.retrievability
            ));
        }
        if self.lapse_count > self.review_count {
            return Err(format!(
                "lapse count {} exceeds review count {}",
                self.lapse_count, self.review_count
            ));
        }
        match (self.state, self.last_review) {
            (CardState::New, Some(_)) => {
                return Err("new card must not have a last review".to_string())
            }
            (CardState::New, None) if self.review_count != 0 => {
                return Err("new card must have zero reviews".to_string())
            }
            (state, None) if state != CardState::New => {
                return Err(format!("{state} card is missing its last review"))
            }
            _ => {}
        }
        Ok(())
    }
}

// ========== Schedule result ==========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResult {
    pub next_due: DateTime<Utc>,
    /// Days until `next_due`.
    pub interval: f64,
    pub stability: f64,
    pub difficulty: f64,
    /// Recall probability at review time, before the update.
    pub retrievability: f64,
    pub state: CardState,
    pub review_count: u32,
    pub lapse_count: u32,
    pub last_review: DateTime<Utc>,
    pub elapsed_days: f64,
}

impl ScheduleResult {
    pub fn to_snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            stability: self.stability,
            difficulty: self.difficulty,
            retrievability: self.retrievability,
            state: self.state,
            last_review: Some(self.last_review),
            review_count: self.review_count,
            lapse_count: self.lapse_count,
        }
    }
}
