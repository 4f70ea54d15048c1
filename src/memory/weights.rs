use serde::{Deserialize, Serialize};

pub const WEIGHT_COUNT: usize = 19;

/// Coefficients of the stability/difficulty model.
///
/// Stored by name so indices cannot be transposed; the flat 19-element
/// array only exists at the serialization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct WeightVector {
    // w0-w3: initial stability per rating
    pub initial_stability_again: f64,
    pub initial_stability_hard: f64,
    pub initial_stability_good: f64,
    pub initial_stability_easy: f64,
    // w4-w7: difficulty
    pub initial_difficulty_base: f64,
    pub initial_difficulty_rating_scale: f64,
    pub difficulty_delta: f64,
    pub difficulty_mean_reversion: f64,
    // w8-w10: recall stability growth
    pub recall_growth: f64,
    pub recall_stability_decay: f64,
    pub recall_retrievability_gain: f64,
    // w11-w14: post-lapse stability
    pub forget_base: f64,
    pub forget_difficulty_exponent: f64,
    pub forget_stability_exponent: f64,
    pub forget_retrievability_gain: f64,
    // w15-w16
    pub hard_penalty: f64,
    pub easy_bonus: f64,
    // w17-w18: same-day reviews
    pub short_term_scale: f64,
    pub short_term_offset: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        Self::from_array([
            0.40255, 1.18385, 3.173, 15.69105, // w0-w3
            7.1949, 0.5345, 1.4604, 0.0046, // w4-w7
            1.54575, 0.1192, 1.01925, // w8-w10
            1.9395, 0.11, 0.29605, 2.2698, // w11-w14
            0.2315, 2.9898, // w15-w16
            0.51655, 0.6621, // w17-w18
        ])
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("weight vector must have {expected} values, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("weight w{index} is not a finite number")]
    NonFinite { index: usize },
}

impl WeightVector {
    pub fn from_array(w: [f64; WEIGHT_COUNT]) -> Self {
        Self {
            initial_stability_again: w[0],
            initial_stability_hard: w[1],
            initial_stability_good: w[2],
            initial_stability_easy: w[3],
            initial_difficulty_base: w[4],
            initial_difficulty_rating_scale: w[5],
            difficulty_delta: w[6],
            difficulty_mean_reversion: w[7],
            recall_growth: w[8],
            recall_stability_decay: w[9],
            recall_retrievability_gain: w[10],
            forget_base: w[11],
            forget_difficulty_exponent: w[12],
            forget_stability_exponent: w[13],
            forget_retrievability_gain: w[14],
            hard_penalty: w[15],
            easy_bonus: w[16],
            short_term_scale: w[17],
            short_term_offset: w[18],
        }
    }

    pub fn to_array(&self) -> [f64; WEIGHT_COUNT] {
        [
            self.initial_stability_again,
            self.initial_stability_hard,
            self.initial_stability_good,
            self.initial_stability_easy,
            self.initial_difficulty_base,
            self.initial_difficulty_rating_scale,
            self.difficulty_delta,
            self.difficulty_mean_reversion,
            self.recall_growth,
            self.recall_stability_decay,
            self.recall_retrievability_gain,
            self.forget_base,
            self.forget_difficulty_exponent,
            self.forget_stability_exponent,
            self.forget_retrievability_gain,
            self.hard_penalty,
            self.easy_bonus,
            self.short_term_scale,
            self.short_term_offset,
        ]
    }

    pub fn from_slice(values: &[f64]) -> Result<Self, WeightError> {
        let array: [f64; WEIGHT_COUNT] = values.try_into().map_err(|_| WeightError::Length {
            expected: WEIGHT_COUNT,
            actual: values.len(),
        })?;
        if let Some(index) = array.iter().position(|w| !w.is_finite()) {
            return Err(WeightError::NonFinite { index });
        }
        Ok(Self::from_array(array))
    }

    /// Parses a comma-separated list, as found in environment overrides.
    pub fn parse_list(raw: &str) -> Option<Self> {
        let values: Option<Vec<f64>> = raw
            .split(',')
            .map(|part| part.trim().parse::<f64>().ok())
            .collect();
        Self::from_slice(&values?).ok()
    }

    pub fn is_valid(&self) -> bool {
        self.to_array().iter().all(|w| w.is_finite())
    }
}

impl TryFrom<Vec<f64>> for WeightVector {
    type Error = WeightError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_slice(&values)
    }
}

impl From<WeightVector> for Vec<f64> {
    fn from(weights: WeightVector) -> Vec<f64> {
        weights.to_array().to_vec()
    }
}
