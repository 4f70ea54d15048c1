use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::memory::{IntervalBounds, ScheduleError, Scheduler, WeightVector, MAX_INTERVAL_DAYS};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    pub weights: WeightVector,
    pub target_retention: f64,
    pub maximum_interval_days: f64,
    pub relearning_max_interval_days: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let bounds = IntervalBounds::default();
        Self {
            weights: WeightVector::default(),
            target_retention: 0.9,
            maximum_interval_days: bounds.maximum_interval_days,
            relearning_max_interval_days: bounds.relearning_max_interval_days,
        }
    }
}

impl SchedulerConfig {
    pub fn bounds(&self) -> IntervalBounds {
        IntervalBounds {
            maximum_interval_days: self.maximum_interval_days,
            relearning_max_interval_days: self.relearning_max_interval_days,
        }
    }

    pub fn scheduler(&self) -> Result<Scheduler, ScheduleError> {
        Scheduler::with_bounds(self.weights, self.target_retention, self.bounds())
    }

    /// Per-learner override of the platform retention target.
    pub fn scheduler_for_retention(&self, target_retention: f64) -> Result<Scheduler, ScheduleError> {
        Scheduler::with_bounds(self.weights, target_retention, self.bounds())
    }
}

/// Upper bound accepted for `REVIEW_QUEUE_MAX_LIMIT`.
pub const QUEUE_LIMIT_CEILING: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZombieConfig {
    pub threshold: f64,
    /// Reviews required before a pair is evaluated at all.
    pub min_reviews: u32,
}

impl Default for ZombieConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_reviews: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `info` or `danci_memory_core=debug`.
    pub level: String,
    /// Daily-rolling log files are written here when set.
    pub file_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreConfig {
    pub logging: LoggingConfig,
    pub scheduler: SchedulerConfig,
    pub queue: QueueConfig,
    pub zombie: ZombieConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            scheduler: SchedulerConfig::default(),
            queue: QueueConfig::default(),
            zombie: ZombieConfig::default(),
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unparseable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(level) = lookup("RUST_LOG") {
            config.logging.level = level;
        }
        let file_logs = lookup("ENABLE_FILE_LOGS").is_some_and(|v| v == "true" || v == "1");
        if file_logs {
            let dir = lookup("LOG_DIR").unwrap_or_else(|| "./logs".to_string());
            config.logging.file_dir = Some(PathBuf::from(dir));
        }
        if let Some(val) = parse(&lookup, "REVIEW_TARGET_RETENTION") {
            config.scheduler.target_retention = val;
        }
        if let Some(val) = parse(&lookup, "REVIEW_MAX_INTERVAL_DAYS") {
            config.scheduler.maximum_interval_days = val;
        }
        if let Some(val) = parse(&lookup, "REVIEW_RELEARNING_MAX_INTERVAL_DAYS") {
            config.scheduler.relearning_max_interval_days = val;
        }
        if let Some(weights) = lookup("REVIEW_WEIGHTS").and_then(|raw| WeightVector::parse_list(&raw)) {
            config.scheduler.weights = weights;
        }
        if let Some(val) = parse(&lookup, "REVIEW_QUEUE_DEFAULT_LIMIT") {
            config.queue.default_limit = val;
        }
        if let Some(val) = parse(&lookup, "REVIEW_QUEUE_MAX_LIMIT") {
            config.queue.max_limit = val;
        }
        if let Some(val) = parse(&lookup, "ZOMBIE_THRESHOLD") {
            config.zombie.threshold = val;
        }
        if let Some(val) = parse(&lookup, "ZOMBIE_MIN_REVIEWS") {
            config.zombie.min_reviews = val;
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        if !(s.target_retention > 0.0 && s.target_retention <= 1.0) {
            return Err(invalid("REVIEW_TARGET_RETENTION", s.target_retention));
        }
        if !(1.0..=MAX_INTERVAL_DAYS).contains(&s.maximum_interval_days) {
            return Err(invalid("REVIEW_MAX_INTERVAL_DAYS", s.maximum_interval_days));
        }
        if !(s.relearning_max_interval_days >= 1.0
            && s.relearning_max_interval_days <= s.maximum_interval_days)
        {
            return Err(invalid(
                "REVIEW_RELEARNING_MAX_INTERVAL_DAYS",
                s.relearning_max_interval_days,
            ));
        }
        if !s.weights.is_valid() {
            return Err(invalid("REVIEW_WEIGHTS", "non-finite weight"));
        }
        if self.queue.max_limit == 0 || self.queue.max_limit > QUEUE_LIMIT_CEILING {
            return Err(invalid("REVIEW_QUEUE_MAX_LIMIT", self.queue.max_limit));
        }
        if self.queue.default_limit == 0 || self.queue.default_limit > self.queue.max_limit {
            return Err(invalid("REVIEW_QUEUE_DEFAULT_LIMIT", self.queue.default_limit));
        }
        if !(0.0..=1.0).contains(&self.zombie.threshold) {
            return Err(invalid("ZOMBIE_THRESHOLD", self.zombie.threshold));
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse::<T>().ok())
}

fn invalid(key: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}
