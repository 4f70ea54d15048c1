pub mod batch;
pub mod config;
pub mod logging;
pub mod memory;
pub mod review;
pub mod zombie;

pub use config::{CoreConfig, LoggingConfig, QueueConfig, SchedulerConfig, ZombieConfig};
pub use memory::{
    is_due, retrievability, schedule, CardState, MemorySnapshot, Rating, ScheduleError,
    ScheduleResult, Scheduler, WeightVector,
};
pub use review::{build_queue, QueueCandidate, ReviewQueue};
pub use zombie::{classify, remediate, score, RemediationDecision, RemediationType, ZombieSignals};
