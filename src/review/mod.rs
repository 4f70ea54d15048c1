pub mod queue;

pub use queue::{
    build_queue, effective_limit, priority, QueueCandidate, QueueItem, QueueMeta, ReviewQueue,
};
