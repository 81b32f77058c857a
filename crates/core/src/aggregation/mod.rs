//! Aggregation module - concurrent fragment fetching, code resolution and assembly.

mod aggregator;
mod task_group;

pub use aggregator::Aggregator;
pub use task_group::TaskGroup;
pub use tokio_util::sync::CancellationToken;
