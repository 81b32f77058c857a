//! Call policies applied by the remote source client.
//!
//! This module provides:
//! - Circuit breaking per downstream identity
//! - Bounded retry with exponential backoff
//! - TTL read-through caching for reference data

mod cache;
mod circuit_breaker;
mod retry;

pub use cache::{CallKey, ReadThroughCache};
pub use circuit_breaker::{
    CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitMetrics, CircuitState, DownstreamId,
};
pub use retry::RetryPolicy;
