//! Campus Remote Source Crate
//!
//! Resilience layer used for every call that leaves the process: remote
//! profile sources, the codelist service and the local store alike.
//!
//! # Overview
//!
//! - Mandatory per-attempt deadline
//! - Bounded retry with exponential backoff, only for transient failures
//! - Per-downstream circuit breaker with a single half-open probe
//! - Optional TTL read-through cache for reference data
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |     caller       |
//! +------------------+
//!          |
//!          v
//! +------------------+     +------------------+
//! | RemoteSourceClient| --> | ReadThroughCache |  (hit returns early)
//! +------------------+     +------------------+
//!          |
//!          v
//! +------------------+
//! |  CircuitBreaker  |  (open circuit returns Unavailable)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! | call + deadline  |  (retried with backoff while transient)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |  FetchOutcome    |  Success | NotFound | Unavailable | Invalid
//! +------------------+
//! ```

mod client;
pub mod config;
pub mod errors;
pub mod outcome;
pub mod policy;

pub use client::{RemoteSourceClient, SourceClientBuilder};
pub use config::SourceClientConfig;
pub use errors::{RetryClass, SourceError};
pub use outcome::FetchOutcome;
pub use policy::{
    CallKey, CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitMetrics, CircuitState,
    DownstreamId, ReadThroughCache, RetryPolicy,
};
