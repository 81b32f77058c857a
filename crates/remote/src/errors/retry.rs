/// Classification for retry policy.
///
/// Used by the client to decide whether a failed attempt may be repeated.
///
/// # Behavior Summary
///
/// | Class | Retry? | Record Circuit Breaker Failure? |
/// |-------|--------|--------------------------------|
/// | `Never` | No | No |
/// | `WithBackoff` | Yes, within the attempt bound | Yes |
/// | `CircuitOpen` | No | No (no call was made) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - not found, invalid argument, permission or terminal failure.
    /// The request is fundamentally rejected and retrying won't help.
    Never,

    /// Retry after a backoff pause and record a circuit breaker penalty.
    ///
    /// Used for timeouts and unavailable downstreams. Enough of these inside the
    /// breaker window open the circuit for the downstream.
    WithBackoff,

    /// Circuit breaker is open for this downstream.
    /// Fail fast until the cool-down elapses.
    CircuitOpen,
}
