//! Resilient wrapper around a single downstream.
//!
//! Every call goes through the same pipeline:
//!
//! 1. Read-through cache lookup (only when the client was built with a cache)
//! 2. Circuit breaker permit
//! 3. The call itself, bounded by the per-attempt deadline
//! 4. Bounded retry with exponential backoff for transient failures
//!
//! The result is always a [`FetchOutcome`]; transport errors never escape as panics.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::SourceClientConfig;
use crate::errors::SourceError;
use crate::outcome::FetchOutcome;
use crate::policy::{CallKey, CircuitBreaker, DownstreamId, ReadThroughCache, RetryPolicy};

/// Client for one downstream with deadline, retry, circuit breaking and optional caching.
///
/// Cheap to clone; the breaker and cache are shared between clones.
pub struct RemoteSourceClient<T> {
    downstream: DownstreamId,
    deadline: Duration,
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
    cache: Option<Arc<ReadThroughCache<T>>>,
}

impl<T> Clone for RemoteSourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            downstream: self.downstream.clone(),
            deadline: self.deadline,
            retry: self.retry.clone(),
            breaker: Arc::clone(&self.breaker),
            cache: self.cache.clone(),
        }
    }
}

impl<T: Clone> RemoteSourceClient<T> {
    pub fn builder(downstream: impl Into<DownstreamId>) -> SourceClientBuilder<T> {
        SourceClientBuilder::new(downstream)
    }

    pub fn downstream(&self) -> &DownstreamId {
        &self.downstream
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn cache(&self) -> Option<&Arc<ReadThroughCache<T>>> {
        self.cache.as_ref()
    }

    /// Run `call` against the downstream and return its terminal outcome.
    ///
    /// `call` is invoked once per attempt. Only `Unavailable` outcomes caused by a
    /// timeout or an unavailable downstream are retried; `NotFound` and `Invalid`
    /// return immediately. When the circuit is open no call is made at all.
    /// Successful values are written to the cache under `key`.
    pub async fn invoke<F, Fut>(&self, key: CallKey, mut call: F) -> FetchOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FetchOutcome<T>>,
    {
        if let Some(cache) = &self.cache {
            if let Some(value) = cache.get(&key) {
                debug!("'{}' cache hit for {:?}", self.downstream, key);
                return FetchOutcome::Success(value);
            }
        }

        let attempts = self.retry.attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;

            let Some(permit) = self.breaker.try_acquire(&self.downstream) else {
                debug!(
                    "'{}' circuit is open, skipping {}",
                    self.downstream, key.operation
                );
                return FetchOutcome::Unavailable(SourceError::CircuitOpen {
                    downstream: self.downstream.to_string(),
                });
            };

            let outcome = match tokio::time::timeout(self.deadline, call()).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    debug!(
                        "'{}' {} exceeded its {:?} deadline",
                        self.downstream, key.operation, self.deadline
                    );
                    FetchOutcome::Unavailable(SourceError::Timeout {
                        downstream: self.downstream.to_string(),
                    })
                }
            };

            match outcome {
                FetchOutcome::Success(value) => {
                    permit.record_success();
                    if let Some(cache) = &self.cache {
                        cache.insert(key, value.clone());
                    }
                    return FetchOutcome::Success(value);
                }
                // The downstream answered; a semantic result says nothing about its health.
                FetchOutcome::NotFound | FetchOutcome::Invalid(_) => {
                    permit.record_success();
                    debug!(
                        "'{}' {} returned {}",
                        self.downstream,
                        key.operation,
                        outcome.label()
                    );
                    return outcome;
                }
                FetchOutcome::Unavailable(_) if outcome.is_retryable() => {
                    permit.record_failure();
                    if attempt >= attempts {
                        warn!(
                            "'{}' {} still unavailable after {} attempt(s): {:?}",
                            self.downstream,
                            key.operation,
                            attempt,
                            outcome.cause()
                        );
                        return outcome;
                    }

                    let pause = self.retry.backoff(attempt);
                    info!(
                        "'{}' {} attempt {}/{} failed, retrying in {:?}",
                        self.downstream, key.operation, attempt, attempts, pause
                    );
                    tokio::time::sleep(pause).await;
                }
                FetchOutcome::Unavailable(_) => {
                    // Permit dropped unsettled; a probe slot is handed back.
                    return outcome;
                }
            }
        }
    }
}

/// Builder for [`RemoteSourceClient`].
pub struct SourceClientBuilder<T> {
    downstream: DownstreamId,
    deadline: Duration,
    retry: RetryPolicy,
    breaker: Option<Arc<CircuitBreaker>>,
    cache: Option<Arc<ReadThroughCache<T>>>,
}

impl<T: Clone> SourceClientBuilder<T> {
    pub fn new(downstream: impl Into<DownstreamId>) -> Self {
        let defaults = SourceClientConfig::default();
        Self {
            downstream: downstream.into(),
            deadline: defaults.deadline,
            retry: defaults.retry,
            breaker: None,
            cache: None,
        }
    }

    /// Apply deadline and retry settings from a config.
    ///
    /// The breaker and cache are shared objects and are set separately.
    pub fn with_config(mut self, config: &SourceClientConfig) -> Self {
        self.deadline = config.deadline;
        self.retry = config.retry.clone();
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn cache(mut self, cache: Arc<ReadThroughCache<T>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> RemoteSourceClient<T> {
        RemoteSourceClient {
            downstream: self.downstream,
            deadline: self.deadline,
            retry: self.retry,
            breaker: self
                .breaker
                .unwrap_or_else(|| Arc::new(CircuitBreaker::new())),
            cache: self.cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{CircuitBreakerConfig, CircuitState};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        }
    }

    fn key() -> CallKey {
        CallKey::new("student.get", "42", "cs")
    }

    fn unavailable() -> SourceError {
        SourceError::Unavailable {
            downstream: "student".into(),
            message: "connection reset".into(),
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let client = RemoteSourceClient::<u32>::builder("student").build();
        let calls = AtomicUsize::new(0);

        let outcome = client
            .invoke(key(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                FetchOutcome::Success(7)
            })
            .await;

        assert_eq!(outcome, FetchOutcome::Success(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_until_exhausted() {
        let client = RemoteSourceClient::<u32>::builder("student")
            .retry(fast_retry(3))
            .build();
        let calls = AtomicUsize::new(0);

        let outcome = client
            .invoke(key(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                FetchOutcome::Unavailable(unavailable())
            })
            .await;

        assert_eq!(outcome, FetchOutcome::Unavailable(unavailable()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_recovers_on_second_attempt() {
        let client = RemoteSourceClient::<u32>::builder("student")
            .retry(fast_retry(3))
            .build();
        let calls = AtomicUsize::new(0);

        let outcome = client
            .invoke(key(), || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    FetchOutcome::Unavailable(unavailable())
                } else {
                    FetchOutcome::Success(1)
                }
            })
            .await;

        assert_eq!(outcome, FetchOutcome::Success(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_and_invalid_are_not_retried() {
        let client = RemoteSourceClient::<u32>::builder("student")
            .retry(fast_retry(3))
            .build();
        let calls = AtomicUsize::new(0);

        let outcome = client
            .invoke(key(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                FetchOutcome::NotFound
            })
            .await;
        assert_eq!(outcome, FetchOutcome::NotFound);

        let denied = SourceError::PermissionDenied("not your record".into());
        let outcome = client
            .invoke(key(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                FetchOutcome::Invalid(denied.clone())
            })
            .await;
        assert_eq!(outcome, FetchOutcome::Invalid(denied.clone()));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(client.circuit_breaker().failure_count(client.downstream()), 0);
    }

    #[tokio::test]
    async fn test_deadline_turns_into_timeout() {
        let client = RemoteSourceClient::<u32>::builder("slow")
            .deadline(Duration::from_millis(10))
            .retry(RetryPolicy::none())
            .build();

        let outcome = client
            .invoke(key(), || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                FetchOutcome::Success(1)
            })
            .await;

        assert_eq!(
            outcome,
            FetchOutcome::Unavailable(SourceError::Timeout {
                downstream: "slow".into()
            })
        );
    }

    #[tokio::test]
    async fn test_open_circuit_skips_the_call() {
        let breaker = Arc::new(CircuitBreaker::with_config(CircuitBreakerConfig {
            failure_threshold: 2,
            failure_rate_threshold: 0.5,
            window: Duration::from_secs(60),
            cool_down: Duration::from_secs(60),
        }));
        let client = RemoteSourceClient::<u32>::builder("student")
            .retry(fast_retry(2))
            .circuit_breaker(Arc::clone(&breaker))
            .build();
        let calls = AtomicUsize::new(0);

        let _ = client
            .invoke(key(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                FetchOutcome::Unavailable(unavailable())
            })
            .await;
        assert_eq!(breaker.state(client.downstream()), CircuitState::Open);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let outcome = client
            .invoke(key(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                FetchOutcome::Success(1)
            })
            .await;

        assert_eq!(
            outcome,
            FetchOutcome::Unavailable(SourceError::CircuitOpen {
                downstream: "student".into()
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_the_call() {
        let cache = Arc::new(ReadThroughCache::new(Duration::from_secs(60)));
        let client = RemoteSourceClient::<String>::builder("codelist")
            .cache(Arc::clone(&cache))
            .build();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let outcome = client
                .invoke(CallKey::new("codelist.resolve", "POHLAVI:M", "en"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    FetchOutcome::Success("Male".to_string())
                })
                .await;
            assert_eq!(outcome, FetchOutcome::Success("Male".to_string()));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = Arc::new(ReadThroughCache::<String>::new(Duration::from_secs(60)));
        let client = RemoteSourceClient::builder("codelist")
            .retry(RetryPolicy::none())
            .cache(Arc::clone(&cache))
            .build();

        let outcome = client
            .invoke(key(), || async { FetchOutcome::NotFound })
            .await;

        assert_eq!(outcome, FetchOutcome::NotFound);
        assert!(cache.is_empty());
    }
}
