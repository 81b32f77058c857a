//! All-or-nothing fork/join over a [`JoinSet`].
//!
//! A group either yields every task's value or exactly one error. Whatever
//! ends the join early (a failed task, the deadline, or cancellation) aborts
//! the remaining tasks and waits for them to stop before returning.

use std::future::Future;

use log::{debug, error};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::{Error, Result};

enum Step<T> {
    Joined(Option<std::result::Result<Result<T>, JoinError>>),
    Cancelled,
    DeadlineExceeded,
}

pub struct TaskGroup<T> {
    name: &'static str,
    tasks: JoinSet<Result<T>>,
}

impl<T: Send + 'static> TaskGroup<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            tasks: JoinSet::new(),
        }
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every task, failing fast on the first error.
    ///
    /// Results are returned in completion order.
    pub async fn join_all(
        mut self,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>> {
        let mut results = Vec::with_capacity(self.tasks.len());

        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Step::DeadlineExceeded,
                joined = self.tasks.join_next() => Step::Joined(joined),
            };

            let failure = match step {
                Step::Joined(None) => return Ok(results),
                Step::Joined(Some(Ok(Ok(value)))) => {
                    results.push(value);
                    continue;
                }
                Step::Joined(Some(Ok(Err(e)))) => e,
                Step::Joined(Some(Err(join_error))) => {
                    error!("'{}' task failed: {}", self.name, join_error);
                    Error::Internal(format!("{} task did not complete", self.name))
                }
                Step::Cancelled => Error::Cancelled,
                Step::DeadlineExceeded => Error::DeadlineExceeded,
            };

            self.shutdown().await;
            return Err(failure);
        }
    }

    /// Abort every remaining task and wait until all of them have stopped.
    async fn shutdown(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        debug!(
            "Aborting {} remaining '{}' task(s)",
            self.tasks.len(),
            self.name
        );
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn far_future() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[tokio::test]
    async fn test_collects_every_result() {
        let mut group = TaskGroup::new("test");
        for i in 0..4u32 {
            group.spawn(async move { Ok::<u32, Error>(i) });
        }

        let mut values = group
            .join_all(far_future(), &CancellationToken::new())
            .await
            .unwrap();
        values.sort();

        assert_eq!(values, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_group_joins_immediately() {
        let group = TaskGroup::<()>::new("empty");
        let values = group
            .join_all(far_future(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn test_first_error_aborts_siblings() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut group = TaskGroup::new("test");

        group.spawn(async { Err::<(), _>(Error::unavailable("student")) });
        for _ in 0..3 {
            let finished = Arc::clone(&finished);
            group.spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok::<(), Error>(())
            });
        }

        let result = group.join_all(far_future(), &CancellationToken::new()).await;
        assert_eq!(result, Err(Error::unavailable("student")));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deadline_aborts_group() {
        let mut group = TaskGroup::new("slow");
        group.spawn(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), Error>(())
        });

        let deadline = Instant::now() + Duration::from_millis(20);
        let result = group.join_all(deadline, &CancellationToken::new()).await;

        assert_eq!(result, Err(Error::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_cancel_aborts_group() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut group = TaskGroup::new("cancelled");
        let counter = Arc::clone(&finished);
        group.spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), Error>(())
        });

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = group.join_all(far_future(), &cancel).await;
        assert_eq!(result, Err(Error::Cancelled));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_already_cancelled_token_fails_immediately() {
        let mut group = TaskGroup::new("cancelled");
        group.spawn(async { Ok::<u32, Error>(1) });

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = group.join_all(far_future(), &cancel).await;
        assert_eq!(result, Err(Error::Cancelled));
    }

    #[tokio::test]
    async fn test_panicking_task_is_internal_error() {
        let mut group = TaskGroup::<()>::new("panicky");
        group.spawn(async {
            if true {
                panic!("boom");
            }
            Ok::<(), Error>(())
        });

        let result = group.join_all(far_future(), &CancellationToken::new()).await;

        assert!(matches!(result, Err(Error::Internal(_))));
    }
}
