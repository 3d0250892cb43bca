// src/common/retry.rs

use std::{future::Future, time::Duration};

use backon::Retryable;

use crate::common::error::AppError;

/// Explicit retry configuration for operations that opt in.
/// Only transient database errors are retried, with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    // attempt is 1-based
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Delays between attempts: `base_delay × n` for n in 1..max_attempts.
    pub fn backoff(&self) -> LinearBackoff {
        LinearBackoff {
            policy: *self,
            attempt: 1,
        }
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, op: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut attempt = 0u32;
        op.retry(self.backoff())
            .when(AppError::is_transient)
            .notify(|err: &AppError, delay: Duration| {
                attempt += 1;
                tracing::warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "transient database error, retrying: {}",
                    err
                );
            })
            .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LinearBackoff {
    policy: RetryPolicy,
    attempt: u32,
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt >= self.policy.max_attempts {
            return None;
        }
        let delay = self.policy.delay_for(self.attempt);
        self.attempt += 1;
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn transient() -> AppError {
        AppError::TransientDatabase(sqlx::Error::Protocol("prepared statement exists".into()))
    }

    #[test]
    fn backoff_is_linear() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
    }

    #[test]
    fn backoff_yields_one_delay_per_retry() {
        let policy = RetryPolicy::new(4, Duration::from_millis(50));
        let delays: Vec<_> = policy.backoff().collect();
        assert_eq!(
            delays,
            vec![Duration::from_millis(50), Duration::from_millis(100), Duration::from_millis(150)]
        );
        assert_eq!(RetryPolicy::new(1, Duration::from_millis(50)).backoff().count(), 0);
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = &AtomicU32::new(0);

        let result = policy
            .run("test", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transient())
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.ok(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let calls = &AtomicU32::new(0);

        let result: Result<(), AppError> = policy
            .run("test", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        assert!(matches!(result, Err(AppError::TransientDatabase(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let policy = RetryPolicy::default();
        let calls = &AtomicU32::new(0);

        let result: Result<(), AppError> = policy
            .run("test", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::NotFound("program"))
            })
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
