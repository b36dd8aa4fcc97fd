//! Fixed-delay retry with a per-attempt timeout for platform fetches.
//!
//! [`retry_fixed`] runs an async operation up to `max_attempts` times. Each
//! attempt is bounded by `attempt_timeout`; an elapsed attempt counts as a
//! retryable [`FetchError::Timeout`]. Errors for which
//! [`FetchError::is_retryable`] is false end the loop immediately.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::PipelineConfig;
use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included. Treated as at least 1.
    pub max_attempts: u32,
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            delay: config.retry_delay,
            attempt_timeout: config.fetch_timeout,
        }
    }
}

/// Final result of a retried operation and how many attempts it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, FetchError>,
    pub attempts: u32,
}

pub async fn retry_fixed<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let result = match tokio::time::timeout(policy.attempt_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                secs: policy.attempt_timeout.as_secs(),
            }),
        };

        match result {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(err) if !err.is_retryable() || attempt >= max_attempts => {
                return Attempted {
                    result: Err(err),
                    attempts: attempt,
                };
            }
            Err(err) => {
                warn!(
                    attempt,
                    max_attempts,
                    delay_secs = policy.delay.as_secs(),
                    error = %err,
                    "Fetch failed, retrying after fixed delay"
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::ZERO,
            attempt_timeout: Duration::from_secs(5),
        }
    }

    fn server_error() -> FetchError {
        FetchError::Status {
            status: 503,
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let out = retry_fixed(&policy(3), || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, FetchError>(7)
            }
        })
        .await;

        assert_eq!(out.result.unwrap(), 7);
        assert_eq!(out.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let out = retry_fixed(&policy(3), || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(server_error())
                } else {
                    Ok(1u8)
                }
            }
        })
        .await;

        assert!(out.result.is_ok());
        assert_eq!(out.attempts, 3);
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let out = retry_fixed(&policy(3), || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(server_error())
            }
        })
        .await;

        assert!(matches!(out.result, Err(FetchError::Status { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let out = retry_fixed(&policy(5), || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(FetchError::Status {
                    status: 401,
                    body: "unauthorized".into(),
                })
            }
        })
        .await;

        assert!(out.result.is_err());
        assert_eq!(out.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_timeout_counts_as_failure() {
        let policy = RetryPolicy {
            max_attempts: 2,
            delay: Duration::ZERO,
            attempt_timeout: Duration::from_millis(20),
        };
        let out = retry_fixed(&policy, || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), FetchError>(())
        })
        .await;

        assert!(matches!(out.result, Err(FetchError::Timeout { .. })));
        assert_eq!(out.attempts, 2);
    }

    #[tokio::test]
    async fn test_zero_budget_still_tries_once() {
        let out = retry_fixed(&policy(0), || async { Ok::<_, FetchError>("ok") }).await;
        assert_eq!(out.attempts, 1);
    }
}
