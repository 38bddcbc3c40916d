//! Bounded exponential backoff around model calls.
//!
//! Only rate-limit failures are retried. Every other failure propagates on
//! the spot, without any added delay. Each call to
//! [`BackoffExecutor::execute`] gets its own full attempt budget.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::ports::AIError;

/// Attempt budget and delay schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later one.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay to wait after a failure of the zero-indexed `attempt`:
    /// `base_delay * 2^attempt`, or `Duration::MAX` when that overflows.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(4, Duration::from_millis(1000))
    }
}

/// True when a failure signals provider rate limiting: HTTP 429, a
/// resource-exhaustion code, or an explicit "too many requests".
pub fn is_rate_limited(err: &AIError) -> bool {
    match err {
        AIError::RateLimited { .. } => true,
        AIError::Provider { status: 429, .. } => true,
        AIError::Provider { message, .. }
        | AIError::Unavailable { message }
        | AIError::Network(message) => mentions_rate_limit(message),
        _ => false,
    }
}

fn mentions_rate_limit(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("resource_exhausted")
        || lower.contains("resource exhausted")
        || lower.contains("too many requests")
}

/// Runs operations under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct BackoffExecutor {
    policy: RetryPolicy,
}

impl BackoffExecutor {
    /// Creates an executor with the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Runs `operation`, retrying rate-limit failures with exponential
    /// backoff until the attempt budget is spent. The last failure is
    /// returned once the budget is exhausted.
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, AIError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AIError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if is_rate_limited(&err) && attempt + 1 < max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        operation = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Rate limited, backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if is_rate_limited(&err) {
                        tracing::error!(
                            operation = label,
                            attempts = attempt + 1,
                            error = %err,
                            "Retry budget exhausted"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(4, Duration::from_millis(1))
    }

    #[test]
    fn default_policy_is_four_attempts_from_one_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.base_delay, Duration::from_millis(1000));
    }

    #[test]
    fn delays_double_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
    }

    #[test]
    fn delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1));
        assert_eq!(policy.delay_for(31), Duration::from_secs(1 << 31));
        assert_eq!(policy.delay_for(32), Duration::MAX);
        assert_eq!(policy.delay_for(64), Duration::MAX);
    }

    #[test]
    fn classifies_rate_limit_signals() {
        assert!(is_rate_limited(&AIError::rate_limited("quota")));
        assert!(is_rate_limited(&AIError::Provider {
            status: 429,
            message: String::new()
        }));
        assert!(is_rate_limited(&AIError::Provider {
            status: 400,
            message: "status: RESOURCE_EXHAUSTED".into()
        }));
        assert!(is_rate_limited(&AIError::unavailable("Too Many Requests")));
    }

    #[test]
    fn other_failures_are_not_rate_limits() {
        assert!(!is_rate_limited(&AIError::AuthenticationFailed));
        assert!(!is_rate_limited(&AIError::unavailable("backend down")));
        assert!(!is_rate_limited(&AIError::Provider {
            status: 400,
            message: "invalid argument".into()
        }));
        assert!(!is_rate_limited(&AIError::Timeout { timeout_secs: 5 }));
        assert!(!is_rate_limited(&AIError::parse("too many requests")));
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let executor = BackoffExecutor::new(fast_policy());
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = executor
            .execute("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, AIError>(7)
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_rate_limits_then_succeeds() {
        let executor = BackoffExecutor::new(fast_policy());
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = executor
            .execute("test", move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(AIError::rate_limited("slow down"))
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_fails_immediately() {
        // A long base delay would make the test hang if it were applied.
        let executor = BackoffExecutor::new(RetryPolicy::new(4, Duration::from_secs(30)));
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let started = Instant::now();

        let result: Result<(), AIError> = executor
            .execute("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AIError::AuthenticationFailed)
            })
            .await;

        assert!(matches!(result, Err(AIError::AuthenticationFailed)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn exhausted_budget_returns_last_error() {
        let executor = BackoffExecutor::new(fast_policy());
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let started = Instant::now();

        let result: Result<(), AIError> = executor
            .execute("test", move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Err(AIError::rate_limited(format!("attempt {}", n)))
            })
            .await;

        match result {
            Err(AIError::RateLimited { message }) => assert_eq!(message, "attempt 3"),
            other => panic!("Expected last rate limit error, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 1ms + 2ms + 4ms of backoff
        assert!(started.elapsed() >= Duration::from_millis(7));
    }

    #[tokio::test]
    async fn each_execution_gets_its_own_budget() {
        let executor = BackoffExecutor::new(RetryPolicy::new(2, Duration::from_millis(1)));

        for _ in 0..2 {
            let calls = AtomicU32::new(0);
            let counter = &calls;
            let result = executor
                .execute("test", move || async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        Err(AIError::rate_limited("once"))
                    } else {
                        Ok(())
                    }
                })
                .await;
            assert!(result.is_ok());
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let executor = BackoffExecutor::new(RetryPolicy::new(0, Duration::from_millis(1)));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let _ = executor
            .execute("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AIError::rate_limited("x"))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
