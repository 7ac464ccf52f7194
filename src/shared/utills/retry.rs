//! Retry with exponential backoff
//!
//! Wraps calls that fail transiently, mainly the payment gateway HTTP
//! round-trips (checkout creation, status polling). Permanent errors
//! bail on the first attempt; only errors the caller classifies as
//! transient are retried.

use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, counting the first call.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Delay after `attempt` failed tries: base * 2^(attempt-1), capped.
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, a permanent error occurs, or the
/// attempts run out. `should_retry` decides which errors are transient.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: RetryConfig,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
    operation_name: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation = operation_name, attempt, "Recovered after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if attempt >= config.max_attempts || !should_retry(&err) {
            warn!(
                operation = operation_name,
                attempt,
                max_attempts = config.max_attempts,
                error = %err,
                "Giving up"
            );
            return Err(err);
        }

        let delay = config.delay_for(attempt);
        warn!(
            operation = operation_name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Transient failure, will retry"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry_with_backoff(
            fast_config(),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err("timeout".to_string())
                    } else {
                        Ok(n)
                    }
                }
            },
            |_| true,
            "test_op",
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_error_bails_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry_with_backoff(
            fast_config(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("bad request".to_string()) }
            },
            |_| false,
            "test_op",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry_with_backoff(
            fast_config(),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(format!("failure {}", n)) }
            },
            |_| true,
            "test_op",
        )
        .await;

        assert_eq!(result.unwrap_err(), "failure 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn delay_doubles_then_caps() {
        let config = RetryConfig {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(2), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(350));
        assert_eq!(config.delay_for(8), Duration::from_millis(350));
    }
}
