//! Bounded retry with optional exponential backoff

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Retry configuration applied to a collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Double the delay after every failed attempt
    pub exponential: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::critical(3, Duration::from_secs(1), true)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, exponential: bool) -> Self {
        Self {
            max_attempts,
            base_delay,
            exponential,
        }
    }

    /// Profile for CPU, memory and disk collectors
    pub fn critical(max_attempts: u32, base_delay: Duration, exponential: bool) -> Self {
        Self::new(max_attempts, base_delay, exponential)
    }

    /// Profile for the network collector; backoff stays flat
    pub fn normal(max_attempts: u32, base_delay: Duration) -> Self {
        Self::new(max_attempts, base_delay, false)
    }

    /// Delay to wait after the given zero-based failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.exponential {
            let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
            self.base_delay.saturating_mul(factor)
        } else {
            self.base_delay
        }
    }

    /// Run `operation` until it succeeds or the attempts are exhausted
    ///
    /// There is no delay before the first attempt and none after the last;
    /// the final error is returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, name: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        operation = %name,
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %e,
                        "Attempt failed"
                    );

                    if attempt + 1 >= attempts {
                        error!(operation = %name, "All attempts failed");
                        return Err(e);
                    }

                    tokio::time::sleep(self.delay_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1), true);
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_flat_delays() {
        let policy = RetryPolicy::normal(2, Duration::from_secs(1));
        assert!(!policy.exponential);
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(5), Duration::from_secs(1));
    }

    #[test]
    fn test_delay_saturates() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1), true);
        assert_eq!(policy.delay_for(64), Duration::from_secs(u32::MAX as u64));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_uses_every_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1), true);
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result: Result<(), String> = policy
            .run("always_fails", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("boom".to_string())
                }
            })
            .await;

        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second, nothing after the last
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_is_not_delayed() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1), true);
        let started = Instant::now();

        let result: Result<u32, String> = policy.run("succeeds", || async { Ok(7) }).await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let policy = RetryPolicy::normal(2, Duration::from_secs(1));
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<u32, String> = policy
            .run("flaky", || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err("transient".to_string())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::new(0, Duration::ZERO, false);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), &str> = policy
            .run("zero", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("nope")
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
