/// Retry policy applied at the remote fetch boundary
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Fixed-delay retry with an optional backoff factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub delay: Duration,
    /// Multiplier applied to the delay after every failed attempt
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(3),
            backoff: 1.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration, backoff: f64) -> Self {
        Self {
            max_attempts,
            delay,
            backoff,
        }
    }

    /// Delay slept after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff.max(0.0).powi(attempt.saturating_sub(1) as i32);
        self.delay.mul_f64(factor)
    }

    /// Run `operation` until it succeeds or the attempts are used up.
    ///
    /// Returns `None` once every attempt failed; the failures are logged as
    /// warnings and never propagated.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.max_attempts.max(1);
        for attempt in 1..=attempts {
            match operation().await {
                Ok(value) => return Some(value),
                Err(e) if attempt < attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:.1}s",
                        label,
                        attempt,
                        attempts,
                        e,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!("{} failed (attempt {}/{}): {}", label, attempt, attempts, e);
                }
            }
        }

        warn!(
            "Giving up on {} after {} attempts; check that the source exists and the network is reachable",
            label, attempts
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn quick_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), 1.0)
    }

    #[tokio::test]
    async fn test_returns_first_success() {
        let calls = Cell::new(0);
        let result = quick_policy()
            .run("fetch", || {
                calls.set(calls.get() + 1);
                async { Ok::<_, String>(42) }
            })
            .await;
        assert_eq!(result, Some(42));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = Cell::new(0);
        let result = quick_policy()
            .run("fetch", || {
                calls.set(calls.get() + 1);
                let attempt = calls.get();
                async move {
                    if attempt < 3 {
                        Err(format!("failure {attempt}"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result, Some("done"));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Option<()> = quick_policy()
            .run("fetch", || {
                calls.set(calls.get() + 1);
                async { Err("down") }
            })
            .await;
        assert_eq!(result, None);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_backoff_delays() {
        let policy = RetryPolicy::new(4, Duration::from_secs(2), 2.0);
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
        assert_eq!(RetryPolicy::default().delay_after(3), Duration::from_secs(3));
    }
}
