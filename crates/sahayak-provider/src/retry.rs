//! Bounded retry with a fixed inter-attempt delay.

use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::warn;

/// Retry an async operation up to `max_attempts` times, sleeping `delay`
/// between attempts. Tests inject `Duration::ZERO` so no real time passes.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_err = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    warn!(attempt, max_attempts = self.max_attempts, %error, "attempt failed");
                    last_err = Some(error);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("retries exhausted")))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO)
    }

    #[tokio::test]
    async fn succeeds_first_try() {
        let calls = AtomicU32::new(0);
        let result = instant()
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, anyhow::Error>(7) }
            })
            .await
            .unwrap();
        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fails_twice_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = instant()
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(anyhow!("transient"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(result, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = instant()
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(anyhow!("boom {attempt}")) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(result.unwrap_err().to_string().contains("boom 3"));
    }

    #[tokio::test]
    async fn zero_attempts_clamped_to_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        let calls = AtomicU32::new(0);
        let _: Result<()> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(anyhow!("nope")) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
