//! Fixed-budget retry for fallible async operations.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::{INFLUX_WRITE_ATTEMPTS, INFLUX_WRITE_RETRY_DELAY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: INFLUX_WRITE_ATTEMPTS,
            delay: INFLUX_WRITE_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds or the attempt budget is spent, returning
    /// the last error.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < attempts => {
                    warn!(what, attempt, attempts, error = %e, "Attempt failed, retrying");
                    attempt += 1;
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
                Err(e) => {
                    return Err(e.context(format!("{what} failed after {attempts} attempts")));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let v = policy(3)
            .run("op", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await
            .unwrap();
        assert_eq!(v, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let v = policy(3)
            .run("op", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(anyhow!("transient"))
                } else {
                    Ok("done")
                }
            })
            .await
            .unwrap();
        assert_eq!(v, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = policy(2)
            .run("write", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(anyhow!("down"))
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(format!("{err:#}").contains("write failed after 2 attempts"));
        assert!(format!("{err:#}").contains("down"));
    }

    #[tokio::test]
    async fn test_zero_attempts_runs_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let _ = policy(0)
            .run("op", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(anyhow!("nope"))
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_policy() {
        assert_eq!(RetryPolicy::default().attempts, INFLUX_WRITE_ATTEMPTS);
    }
}
