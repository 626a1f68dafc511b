// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded retry with a fixed delay between attempts.

use std::future::Future;
use std::time::Duration;

use murmur_core::MurmurError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `max_retries + 1` attempts in total.
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Runs `op` until it succeeds or the policy is exhausted.
    ///
    /// Rate-limit errors and cancellation are returned immediately so the
    /// caller can pause the whole cycle instead of hammering the platform.
    /// `op` receives the zero-based attempt number.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, MurmurError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, MurmurError>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_rate_limit() || matches!(e, MurmurError::Cancelled) => {
                    return Err(e);
                }
                Err(e) if attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts = self.max_retries + 1,
                        error = %e,
                        "attempt failed, retrying"
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(MurmurError::Cancelled),
                _ = tokio::time::sleep(self.delay) => {}
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> MurmurError {
        MurmurError::Transport {
            message: "bad gateway".into(),
            status: Some(502),
            source: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_secs(60));
        let counter = Arc::clone(&calls);
        let start = tokio::time::Instant::now();

        let result = policy
            .run("post", &CancellationToken::new(), |_| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(transient())
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), _> = RetryPolicy::new(2, Duration::from_secs(1))
            .run("generate", &CancellationToken::new(), |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), _> = RetryPolicy::new(5, Duration::from_secs(1))
            .run("post", &CancellationToken::new(), |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(MurmurError::RateLimited { retry_after: None }) }
            })
            .await;
        assert!(result.unwrap_err().is_rate_limit());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_backoff() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<(), _> = RetryPolicy::new(5, Duration::from_secs(60))
            .run("post", &cancel, |_| async { Err(transient()) })
            .await;
        assert!(matches!(result, Err(MurmurError::Cancelled)));
    }
}
