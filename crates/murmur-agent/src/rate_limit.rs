// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token bucket limiting how fast replies are posted.
//!
//! One token is refilled every `window / posts_per_window`; the bucket holds
//! at most `burst` tokens and starts full.

use std::time::Duration;

use murmur_core::MurmurError;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct TokenBucket {
    state: Mutex<Bucket>,
    refill_every: Duration,
    capacity: f64,
}

impl TokenBucket {
    /// `posts` per `window`, holding at most `burst` tokens.
    ///
    /// Zero `posts` or `burst` are treated as one; config validation rejects them earlier.
    pub fn new(posts: u32, window: Duration, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        Self {
            state: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            refill_every: window / posts.max(1),
            capacity,
        }
    }

    pub fn refill_interval(&self) -> Duration {
        self.refill_every
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        let gained = elapsed.as_secs_f64() / self.refill_every.as_secs_f64();
        bucket.tokens = (bucket.tokens + gained).min(self.capacity);
        bucket.last_refill = now;
    }

    /// Takes a token if one is available right now.
    pub async fn try_acquire(&self) -> bool {
        let mut bucket = self.state.lock().await;
        self.refill(&mut bucket, Instant::now());
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Waits for a token. Returns `Cancelled` if `cancel` fires first.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), MurmurError> {
        loop {
            let wait = {
                let mut bucket = self.state.lock().await;
                self.refill(&mut bucket, Instant::now());
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return Ok(());
                }
                self.refill_every.mul_f64(1.0 - bucket.tokens)
            };

            debug!(wait_ms = wait.as_millis() as u64, "waiting for post token");
            tokio::select! {
                _ = cancel.cancelled() => return Err(MurmurError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn posts_are_spaced_by_refill_interval() {
        let bucket = TokenBucket::new(45, Duration::from_secs(15 * 60), 1);
        assert_eq!(bucket.refill_interval(), Duration::from_secs(20));
        let cancel = CancellationToken::new();

        let start = Instant::now();
        bucket.acquire(&cancel).await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));

        bucket.acquire(&cancel).await.unwrap();
        bucket.acquire(&cancel).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(40), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(41), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn burst_allows_immediate_tokens_up_to_capacity() {
        let bucket = TokenBucket::new(6, Duration::from_secs(60), 3);
        assert!(bucket.try_acquire().await);
        assert!(bucket.try_acquire().await);
        assert!(bucket.try_acquire().await);
        assert!(!bucket.try_acquire().await);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(bucket.try_acquire().await);
        assert!(!bucket.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_does_not_exceed_capacity() {
        let bucket = TokenBucket::new(1, Duration::from_secs(1), 1);
        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(bucket.try_acquire().await);
        assert!(!bucket.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_wait() {
        let bucket = TokenBucket::new(1, Duration::from_secs(3600), 1);
        let cancel = CancellationToken::new();
        bucket.acquire(&cancel).await.unwrap();

        let child = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            child.cancel();
        });
        let err = bucket.acquire(&cancel).await.unwrap_err();
        assert!(matches!(err, MurmurError::Cancelled));
    }
}
