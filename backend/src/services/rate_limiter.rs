use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, Duration, Instant};

/// Active limiter for provider calls.
///
/// Bounds concurrent requests and spaces consecutive requests at least `60s / budget` apart,
/// so a burst of quote lookups never exceeds the provider's per-minute ceiling.
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    last_request: Mutex<Option<Instant>>,
    min_delay: Duration,
}

impl RateLimiter {
    /// `requests_per_minute` must be non-zero; configuration rejects zero before this is built.
    pub fn new(max_concurrent: usize, requests_per_minute: u32) -> Self {
        let min_delay_ms = 60_000 / u64::from(requests_per_minute.max(1));
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            last_request: Mutex::new(None),
            min_delay: Duration::from_millis(min_delay_ms),
        }
    }

    /// Waits for a concurrency permit, then for the minimum spacing since the previous call.
    ///
    /// The permit is released when the returned guard is dropped.
    pub async fn acquire(&self) -> Result<RateLimitGuard, AcquireError> {
        let permit = self.semaphore.clone().acquire_owned().await?;

        loop {
            // Reserve the next slot under the lock, sleep outside it
            let wait = {
                let mut last = self.last_request.lock();
                let now = Instant::now();
                match *last {
                    Some(previous) if now.duration_since(previous) < self.min_delay => {
                        Some(self.min_delay - now.duration_since(previous))
                    }
                    _ => {
                        *last = Some(now);
                        None
                    }
                }
            };

            match wait {
                Some(delay) => sleep(delay).await,
                None => break,
            }
        }

        Ok(RateLimitGuard { _permit: permit })
    }

    #[allow(dead_code)]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

pub struct RateLimitGuard {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_enforces_delay() {
        // 60 per minute = one per second
        let limiter = RateLimiter::new(2, 60);
        let start = Instant::now();

        let first = limiter.acquire().await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(100));
        drop(first);

        let _second = limiter.acquire().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_permits_are_returned_on_drop() {
        let limiter = RateLimiter::new(1, 6000);
        let guard = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available_permits(), 0);
        drop(guard);
        assert_eq!(limiter.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_all_complete() {
        let limiter = Arc::new(RateLimiter::new(2, 1200)); // 50ms spacing

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    let _guard = limiter.acquire().await.unwrap();
                    sleep(Duration::from_millis(20)).await;
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
    }
}
