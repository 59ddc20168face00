use crate::config::RateLimit;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Process-wide request throttle shared by all workers
///
/// Spaces request issuance so the aggregate rate never exceeds the
/// configured bound regardless of worker count. Global only, no per-host
/// partitioning.
pub struct RateLimiter {
    interval: Duration,
    /// When the next request slot opens; the lock is held across the wait so
    /// issuance stays strictly serialized.
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(rate: RateLimit) -> Self {
        Self {
            interval: rate.interval(),
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Suspends the caller until a request may be issued
    pub async fn acquire(&self) {
        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();
        if *next_slot > now {
            tokio::time::sleep_until(*next_slot).await;
            *next_slot += self.interval;
        } else {
            *next_slot = now + self.interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let limiter = RateLimiter::new("100rps".parse().unwrap());
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_rate_is_bounded_across_tasks() {
        // 50 rps -> 20ms spacing; 5 acquires need at least ~80ms total.
        let limiter = Arc::new(RateLimiter::new("50rps".parse().unwrap()));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(
            start.elapsed() >= Duration::from_millis(70),
            "5 acquires at 50rps finished in {:?}",
            start.elapsed()
        );
    }
}
