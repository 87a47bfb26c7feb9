//! Pacing between upstream calls.

use std::time::Duration;

use async_trait::async_trait;

/// Policy deciding how long to pause between two upstream calls.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Suspend before the next call.
    async fn wait(&self);
}

/// Plain timed sleep between calls.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl RateLimiter for FixedDelay {
    async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// No pause at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl RateLimiter for NoDelay {
    async fn wait(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn no_delay_returns_immediately() {
        let start = Instant::now();
        NoDelay.wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn fixed_delay_sleeps_at_least_delay() {
        let limiter = FixedDelay::new(Duration::from_millis(20));
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
