//! Propagation settle delay.
//!
//! The SET phase must not touch the distribution until the firewall change
//! has reached every regional enforcement point. The wait lives behind the
//! [`Propagation`] trait; tests substitute a zero-delay recorder.

use async_trait::async_trait;
use std::time::Duration;

/// Blocking wait for a distributed policy change to become visible.
#[async_trait]
pub trait Propagation: Send + Sync {
    /// Returns once a policy change can be assumed visible at every
    /// enforcement point.
    async fn settle(&self);
}

/// Fixed-duration delay backed by the tokio timer.
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Creates a delay of the given duration.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Propagation for FixedDelay {
    async fn settle(&self) {
        tracing::info!(seconds = self.delay.as_secs(), "waiting for firewall propagation");
        tokio::time::sleep(self.delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_sleeps_full_interval() {
        let start = tokio::time::Instant::now();
        FixedDelay::new(Duration::from_secs(75)).settle().await;
        assert!(start.elapsed() >= Duration::from_secs(75));
    }
}
