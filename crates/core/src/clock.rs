//! Injectable time source.
//!
//! The pipeline has several unbounded retry loops (discovery backoff, replay
//! parse polling) and one hard wall-clock deadline (the vote window). All of
//! them go through this trait so tests can simulate elapsed time without
//! real sleeping.

use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Abstraction over wall-clock reads and sleeping.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Suspend the current task for the given duration.
    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
