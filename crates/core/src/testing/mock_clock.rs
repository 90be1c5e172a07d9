//! Simulated clock for deterministic time-dependent tests.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::clock::Clock;

/// Clock whose `sleep` returns immediately while still moving simulated
/// time forward, so retry loops and deadlines resolve instantly in tests.
pub struct MockClock {
    start: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    /// Simulated time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }

    /// Move simulated time forward without registering a sleep.
    pub fn advance(&self, duration: Duration) {
        *self.offset.lock().unwrap() += duration;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
        // Yield so concurrently spawned tasks still interleave.
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sleep_advances_simulated_time() {
        let clock = MockClock::new();
        let before = clock.now();
        clock.sleep(Duration::from_secs(60)).await;
        assert_eq!(clock.now().duration_since(before), Duration::from_secs(60));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(60)]);
    }

    #[tokio::test]
    async fn test_advance_does_not_record_a_sleep() {
        let clock = MockClock::new();
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.elapsed(), Duration::from_secs(5));
        assert!(clock.sleeps().is_empty());
    }
}
