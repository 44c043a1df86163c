use futures::future::Future;
use std::time::{Duration, Instant};

#[cfg(feature = "runtime-tokio")]
pub use tokio::time::error::Elapsed as TimeoutError;

#[cfg(feature = "runtime-async-std")]
pub use async_std::future::TimeoutError;

#[inline]
pub async fn sleep(dur: Duration) {
    #[cfg(feature = "runtime-tokio")]
    tokio::time::sleep(dur).await;

    #[cfg(feature = "runtime-async-std")]
    async_std::task::sleep(dur).await;
}

/// Await `f` for at most `dur`.
pub async fn timeout<F, T>(dur: Duration, f: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    #[cfg(feature = "runtime-tokio")]
    let res = tokio::time::timeout(dur, f).await;

    #[cfg(feature = "runtime-async-std")]
    let res = async_std::future::timeout(dur, f).await;

    res
}

/// A fixed-rate schedule. The first tick completes one `delay` after creation, then once
/// every `period`.
///
/// If the consumer falls behind (a tick took longer than the period), the schedule is
/// realigned to `now + period` rather than firing a burst of catch-up ticks.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self::with_delay(period, period)
    }

    pub fn with_delay(delay: Duration, period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + delay,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub async fn tick(&mut self) {
        let now = Instant::now();
        if self.next > now {
            sleep(self.next - now).await;
        }
        let now = Instant::now();
        self.next += self.period;
        if self.next <= now {
            self.next = now + self.period;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[cfg(feature = "runtime-tokio")]
    #[tokio::test]
    async fn ticker_keeps_pace() {
        let mut ticker = Ticker::with_delay(Duration::ZERO, Duration::from_millis(20));
        let start = Instant::now();
        for _ in 0..4 {
            ticker.tick().await;
        }
        // ticks at 0, 20, 40, 60
        assert!(start.elapsed() >= Duration::from_millis(60));
        assert_eq!(ticker.period(), Duration::from_millis(20));
    }

    #[cfg(feature = "runtime-tokio")]
    #[tokio::test]
    async fn timeout_elapses() {
        assert!(timeout(Duration::from_millis(10), sleep(Duration::from_secs(5)))
            .await
            .is_err());
        assert_eq!(timeout(Duration::from_secs(1), async { 7 }).await.ok(), Some(7));
    }
}
