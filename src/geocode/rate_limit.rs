use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Spaces calls at least `min_interval` apart. Callers queue on the lock, so
/// concurrent lookups are serialized too.
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Waits until the next call is allowed and records it.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let next = previous + self.min_interval;
            let now = Instant::now();
            if next > now {
                debug!(wait_ms = (next - now).as_millis() as u64, "Rate limiting request");
                tokio::time::sleep_until(next.into()).await;
            }
        }
        *last = Some(Instant::now());
    }
}
