use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Post-call pacing for providers that publish a request rate.
///
/// Unlike the retry backoff this delay applies after every call, successful
/// or not, so consecutive requests to the same provider stay spaced out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiter {
    min_interval: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified rate (requests per second)
    #[must_use]
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 {
            Duration::try_from_secs_f64(1.0 / requests_per_second)
                .unwrap_or(DEFAULT_INTERVAL)
        } else {
            DEFAULT_INTERVAL
        };

        debug!(
            "Created rate limiter: {} requests per second",
            requests_per_second
        );

        Self { min_interval }
    }

    #[must_use]
    pub const fn from_interval(min_interval: Duration) -> Self {
        Self { min_interval }
    }

    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait out the interval after a request has completed
    pub async fn cool_down(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        debug!("Rate limiter: waiting {}ms", self.min_interval.as_millis());
        sleep(self.min_interval).await;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(1.0) // 1 request per second by default
    }
}
