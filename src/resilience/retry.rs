use crate::client::RawRecord;
use crate::error::ErrorCategory;
use crate::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Outcome of a single network attempt, as seen by the retry engine
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    /// The call completed; the list may be empty
    Records(Vec<RawRecord>),
    /// The provider answered HTTP 429
    RateLimited,
    /// Timeout, connection failure or 5xx
    Transient(String),
    /// Anything that retrying cannot fix
    Fatal(String),
}

impl From<crate::Result<Vec<RawRecord>>> for Attempt {
    fn from(result: crate::Result<Vec<RawRecord>>) -> Self {
        match result {
            Ok(records) => Self::Records(records),
            Err(error) => Self::from(error),
        }
    }
}

impl From<Error> for Attempt {
    fn from(error: Error) -> Self {
        match error.category() {
            ErrorCategory::RateLimited => Self::RateLimited,
            ErrorCategory::Transient => Self::Transient(error.to_string()),
            ErrorCategory::Permanent => Self::Fatal(error.to_string()),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included
    pub max_retries: u32,
    /// Delay before the second attempt; doubled for every further attempt
    pub base_delay: Duration,
    /// Upper bound of the uniform jitter added after an empty result
    pub max_jitter: Duration,
    /// Extra wait applied before the backoff when the provider rate limits us
    pub rate_limit_cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_secs(1),
            rate_limit_cooldown: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Policy that retries without ever sleeping
    #[must_use]
    pub const fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
            rate_limit_cooldown: Duration::ZERO,
        }
    }

    /// `base_delay * 2^attempt`, saturating instead of overflowing
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Worst-case total sleep for one `RetryEngine::run` call
    #[must_use]
    pub fn max_total_sleep(&self) -> Duration {
        (0..self.max_retries.saturating_sub(1)).fold(Duration::ZERO, |total, attempt| {
            total
                + self.backoff(attempt)
                + self.max_jitter.max(self.rate_limit_cooldown)
        })
    }
}

fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let millis = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
}

/// Exponential-backoff wrapper around a single request-producing operation.
///
/// Failure never escapes: after the last attempt (or on a fatal outcome) the
/// engine hands back an empty list, which callers treat as "source failed".
#[derive(Debug, Clone, Default)]
pub struct RetryEngine {
    policy: RetryPolicy,
}

impl RetryEngine {
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `operation` until it yields records or attempts run out
    pub async fn run<F, Fut>(&self, operation_name: &str, operation: F) -> Vec<RawRecord>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Attempt>,
    {
        let max_retries = self.policy.max_retries.max(1);
        let mut last_failure: Option<String> = None;

        for attempt in 0..max_retries {
            debug!(
                "Executing operation '{}' (attempt {}/{})",
                operation_name,
                attempt + 1,
                max_retries
            );
            let remaining = attempt + 1 < max_retries;

            let delay = match operation().await {
                Attempt::Records(records) if !records.is_empty() => {
                    if attempt > 0 {
                        debug!(
                            "Operation '{}' succeeded after {} attempts",
                            operation_name,
                            attempt + 1
                        );
                    }
                    return records;
                }
                Attempt::Records(_) => {
                    last_failure = Some("empty result".to_string());
                    self.policy.backoff(attempt) + jitter(self.policy.max_jitter)
                }
                Attempt::Transient(reason) => {
                    warn!(
                        "Operation '{}' attempt {} failed: {}",
                        operation_name,
                        attempt + 1,
                        reason
                    );
                    last_failure = Some(reason);
                    self.policy.backoff(attempt)
                }
                Attempt::RateLimited => {
                    warn!(
                        "Operation '{}' rate limited on attempt {}",
                        operation_name,
                        attempt + 1
                    );
                    last_failure = Some("rate limited".to_string());
                    self.policy.rate_limit_cooldown + self.policy.backoff(attempt)
                }
                Attempt::Fatal(reason) => {
                    warn!(
                        "Operation '{}' failed with non-retryable error: {}",
                        operation_name, reason
                    );
                    return Vec::new();
                }
            };

            if remaining {
                debug!(
                    "Operation '{}' retrying after {:?}",
                    operation_name, delay
                );
                sleep(delay).await;
            }
        }

        info!(
            "Operation '{}' gave up after {} attempts ({})",
            operation_name,
            max_retries,
            last_failure.as_deref().unwrap_or("no result")
        );
        Vec::new()
    }
}

/// Errors that can tell the retry loop they were caused by rate limiting
pub trait RateLimitAware {
    fn is_rate_limited(&self) -> bool;
}

/// Retry that propagates the last error instead of swallowing it.
///
/// Rate-limited failures wait `base_delay * 2^attempt`; any other failure
/// waits `base_delay` before the next attempt.
pub async fn retry_propagating<T, E, F, Fut>(
    operation_name: &str,
    policy: &RetryPolicy,
    operation: F,
) -> Result<T, E>
where
    E: RateLimitAware + std::fmt::Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_retries = policy.max_retries.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                warn!(
                    "Attempt {} failed for {}: {}",
                    attempt + 1,
                    operation_name,
                    error
                );
                if attempt + 1 >= max_retries {
                    return Err(error);
                }

                let delay = if error.is_rate_limited() {
                    let wait = policy.backoff(attempt);
                    info!("Rate limited, waiting {:?}...", wait);
                    wait
                } else {
                    policy.base_delay
                };
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
