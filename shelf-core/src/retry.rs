//! Retry with exponential backoff for provider calls
//!
//! Every call to the embedding provider, catalog store and extraction model
//! goes through [`with_retry`]. Each attempt is bounded by the policy's
//! `call_timeout`; an elapsed timeout counts as a transient failure.

use std::future::Future;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProviderError, RecognitionError, RecognitionResult};

/// Configuration for retry behavior with exponential backoff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one (default: 3)
    pub max_attempts: u32,
    /// Delay before the first retry (default: 500ms)
    pub base_delay: Duration,
    /// Upper bound for any single delay (default: 10s)
    pub max_delay: Duration,
    /// Multiplier applied after each retry (default: 2.0)
    pub backoff_factor: f64,
    /// Random jitter range as a fraction of the delay (default: 0.1 = ±10%)
    pub jitter_percent: f64,
    /// Timeout applied to every individual attempt (default: 30s)
    pub call_timeout: Duration,
    /// Which provider errors are worth another attempt
    #[serde(skip, default = "default_retryable")]
    pub retryable: fn(&ProviderError) -> bool,
}

fn default_retryable() -> fn(&ProviderError) -> bool {
    ProviderError::is_retryable
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
            jitter_percent: 0.1,
            call_timeout: Duration::from_secs(30),
            retryable: default_retryable(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, call_timeout: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            call_timeout,
            ..Default::default()
        }
    }

    /// Policy that never sleeps between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_percent: 0.0,
            ..Default::default()
        }
    }

    pub fn with_retryable(mut self, retryable: fn(&ProviderError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn validate(&self) -> RecognitionResult<()> {
        if self.max_attempts == 0 {
            return Err(RecognitionError::config("retry max_attempts must be at least 1"));
        }
        if self.call_timeout.is_zero() {
            return Err(RecognitionError::config("retry call_timeout must be positive"));
        }
        if self.backoff_factor.is_nan() || self.backoff_factor < 1.0 {
            return Err(RecognitionError::config("retry backoff_factor must be >= 1.0"));
        }
        if !(0.0..=1.0).contains(&self.jitter_percent) {
            return Err(RecognitionError::config(
                "retry jitter_percent must be within 0.0 - 1.0",
            ));
        }
        if self.max_delay < self.base_delay {
            return Err(RecognitionError::config(
                "retry max_delay must not be shorter than base_delay",
            ));
        }
        Ok(())
    }

    /// Delay after the given failed attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_secs_f64() * 1000.0;
        let max_ms = self.max_delay.as_secs_f64() * 1000.0;

        // Cap the exponent; 2^31 of anything is already past max_delay
        let exp = attempt.min(31) as i32;
        let delay_ms = (base_ms * self.backoff_factor.powi(exp)).min(max_ms);

        let jitter = if self.jitter_percent > 0.0 && delay_ms > 0.0 {
            let range = delay_ms * self.jitter_percent;
            rand::rng().random_range(-range..=range)
        } else {
            0.0
        };

        Duration::from_millis((delay_ms + jitter).max(0.0) as u64)
    }
}

/// Why a retried operation gave up
#[derive(Debug, Clone, PartialEq)]
pub enum RetryError {
    /// Every attempt failed with a retryable error
    Exhausted { attempts: u32, last: ProviderError },
    /// A non-retryable error ended the loop immediately
    Fatal(ProviderError),
}

impl RetryError {
    pub fn into_provider_error(self) -> ProviderError {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Fatal(err) => err,
        }
    }
}

/// Run `operation` under `policy`, retrying retryable failures with backoff.
///
/// `label` names the operation in logs.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let start = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        let result = match tokio::time::timeout(policy.call_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(policy.call_timeout)),
        };
        attempt += 1;

        let err = match result {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = label,
                        attempts = attempt,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Operation succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !(policy.retryable)(&err) {
            warn!(operation = label, attempt, error = %err, "Non-retryable failure");
            return Err(RetryError::Fatal(err));
        }

        if attempt >= max_attempts {
            warn!(
                operation = label,
                attempt,
                max_attempts,
                error = %err,
                "Operation failed after all retry attempts"
            );
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: err,
            });
        }

        let delay = policy.delay_for_attempt(attempt - 1);
        warn!(
            operation = label,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying operation after failure"
        );
        tokio::time::sleep(delay).await;
    }
}
