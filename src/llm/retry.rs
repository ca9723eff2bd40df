// ABOUTME: Shared retry policy for outbound LLM calls with exponential backoff and jitter
// ABOUTME: Retries transient error codes only, bounded by attempt budget and delay cap
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::constants::retry as retry_defaults;
use crate::errors::{AppError, AppResult};

/// Retry policy: attempt budget plus backoff schedule
///
/// Whether a failure is retryable comes from
/// [`ErrorCode::is_transient`](crate::errors::ErrorCode::is_transient), so
/// every outbound call shares one classification instead of per-call-site
/// try/catch nests. Worst-case total wait is bounded by
/// `max_delay * (max_attempts - 1)`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts, first call included
    pub max_attempts: u32,
    /// Base backoff delay
    pub base_delay: Duration,
    /// Multiplier applied per failed attempt
    pub backoff_factor: u32,
    /// Upper bound on a single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: retry_defaults::DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(retry_defaults::DEFAULT_BASE_DELAY_MS),
            backoff_factor: retry_defaults::DEFAULT_BACKOFF_FACTOR,
            max_delay: Duration::from_millis(retry_defaults::DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries (single attempt)
    #[must_use]
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Capped exponential delay for a failed attempt (1-based), before jitter
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = self.backoff_factor.saturating_pow(exponent);
        let delay = self.base_delay.saturating_mul(multiplier);
        delay.min(self.max_delay)
    }

    /// Equal jitter: half the delay fixed, half randomized
    ///
    /// Keeps the result under the capped delay while spreading concurrent
    /// retries apart.
    fn jittered(delay: Duration) -> Duration {
        let millis = delay.as_millis() as u64;
        if millis == 0 {
            return delay;
        }
        let half = millis / 2;
        let jitter = rand::thread_rng().gen_range(0..=half);
        Duration::from_millis(half + jitter)
    }

    /// Run an operation under this policy
    ///
    /// The closure is invoked once per attempt. Non-transient errors abort
    /// immediately; transient errors are retried after a jittered backoff
    /// until the attempt budget is spent, at which point the last error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns the operation's final `AppError` when it never succeeds.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let attempts = self.max_attempts.max(1);

        for attempt in 1..=attempts {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < attempts => {
                    let delay = Self::jittered(self.delay_for_attempt(attempt));
                    warn!(
                        "{operation} attempt {attempt}/{attempts} failed ({error}), retrying after {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    if error.is_transient() {
                        warn!("{operation} failed after {attempts} attempts: {error}");
                    } else {
                        warn!("{operation} failed with non-retryable error: {error}");
                    }
                    return Err(error);
                }
            }
        }

        // The loop always returns; attempts >= 1 guarantees at least one call
        Err(AppError::internal(format!(
            "{operation} retry loop exited without a result"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
            backoff_factor: 2,
            max_delay: Duration::from_millis(15_000),
        }
    }

    #[test]
    fn test_delay_schedule_doubles_from_base() {
        let policy = test_policy();
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(8000));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = test_policy();
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(15_000));
        assert_eq!(policy.delay_for_attempt(30), Duration::from_millis(15_000));
    }

    #[test]
    fn test_jitter_stays_under_delay() {
        let delay = Duration::from_millis(1000);
        for _ in 0..50 {
            let jittered = RetryPolicy::jittered(delay);
            assert!(jittered >= Duration::from_millis(500));
            assert!(jittered <= delay);
        }
    }
}
