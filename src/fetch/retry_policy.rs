//! Retry policy for outbound requests.
//!
//! Implements exponential backoff with configurable parameters.

use super::FetchError;
use crate::config::UpstreamSettings;
use std::time::Duration;

/// Retry policy implementing exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Cap for exponential growth, in milliseconds.
    pub max_backoff_ms: u64,
    /// Multiplier applied to backoff after each retry.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn new(settings: &UpstreamSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_backoff_ms: settings.initial_backoff_ms,
            ..Default::default()
        }
    }

    /// Whether a request that failed on attempt number `attempt` (zero-based)
    /// should be tried again.
    ///
    /// Returns true if:
    /// - The error is retryable (no response was received)
    /// - Another attempt is still allowed
    pub fn should_retry(&self, error: &FetchError, attempt: u32) -> bool {
        error.is_retryable() && attempt + 1 < self.max_attempts
    }

    /// Delay before retrying after attempt number `attempt`:
    /// `initial_backoff * multiplier^attempt`, capped at `max_backoff_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let backoff = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(backoff.min(self.max_backoff_ms as f64) as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
            backoff_multiplier: 2.0,
        }
    }
}
