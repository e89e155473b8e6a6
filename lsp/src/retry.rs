//! Readiness polling policy for the IDE daemon.
//!
//! - Attempts: 6 `cwd` readiness checks
//! - Initial delay: 100ms
//! - Backoff: doubling per attempt
//! - Max delay: 2 seconds

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of readiness checks, including the first.
    pub max_attempts: u32,
    /// Delay before the first check.
    pub initial_delay: Duration,
    /// Maximum backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

/// Delay to wait before check number `backoff_step` (0-based).
///
/// `initial_delay * 2^backoff_step`, capped at `max_delay`.
#[must_use]
pub fn calculate_retry_delay(backoff_step: u32, config: &RetryConfig) -> Duration {
    let factor = 2u32.saturating_pow(backoff_step);
    config
        .initial_delay
        .saturating_mul(factor)
        .min(config.max_delay)
}
