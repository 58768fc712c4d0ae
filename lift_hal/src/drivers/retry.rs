//! Reconnect-with-backoff policy for read operations.
//!
//! Reads are idempotent and may be retried after the connection is reopened.
//! Writes never go through this policy: a failed stop must surface at once.

use lift_common::frame::config::ReconnectConfig;
use lift_common::port::PortError;
use std::time::Duration;

/// How many times to retry a failed read and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Set to 0 to disable retries.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled per retry.
    pub initial_backoff: Duration,
    /// Upper bound on the delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for RetryPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub const fn none() -> Self {
        Self {
            max_attempts: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Whether `error` after `retries` earlier retries warrants another try.
    ///
    /// Protocol errors are never retried: the device answered.
    pub fn should_retry(&self, error: &PortError, retries: u32) -> bool {
        error.is_transport() && retries < self.max_attempts
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}
