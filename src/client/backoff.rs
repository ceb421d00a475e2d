//! # Reconnect Backoff
//!
//! Exponential backoff between reconnect attempts: the delay doubles per
//! attempt from `base` and is capped at `max`. Attempt numbering starts at
//! zero, so the default policy waits 1s, 2s, 4s ... 30s, 30s.

use std::time::Duration;

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub max: Duration,
    /// Give up after this many consecutive failures; `None` retries until
    /// stopped
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_DELAY,
            max: DEFAULT_MAX_DELAY,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Delay before retrying after failed attempt number `attempt`
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Whether another attempt may follow `failures` consecutive failures
    pub fn allows(&self, failures: u32) -> bool {
        self.max_attempts.map_or(true, |max| failures < max)
    }
}
