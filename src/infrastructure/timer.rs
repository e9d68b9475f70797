use crate::types::{MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY, RECONNECT_MAX_DELAY};
use std::time::Duration;

/// Reconnection schedule with capped exponential backoff.
///
/// The attempt counter itself lives with the client state; this type only
/// turns a count into a delay and decides when to give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectBackoff {
    base_delay_ms: u64,
    max_delay_ms: u64,
    max_attempts: u32,
}

impl ReconnectBackoff {
    pub fn new(base_delay_ms: u64, max_delay_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms,
            max_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `min(base * 2^attempts, max)`
    pub fn delay_for_attempt(&self, attempts: u32) -> Duration {
        let multiplier = 1_u64.checked_shl(attempts).unwrap_or(u64::MAX);
        let delay = self
            .base_delay_ms
            .saturating_mul(multiplier)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Next delay, or `None` once `attempts` reached the limit.
    pub fn next_delay(&self, attempts: u32) -> Option<Duration> {
        if attempts >= self.max_attempts {
            None
        } else {
            Some(self.delay_for_attempt(attempts))
        }
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(
            RECONNECT_BASE_DELAY,
            RECONNECT_MAX_DELAY,
            MAX_RECONNECT_ATTEMPTS,
        )
    }
}
