//! Reconnect backoff policy.
//!
//! Pure math, no timers: the lifecycle manager owns the attempt counter and
//! the actual sleeping. Delay for 1-indexed attempt `n` is
//! `base_delay * 2^(n-1)`, so the defaults produce 1s, 2s, 4s, 8s, 16s.

use std::time::Duration;

/// Default maximum number of consecutive reconnect attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default base delay before the first reconnect attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Whether attempt `n` (1-indexed) is still within budget.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }

    /// Backoff delay for attempt `n` (1-indexed). Attempt 0 is treated as 1.
    /// The shift saturates so absurd attempt numbers cannot overflow.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exp)
    }
}
