//! Exponential backoff schedule
//!
//! The delay before retry `i` (zero-based, counting failed attempts) is
//! `base * multiplier^i`, optionally capped. There is no jitter: the same
//! schedule always yields the same delays.

use std::time::Duration;

/// Deterministic delay schedule between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffSchedule {
    /// Delay after the first failed attempt
    base: Duration,

    /// Growth factor between successive delays
    multiplier: u32,

    /// Optional ceiling on any single delay
    max_delay: Option<Duration>,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1000),
            multiplier: 2,
            max_delay: None,
        }
    }
}

impl BackoffSchedule {
    /// Create an uncapped schedule
    pub fn new(base: Duration, multiplier: u32) -> Self {
        Self {
            base,
            multiplier,
            max_delay: None,
        }
    }

    /// Cap every delay at `max_delay`
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Delay to wait after the failed attempt with the given zero-based index
    ///
    /// Saturates at [`Duration::MAX`] instead of overflowing.
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let nanos = u128::from(self.multiplier)
            .checked_pow(attempt_index)
            .and_then(|factor| factor.checked_mul(self.base.as_nanos()));

        let delay = nanos
            .and_then(|n| u64::try_from(n).ok())
            .map(Duration::from_nanos)
            .unwrap_or(Duration::MAX);

        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Every delay a request with `max_attempts` attempts could wait through
    pub fn delays(&self, max_attempts: u32) -> Vec<Duration> {
        (0..max_attempts.saturating_sub(1))
            .map(|attempt_index| self.delay_for(attempt_index))
            .collect()
    }
}
