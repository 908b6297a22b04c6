//! # Exponential Backoff
//!
//! Backoff calculator for the discovery retry loop.
//! Each delay doubles the previous one, starting from the base and capped at
//! the maximum.
//!
//! ## Usage
//!
//! ```rust
//! use sso_profile_sync::backoff::ExponentialBackoff;
//! use std::time::Duration;
//!
//! let mut backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(30));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(1));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(2));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(4));
//! ```

use crate::constants::{DEFAULT_BACKOFF_MAX_MS, DEFAULT_BACKOFF_START_MS};
use std::time::Duration;

/// Doubling backoff calculator
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// First delay (for reset)
    base: Duration,
    /// Delay returned by the next call
    current: Duration,
    /// Upper bound for any single delay
    max: Duration,
}

impl ExponentialBackoff {
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            current: base,
            max,
        }
    }

    /// Get the next delay and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current.min(self.max);
        self.current = self.current.saturating_mul(2).min(self.max);
        result
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

impl Default for ExponentialBackoff {
    /// 1s base, 30s ceiling
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_BACKOFF_START_MS),
            Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
        )
    }
}
