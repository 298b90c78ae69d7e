//! # Retry policy with exponential backoff.
//!
//! [`RetryPolicy`] decides **whether** another attempt is allowed and **how long**
//! to wait before it. It is parameterized by:
//! - [`RetryPolicy::max_retries`] the number of retries after the first try;
//! - [`RetryPolicy::interval`] the delay before the first retry;
//! - [`RetryPolicy::factor`] the multiplicative growth factor;
//! - [`RetryPolicy::max`] an optional cap on a single delay;
//! - [`RetryPolicy::jitter`] the randomization applied to the computed delay.
//!
//! The delay before retry `k` (1-based) is `interval × factor^(k-1)`, clamped to
//! `max` when set, then jitter is applied. The base is derived purely from `k`,
//! so jitter output never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use connvisor::{JitterPolicy, RetryPolicy};
//!
//! let policy = RetryPolicy {
//!     max_retries: 3,
//!     interval: Duration::from_millis(100),
//!     factor: 2.0,
//!     max: None,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(policy.budget(), 4);
//! assert_eq!(policy.next(1), Duration::from_millis(100));
//! assert_eq!(policy.next(2), Duration::from_millis(200));
//! assert_eq!(policy.next(3), Duration::from_millis(400));
//! ```

use std::time::Duration;

use crate::config::ConnectionConfig;
use crate::policies::jitter::JitterPolicy;

/// Bounded retry policy with exponential backoff.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt (`0` = single attempt).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub interval: Duration,
    /// Multiplicative growth factor (`>= 1.0`).
    pub factor: f64,
    /// Optional cap for a single delay (`None` = uncapped).
    pub max: Option<Duration>,
    /// Jitter policy.
    pub jitter: JitterPolicy,
}

impl Default for RetryPolicy {
    /// Returns a policy with:
    /// - `max_retries = 3`;
    /// - `interval = 5s`;
    /// - `factor = 1.5`;
    /// - no cap, full jitter.
    fn default() -> Self {
        Self {
            max_retries: 3,
            interval: Duration::from_secs(5),
            factor: 1.5,
            max: None,
            jitter: JitterPolicy::Full,
        }
    }
}

impl RetryPolicy {
    /// Builds the policy described by a connection configuration.
    pub fn from_config(cfg: &ConnectionConfig) -> Self {
        Self {
            max_retries: cfg.max_retries(),
            interval: cfg.retry_interval(),
            factor: cfg.retry_backoff(),
            max: cfg.retry_max_delay(),
            jitter: JitterPolicy::from_flag(cfg.retry_jitter()),
        }
    }

    /// Total permitted attempts for one logical operation (`max_retries + 1`).
    #[inline]
    pub fn budget(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns `true` if another attempt may follow `attempts_made` attempts.
    #[inline]
    pub fn allows_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.budget()
    }

    /// Computes the un-jittered delay before retry `retry` (1-based).
    ///
    /// `retry = 0` is treated as the first retry. Overflowing or non-finite
    /// values saturate to `max`, or to [`Duration::MAX`] when uncapped.
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.interval.as_secs_f64() * self.factor.powi(exp);
        let ceiling = self.max.unwrap_or(Duration::MAX);

        if !secs.is_finite() || secs < 0.0 {
            return ceiling;
        }
        Duration::try_from_secs_f64(secs)
            .unwrap_or(Duration::MAX)
            .min(ceiling)
    }

    /// Computes the effective delay before retry `retry` (1-based), jitter applied.
    pub fn next(&self, retry: u32) -> Duration {
        self.jitter.apply(self.base_delay(retry))
    }
}
