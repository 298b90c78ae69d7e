//! Retry policies.
//!
//! This module groups the knobs that control **whether** a failed `open` or
//! `perform` is attempted again and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`RetryPolicy`] retry budget and backoff growth (interval / factor / cap)
//! - [`JitterPolicy`] randomization strategy to avoid synchronized retries
//!
//! ## Quick wiring
//! ```text
//! ConnectionConfig { max_retries, retry_interval, retry_backoff, retry_jitter }
//!      └─► RetryPolicy::from_config()
//!           └─► the connection's retry loop uses:
//!                - allows_retry(n) to stop after max_retries + 1 attempts
//!                - next(k) to schedule retry k
//! ```

mod backoff;
mod jitter;

pub use backoff::RetryPolicy;
pub use jitter::JitterPolicy;
