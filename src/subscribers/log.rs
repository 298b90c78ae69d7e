//! # LogWriter: lifecycle events as `tracing` records
//!
//! Maps each [`Event`] to one structured `tracing` record under the
//! `connvisor` target. Levels:
//! - `info`: state changes, successful attempts
//! - `warn`: failed attempts, timeouts, exhausted/aborted retries, close and subscriber failures
//! - `debug`: attempt starts, scheduled backoff, cancellation
//!
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see output.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO  connvisor: state changed connection="orders" from="initialized" to="validating"
//! WARN  connvisor: attempt failed connection="orders" phase="open" attempt=1 reason="refused"
//! DEBUG connvisor: backoff scheduled connection="orders" phase="open" attempt=1 delay_ms=5000
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event-to-tracing bridge.
#[derive(Default, Debug, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let connection = e.connection.as_deref().unwrap_or("-");
        let phase = e.phase.map(|p| p.as_str()).unwrap_or("-");
        let attempt = e.attempt.unwrap_or(0);
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::StateChanged => info!(
                target: "connvisor",
                connection,
                from = e.from.map(|s| s.as_str()).unwrap_or("-"),
                to = e.to.map(|s| s.as_str()).unwrap_or("-"),
                "state changed"
            ),
            EventKind::AttemptStarting => {
                debug!(target: "connvisor", connection, phase, attempt, "attempt starting")
            }
            EventKind::AttemptSucceeded => {
                info!(target: "connvisor", connection, phase, attempt, "attempt succeeded")
            }
            EventKind::AttemptFailed => {
                warn!(target: "connvisor", connection, phase, attempt, reason, "attempt failed")
            }
            EventKind::TimeoutHit => warn!(
                target: "connvisor",
                connection,
                phase,
                attempt,
                timeout_ms = e.timeout.map_or(0, |d| d.as_millis() as u64),
                "attempt timed out"
            ),
            EventKind::BackoffScheduled => debug!(
                target: "connvisor",
                connection,
                phase,
                attempt,
                delay_ms = e.delay.map_or(0, |d| d.as_millis() as u64),
                reason,
                "backoff scheduled"
            ),
            EventKind::RetriesExhausted => {
                warn!(target: "connvisor", connection, phase, attempt, reason, "retries exhausted")
            }
            EventKind::RetryAborted => warn!(
                target: "connvisor",
                connection,
                phase,
                attempt,
                reason,
                "fatal error, not retrying"
            ),
            EventKind::Cancelled => {
                debug!(target: "connvisor", connection, phase, attempt, "cancelled")
            }
            EventKind::CloseFailed => {
                warn!(target: "connvisor", connection, reason, "close failed")
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "connvisor", subscriber = connection, reason, "subscriber overflow")
            }
            EventKind::SubscriberPanicked => {
                warn!(target: "connvisor", subscriber = connection, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
