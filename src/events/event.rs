//! # Lifecycle events emitted by a connection.
//!
//! [`EventKind`] classifies what happened:
//! - **State events**: every accepted state-machine transition
//! - **Attempt events**: one `open`/`perform` try (starting, succeeded, failed, timeout)
//! - **Retry events**: backoff scheduled, budget exhausted, aborted by a fatal error, cancelled
//! - **Subscriber events**: overflow and panics inside the fan-out
//!
//! [`Event`] carries the optional metadata (connection name, states, phase,
//! attempt number, delay, reason) each kind fills in.
//!
//! ## Ordering guarantees
//! Every event gets a process-wide sequence number (`seq`) that increases
//! monotonically. Use it to restore publish order across receivers.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use connvisor::{Event, EventKind, Phase};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_connection("orders-db")
//!     .with_phase(Phase::Open)
//!     .with_attempt(2)
//!     .with_delay(Duration::from_secs(4))
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.connection.as_deref(), Some("orders-db"));
//! assert_eq!(ev.delay, Some(Duration::from_secs(4)));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::ConnectionState;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === State machine ===
    /// A transition was accepted.
    ///
    /// Sets: `connection`, `from`, `to`.
    StateChanged,

    // === Attempts ===
    /// An `open` or `perform` attempt is starting.
    ///
    /// Sets: `connection`, `phase`, `attempt` (1-based).
    AttemptStarting,

    /// The attempt succeeded.
    ///
    /// Sets: `connection`, `phase`, `attempt`.
    AttemptSucceeded,

    /// The attempt failed.
    ///
    /// Sets: `connection`, `phase`, `attempt`, `reason`.
    AttemptFailed,

    /// The attempt exceeded the per-attempt timeout.
    ///
    /// Sets: `connection`, `phase`, `attempt`, `timeout`.
    TimeoutHit,

    // === Retry loop ===
    /// Another attempt will follow after `delay`.
    ///
    /// Sets: `connection`, `phase`, `attempt` (the one that failed), `delay`, `reason`.
    BackoffScheduled,

    /// The retry budget is spent; the last error is final.
    ///
    /// Sets: `connection`, `phase`, `attempt`, `reason`.
    RetriesExhausted,

    /// A non-retryable error stopped the loop early.
    ///
    /// Sets: `connection`, `phase`, `attempt`, `reason`.
    RetryAborted,

    /// Cancellation was observed during an attempt or a backoff sleep.
    ///
    /// Sets: `connection`, `phase`, `attempt`.
    Cancelled,

    /// Best-effort `close` reported an error during teardown.
    ///
    /// Sets: `connection`, `reason`.
    CloseFailed,

    // === Subscribers ===
    /// A subscriber panicked while handling an event.
    ///
    /// Sets: `connection` (subscriber name), `reason` (panic info).
    SubscriberPanicked,

    /// A subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `connection` (subscriber name), `reason`.
    SubscriberOverflow,
}

impl EventKind {
    /// Returns a short stable label (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::StateChanged => "state_changed",
            EventKind::AttemptStarting => "attempt_starting",
            EventKind::AttemptSucceeded => "attempt_succeeded",
            EventKind::AttemptFailed => "attempt_failed",
            EventKind::TimeoutHit => "timeout_hit",
            EventKind::BackoffScheduled => "backoff_scheduled",
            EventKind::RetriesExhausted => "retries_exhausted",
            EventKind::RetryAborted => "retry_aborted",
            EventKind::Cancelled => "cancelled",
            EventKind::CloseFailed => "close_failed",
            EventKind::SubscriberPanicked => "subscriber_panicked",
            EventKind::SubscriberOverflow => "subscriber_overflow",
        }
    }
}

/// Which connector call a retry-loop event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `Connector::open` while connecting.
    Open,
    /// `Connector::perform` while executing.
    Perform,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Open => "open",
            Phase::Perform => "perform",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Process-wide, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Connection name (subscriber name for subscriber events).
    pub connection: Option<Arc<str>>,
    /// Previous state (state events).
    pub from: Option<ConnectionState>,
    /// New state (state events).
    pub to: Option<ConnectionState>,
    /// Retry-loop phase.
    pub phase: Option<Phase>,
    /// Attempt number (1-based).
    pub attempt: Option<u32>,
    /// Backoff delay before the next attempt.
    pub delay: Option<Duration>,
    /// Per-attempt timeout that was exceeded.
    pub timeout: Option<Duration>,
    /// Human-readable reason (error message, overflow details, ...).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates an event stamped with the current time and the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            connection: None,
            from: None,
            to: None,
            phase: None,
            attempt: None,
            delay: None,
            timeout: None,
            reason: None,
        }
    }

    /// State transition event.
    pub fn state_changed(
        connection: impl Into<Arc<str>>,
        from: ConnectionState,
        to: ConnectionState,
    ) -> Self {
        let mut ev = Event::new(EventKind::StateChanged).with_connection(connection);
        ev.from = Some(from);
        ev.to = Some(to);
        ev
    }

    #[inline]
    pub fn with_connection(mut self, name: impl Into<Arc<str>>) -> Self {
        self.connection = Some(name.into());
        self
    }

    #[inline]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }

    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout = Some(d);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_connection(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_connection(subscriber)
            .with_reason(info)
    }

    /// `true` for events produced by the subscriber fan-out itself.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
