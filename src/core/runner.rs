//! # Run a single connector attempt.
//!
//! Executes one `open` or `perform` future with an optional per-attempt timeout,
//! racing it against the connection's cancellation token, and publishes the
//! attempt events to the [`Bus`].
//!
//! ## Event flow
//! ```text
//! AttemptStarting ─► future ─► Ok      ─► AttemptSucceeded
//!                          ─► Err(e)  ─► AttemptFailed
//!                          ─► timeout ─► TimeoutHit ─► AttemptFailed
//!                          ─► token   ─► (nothing; the retry loop publishes Cancelled)
//! ```
//!
//! ## Rules
//! - A zero timeout means no timeout.
//! - On timeout the attempt future is dropped; the connector sees it as cancelled.
//! - Cancellation wins ties with completion (`biased` select).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::ConnectorError;
use crate::events::{Bus, Event, EventKind, Phase};

/// Where an attempt's events go and how they are labelled.
#[derive(Clone, Copy)]
pub(crate) struct AttemptScope<'a> {
    pub bus: &'a Bus,
    pub connection: &'a Arc<str>,
    pub phase: Phase,
}

impl AttemptScope<'_> {
    pub(crate) fn event(&self, kind: EventKind, attempt: u32) -> Event {
        Event::new(kind)
            .with_connection(Arc::clone(self.connection))
            .with_phase(self.phase)
            .with_attempt(attempt)
    }

    pub(crate) fn publish(&self, ev: Event) {
        self.bus.publish(ev);
    }
}

/// Executes one attempt, publishing its lifecycle events.
pub(crate) async fn run_once<T, F>(
    scope: AttemptScope<'_>,
    token: &CancellationToken,
    timeout: Option<Duration>,
    attempt: u32,
    fut: F,
) -> Result<T, ConnectorError>
where
    F: Future<Output = Result<T, ConnectorError>>,
{
    scope.publish(scope.event(EventKind::AttemptStarting, attempt));

    let timed = async {
        match timeout.filter(|d| !d.is_zero()) {
            Some(dur) => match time::timeout(dur, fut).await {
                Ok(res) => res,
                Err(_elapsed) => {
                    scope.publish(scope.event(EventKind::TimeoutHit, attempt).with_timeout(dur));
                    Err(ConnectorError::Timeout { timeout: dur })
                }
            },
            None => fut.await,
        }
    };

    let res = select! {
        biased;
        _ = token.cancelled() => Err(ConnectorError::Canceled),
        res = timed => res,
    };

    match &res {
        Ok(_) => scope.publish(scope.event(EventKind::AttemptSucceeded, attempt)),
        Err(ConnectorError::Canceled) => {}
        Err(e) => scope.publish(
            scope
                .event(EventKind::AttemptFailed, attempt)
                .with_reason(e.to_string()),
        ),
    }
    res
}
