//! # Retry loop for connector calls.
//!
//! Drives `open` and `perform` through [`run_once`] under a [`RetryPolicy`].
//! One loop serves one call: it runs attempts sequentially until one succeeds
//! or a stop condition is reached.
//!
//! ```text
//! loop {
//!   ├─► token cancelled?            → Stop::Cancelled
//!   ├─► run_once()  ── Ok           → done
//!   └─► Err(e):
//!         ├─► Canceled               → Cancelled event, Stop::Cancelled
//!         ├─► not retryable          → RetryAborted, Stop::Fatal
//!         ├─► perform + Disconnected → RetryAborted, Stop::ConnectionLost
//!         ├─► budget spent           → RetriesExhausted, Stop::Exhausted
//!         └─► BackoffScheduled ─► sleep(delay) or token → Stop::Cancelled
//! }
//! ```
//!
//! ## Rules
//! - Attempts never overlap.
//! - At most `max_retries + 1` attempts per call.
//! - The delay before retry `n` comes from [`RetryPolicy::next`]`(n)`.
//! - Cancellation aborts both attempts and backoff sleeps.

use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use super::runner::{AttemptScope, run_once};
use crate::config::ConnectionConfig;
use crate::connectors::Connector;
use crate::error::ConnectorError;
use crate::events::{Bus, EventKind, Phase};
use crate::policies::RetryPolicy;

/// Why a retry loop gave up.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stop {
    /// The token fired.
    Cancelled,
    /// A non-retryable error.
    Fatal(ConnectorError),
    /// The handle died while performing.
    ConnectionLost(ConnectorError),
    /// Every attempt in the budget failed; holds the last error.
    Exhausted(ConnectorError),
}

impl Stop {
    /// Final connector error, if the loop did not stop for cancellation.
    pub(crate) fn into_error(self) -> Option<ConnectorError> {
        match self {
            Stop::Cancelled => None,
            Stop::Fatal(e) | Stop::ConnectionLost(e) | Stop::Exhausted(e) => Some(e),
        }
    }
}

/// Result of one retry loop.
#[derive(Debug)]
pub(crate) struct Attempted<T> {
    /// Attempts started.
    pub attempts: u32,
    /// Backoff sleeps that completed.
    pub retries: u32,
    pub result: Result<T, Stop>,
}

/// Shared inputs of a retry loop.
pub(crate) struct RetryLoop<'a> {
    pub policy: RetryPolicy,
    pub timeout: Option<Duration>,
    pub token: &'a CancellationToken,
    pub bus: &'a Bus,
    pub connection: &'a Arc<str>,
}

impl RetryLoop<'_> {
    fn scope(&self, phase: Phase) -> AttemptScope<'_> {
        AttemptScope {
            bus: self.bus,
            connection: self.connection,
            phase,
        }
    }

    /// Opens a handle, retrying per policy.
    pub(crate) async fn open<C: Connector>(
        &self,
        connector: &C,
        config: &ConnectionConfig,
    ) -> Attempted<C::Handle> {
        let scope = self.scope(Phase::Open);
        let mut attempts = 0;
        let mut retries = 0;

        loop {
            if self.token.is_cancelled() {
                return self.cancelled(scope, attempts, retries);
            }
            attempts += 1;
            let fut = connector.open(config);
            let err = match run_once(scope, self.token, self.timeout, attempts, fut).await {
                Ok(handle) => {
                    return Attempted {
                        attempts,
                        retries,
                        result: Ok(handle),
                    };
                }
                Err(e) => e,
            };
            if let Some(stop) = self.after_failure(scope, err, attempts).await {
                return Attempted {
                    attempts,
                    retries,
                    result: Err(stop),
                };
            }
            retries += 1;
        }
    }

    /// Performs one operation on an open handle, retrying per policy.
    pub(crate) async fn perform<C: Connector>(
        &self,
        connector: &C,
        handle: &mut C::Handle,
        operation: &C::Operation,
    ) -> Attempted<C::Output> {
        let scope = self.scope(Phase::Perform);
        let mut attempts = 0;
        let mut retries = 0;

        loop {
            if self.token.is_cancelled() {
                return self.cancelled(scope, attempts, retries);
            }
            attempts += 1;
            let fut = connector.perform(handle, operation);
            let err = match run_once(scope, self.token, self.timeout, attempts, fut).await {
                Ok(out) => {
                    return Attempted {
                        attempts,
                        retries,
                        result: Ok(out),
                    };
                }
                Err(e) => e,
            };
            if let Some(stop) = self.after_failure(scope, err, attempts).await {
                return Attempted {
                    attempts,
                    retries,
                    result: Err(stop),
                };
            }
            retries += 1;
        }
    }

    fn cancelled<T>(&self, scope: AttemptScope<'_>, attempts: u32, retries: u32) -> Attempted<T> {
        scope.publish(scope.event(EventKind::Cancelled, attempts));
        Attempted {
            attempts,
            retries,
            result: Err(Stop::Cancelled),
        }
    }

    /// Decides what follows a failed attempt. `None` means the backoff sleep
    /// completed and the next attempt may start.
    async fn after_failure(
        &self,
        scope: AttemptScope<'_>,
        err: ConnectorError,
        attempts: u32,
    ) -> Option<Stop> {
        if matches!(err, ConnectorError::Canceled) {
            scope.publish(scope.event(EventKind::Cancelled, attempts));
            return Some(Stop::Cancelled);
        }
        if !err.is_retryable() {
            scope.publish(
                scope
                    .event(EventKind::RetryAborted, attempts)
                    .with_reason(err.to_string()),
            );
            return Some(Stop::Fatal(err));
        }
        if scope.phase == Phase::Perform && err.is_connection_fatal() {
            scope.publish(
                scope
                    .event(EventKind::RetryAborted, attempts)
                    .with_reason(err.to_string()),
            );
            return Some(Stop::ConnectionLost(err));
        }
        if !self.policy.allows_retry(attempts) {
            scope.publish(
                scope
                    .event(EventKind::RetriesExhausted, attempts)
                    .with_reason(err.to_string()),
            );
            return Some(Stop::Exhausted(err));
        }

        let delay = self.policy.next(attempts);
        scope.publish(
            scope
                .event(EventKind::BackoffScheduled, attempts)
                .with_delay(delay)
                .with_reason(err.to_string()),
        );

        let sleep = time::sleep(delay);
        tokio::pin!(sleep);
        select! {
            _ = &mut sleep => None,
            _ = self.token.cancelled() => {
                scope.publish(scope.event(EventKind::Cancelled, attempts));
                Some(Stop::Cancelled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::ConnectorFn;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn policy(max_retries: u32) -> RetryPolicy {
        let cfg = ConnectionConfig::builder("t", "h")
            .max_retries(max_retries)
            .retry_interval(Duration::from_secs(1))
            .retry_backoff(2.0)
            .retry_jitter(false)
            .build();
        RetryPolicy::from_config(&cfg)
    }

    /// Open fails with `err` for the first `failures` calls, then succeeds.
    fn flaky(
        failures: u32,
        err: ConnectorError,
    ) -> (Arc<AtomicU32>, impl Connector<Handle = u32, Operation = (), Output = ()>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let conn = ConnectorFn::new(
            "flaky",
            move |_cfg: ConnectionConfig| {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                let err = err.clone();
                async move {
                    if n <= failures {
                        Err(err)
                    } else {
                        Ok(n)
                    }
                }
            },
            |_h: u32, _op: ()| async { Ok::<(), ConnectorError>(()) },
        );
        (calls, conn)
    }

    #[tokio::test(start_paused = true)]
    async fn test_exponential_delays_then_success() {
        let (calls, conn) = flaky(2, ConnectorError::fail("refused"));
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let token = CancellationToken::new();
        let name: Arc<str> = Arc::from("t");
        let lp = RetryLoop {
            policy: policy(3),
            timeout: None,
            token: &token,
            bus: &bus,
            connection: &name,
        };

        let started = Instant::now();
        let cfg = ConnectionConfig::builder("t", "h").build();
        let out = lp.open(&conn, &cfg).await;

        assert_eq!(out.result, Ok(3));
        assert_eq!(out.attempts, 3);
        assert_eq!(out.retries, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(3));

        let mut delays = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::BackoffScheduled {
                delays.push(ev.delay.unwrap());
            }
        }
        assert_eq!(delays, vec![Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_is_max_retries_plus_one() {
        let (calls, conn) = flaky(u32::MAX, ConnectorError::fail("down"));
        let bus = Bus::new(64);
        let token = CancellationToken::new();
        let name: Arc<str> = Arc::from("t");
        let lp = RetryLoop {
            policy: policy(2),
            timeout: None,
            token: &token,
            bus: &bus,
            connection: &name,
        };

        let out = lp.open(&conn, &ConnectionConfig::builder("t", "h").build()).await;
        assert_eq!(
            out.result.unwrap_err(),
            Stop::Exhausted(ConnectorError::fail("down"))
        );
        assert_eq!(out.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_stops_after_one_attempt() {
        let (calls, conn) = flaky(u32::MAX, ConnectorError::fatal("bad password"));
        let bus = Bus::new(64);
        let token = CancellationToken::new();
        let name: Arc<str> = Arc::from("t");
        let lp = RetryLoop {
            policy: policy(5),
            timeout: None,
            token: &token,
            bus: &bus,
            connection: &name,
        };

        let out = lp.open(&conn, &ConnectionConfig::builder("t", "h").build()).await;
        assert!(matches!(out.result, Err(Stop::Fatal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let (calls, conn) = flaky(u32::MAX, ConnectorError::fail("down"));
        let bus = Bus::new(64);
        let token = CancellationToken::new();
        let name: Arc<str> = Arc::from("t");
        let lp = RetryLoop {
            policy: policy(10),
            timeout: None,
            token: &token,
            bus: &bus,
            connection: &name,
        };

        let canceller = token.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(1500)).await;
            canceller.cancel();
        });

        let out = lp.open(&conn, &ConnectionConfig::builder("t", "h").build()).await;
        assert_eq!(out.result.unwrap_err(), Stop::Cancelled);
        // attempt 1 at t=0, attempt 2 at t=1s, cancelled during the 2s sleep
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_perform_connection_lost_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let conn = ConnectorFn::new(
            "lossy",
            |_cfg: ConnectionConfig| async { Ok::<_, ConnectorError>(()) },
            move |_h: (), _op: ()| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ConnectorError::disconnected("reset by peer")) }
            },
        );
        let bus = Bus::new(64);
        let token = CancellationToken::new();
        let name: Arc<str> = Arc::from("t");
        let lp = RetryLoop {
            policy: policy(3),
            timeout: None,
            token: &token,
            bus: &bus,
            connection: &name,
        };

        let out = lp.perform(&conn, &mut (), &()).await;
        assert!(matches!(out.result, Err(Stop::ConnectionLost(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
