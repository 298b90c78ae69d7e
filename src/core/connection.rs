//! # Connection: lifecycle orchestrator over one connector.
//!
//! [`Connection`] owns a [`ConnectionConfig`], a [`Connector`] and, once opened,
//! the connector's handle. It drives the state machine, runs `open` and
//! `perform` through the retry loop, records every finished operation and
//! publishes lifecycle events on its [`Bus`].
//!
//! ## Flow
//! ```text
//! execute(op)
//!   ├─► Error / Disconnected ──────────────► Unusable
//!   ├─► connect()
//!   │     Initialized ─► Validating ── invalid ─► Error (Configuration)
//!   │                        └─► Connecting ─► retry(open) ─┬─► Connected
//!   │                                                       └─► Error (Connect / Cancelled)
//!   └─► retry(perform)
//!         ├─► Ok                 ─► record Success
//!         ├─► exhausted / fatal  ─► record Failure, stay Connected
//!         ├─► transport lost     ─► record Failure, close handle, Error
//!         └─► cancelled          ─► nothing recorded, close handle, Error
//! ```
//!
//! ## Rules
//! - Mutating methods take `&mut self`; one caller drives a connection at a time.
//! - Every lifecycle error is returned, appended to [`Connection::errors`] and
//!   counted in [`Connection::metrics`].
//! - `disconnect()` never fails.
//! - Dropping a connection drops an open handle without calling `close`.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::broadcast;
use tokio::time::{self, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

use super::builder::ConnectionBuilder;
use super::metrics::{ConnectionInfo, ConnectionMetrics};
use super::retry::{RetryLoop, Stop};
use super::state::{ConnectionState, StateMachine};
use crate::config::ConnectionConfig;
use crate::connectors::Connector;
use crate::error::{ConnectorError, ErrorContext, LifecycleError};
use crate::events::{Bus, Event, EventKind};
use crate::policies::RetryPolicy;
use crate::results::{ExecutionResult, Outcome, ResultLog};

/// A managed connection to one backend.
///
/// # Example
/// ```
/// use connvisor::{Connection, ConnectionConfig, ConnectionState, ConnectorError, ConnectorFn};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), connvisor::LifecycleError> {
/// let connector = ConnectorFn::new(
///     "upper",
///     |_cfg: ConnectionConfig| async { Ok::<_, ConnectorError>(()) },
///     |_h: (), text: String| async move { Ok::<_, ConnectorError>(text.to_uppercase()) },
/// );
/// let config = ConnectionConfig::builder("demo", "localhost").build();
/// let mut conn = Connection::new(config, connector);
///
/// let res = conn.execute("hello".to_string()).await?;
/// assert_eq!(res.output().map(String::as_str), Some("HELLO"));
/// assert_eq!(conn.status(), ConnectionState::Connected);
///
/// conn.disconnect().await;
/// assert_eq!(conn.status(), ConnectionState::Disconnected);
/// # Ok(())
/// # }
/// ```
pub struct Connection<C: Connector> {
    id: Uuid,
    name: Arc<str>,
    config: ConnectionConfig,
    connector: C,
    policy: RetryPolicy,
    handle: Option<C::Handle>,
    state: StateMachine,
    results: ResultLog<C::Output>,
    errors: Vec<LifecycleError>,
    metrics: ConnectionMetrics,
    token: CancellationToken,
    bus: Bus,
    _listener: Option<DropGuard>,
}

impl<C: Connector> Connection<C> {
    /// Connection without subscribers, using a fresh cancellation token.
    pub fn new(config: ConnectionConfig, connector: C) -> Self {
        ConnectionBuilder::new(config, connector).build()
    }

    /// Starts a [`ConnectionBuilder`].
    pub fn builder(config: ConnectionConfig, connector: C) -> ConnectionBuilder<C> {
        ConnectionBuilder::new(config, connector)
    }

    pub(crate) fn from_parts(
        config: ConnectionConfig,
        connector: C,
        token: CancellationToken,
        bus: Bus,
        listener: Option<DropGuard>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: Arc::from(config.name()),
            policy: RetryPolicy::from_config(&config),
            config,
            connector,
            handle: None,
            state: StateMachine::new(),
            results: ResultLog::new(),
            errors: Vec::new(),
            metrics: ConnectionMetrics::default(),
            token,
            bus,
            _listener: listener,
        }
    }

    /// Validates the configuration and opens the backend connection.
    ///
    /// Idempotent once `Connected`.
    ///
    /// # Errors
    /// - [`LifecycleError::Configuration`]: validation failed; state is `Error`.
    /// - [`LifecycleError::Connect`]: retries exhausted or a fatal open error; state is `Error`.
    /// - [`LifecycleError::Cancelled`]: the token fired while opening; state is `Error`.
    /// - [`LifecycleError::Unusable`]: the connection is already `Error` or `Disconnected`.
    pub async fn connect(&mut self) -> Result<(), LifecycleError> {
        loop {
            match self.state.current() {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Initialized => self.advance(ConnectionState::Validating)?,
                ConnectionState::Validating => match self.config.validate() {
                    Ok(()) => self.advance(ConnectionState::Connecting)?,
                    Err(source) => {
                        let err = LifecycleError::Configuration {
                            source,
                            context: self.context(None, 0),
                        };
                        return Err(self.fail_terminal(err));
                    }
                },
                ConnectionState::Connecting => return self.open().await,
                state @ (ConnectionState::Disconnecting
                | ConnectionState::Disconnected
                | ConnectionState::Error) => return Err(self.unusable(state)),
            }
        }
    }

    /// Performs one operation, connecting first if needed.
    ///
    /// Returns the recorded result, which is also [`Connection::last_result`].
    ///
    /// # Errors
    /// - Any error from [`Connection::connect`].
    /// - [`LifecycleError::Execution`]: retries exhausted or a fatal error (state stays
    ///   `Connected`), or the transport was lost (state becomes `Error`). A `Failure`
    ///   result is recorded in each case.
    /// - [`LifecycleError::Cancelled`]: the token fired; nothing is recorded, the
    ///   handle is closed and the state becomes `Error`. The token cannot be
    ///   reset, so the connection would refuse every later call anyway.
    pub async fn execute(
        &mut self,
        operation: C::Operation,
    ) -> Result<&ExecutionResult<C::Output>, LifecycleError> {
        let state = self.state.current();
        if matches!(
            state,
            ConnectionState::Error | ConnectionState::Disconnected | ConnectionState::Disconnecting
        ) {
            return Err(self.unusable(state));
        }
        self.connect().await?;

        let description = self.connector.describe(&operation);
        let started = Instant::now();
        let attempted = match self.handle.as_mut() {
            Some(handle) => {
                let retry = RetryLoop {
                    policy: self.policy,
                    timeout: self.config.attempt_timeout(),
                    token: &self.token,
                    bus: &self.bus,
                    connection: &self.name,
                };
                retry.perform(&self.connector, handle, &operation).await
            }
            None => {
                let state = self.state.current();
                return Err(self.unusable(state));
            }
        };
        let elapsed = started.elapsed();
        let attempts = attempted.attempts;
        self.metrics.total_retries += u64::from(attempted.retries);

        match attempted.result {
            Ok(output) => {
                self.metrics.operations_succeeded += 1;
                Ok(self
                    .results
                    .record(description, attempts, elapsed, Outcome::Success(output)))
            }
            Err(Stop::Cancelled) => {
                let context = self.context(Some(description), attempts);
                self.close_handle().await;
                Err(self.fail_terminal(LifecycleError::Cancelled { context }))
            }
            Err(Stop::ConnectionLost(source)) => {
                let context = self.context(Some(description.clone()), attempts);
                let err = LifecycleError::Execution { source, context };
                self.record_failure(description, attempts, elapsed, &err);
                self.close_handle().await;
                Err(self.fail_terminal(err))
            }
            Err(Stop::Fatal(source) | Stop::Exhausted(source)) => {
                let context = self.context(Some(description.clone()), attempts);
                let err = LifecycleError::Execution { source, context };
                self.record_failure(description, attempts, elapsed, &err);
                Err(self.fail(err))
            }
        }
    }

    /// Tears the connection down. Never fails.
    ///
    /// - `Disconnected`: no-op.
    /// - `Error`: closes a lingering handle; the state stays `Error`.
    /// - otherwise: `Disconnecting`, close, `Disconnected`.
    ///
    /// Close errors are published as [`EventKind::CloseFailed`] and counted.
    pub async fn disconnect(&mut self) {
        match self.state.current() {
            ConnectionState::Disconnected => return,
            ConnectionState::Error => {
                self.close_handle().await;
                return;
            }
            ConnectionState::Disconnecting => {}
            _ => self.advance_or_skip(ConnectionState::Disconnecting, None),
        }
        self.close_handle().await;
        self.metrics.record_disconnected();
        self.advance_or_skip(ConnectionState::Disconnected, None);
    }

    /// Most recent result.
    ///
    /// # Errors
    /// [`LifecycleError::NoResults`] when the history is empty.
    pub fn last_result(&self) -> Result<&ExecutionResult<C::Output>, LifecycleError> {
        self.results.last()
    }

    /// Every recorded result in completion order.
    pub fn results(&self) -> &[ExecutionResult<C::Output>] {
        self.results.all()
    }

    /// Empties the result history.
    pub fn reset_results(&mut self) {
        self.results.clear();
    }

    #[inline]
    pub fn status(&self) -> ConnectionState {
        self.state.current()
    }

    /// When the current state was entered.
    pub fn status_since(&self) -> SystemTime {
        self.state.changed_at()
    }

    /// `true` while a handle is open and the state is `Connected`.
    pub fn is_connected(&self) -> bool {
        self.handle.is_some() && self.state.current() == ConnectionState::Connected
    }

    pub fn metrics(&self) -> &ConnectionMetrics {
        &self.metrics
    }

    /// Every lifecycle error surfaced so far, oldest first.
    pub fn errors(&self) -> &[LifecycleError] {
        &self.errors
    }

    /// Owned summary of identity, configuration and counters.
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            name: self.config.name().to_string(),
            backend: self.config.backend().as_label(),
            connector: self.connector.name().to_string(),
            status: self.state.current(),
            connected: self.is_connected(),
            timeout: self.config.timeout(),
            max_retries: self.config.max_retries(),
            retry_interval: self.config.retry_interval(),
            ssl_enabled: self.config.ssl_enabled(),
            results: self.results.len(),
            metrics: self.metrics.clone(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Retry policy derived from the configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Token that aborts in-flight attempts and backoff sleeps when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Raw receiver for this connection's events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    async fn open(&mut self) -> Result<(), LifecycleError> {
        let started = Instant::now();
        let retry = RetryLoop {
            policy: self.policy,
            timeout: self.config.attempt_timeout(),
            token: &self.token,
            bus: &self.bus,
            connection: &self.name,
        };
        let attempted = retry.open(&self.connector, &self.config).await;

        let attempts = attempted.attempts;
        self.metrics.total_retries += u64::from(attempted.retries);
        match attempted.result {
            Ok(handle) => {
                self.metrics.failed_connections += u64::from(attempts.saturating_sub(1));
                self.metrics.record_connected(started.elapsed());
                self.handle = Some(handle);
                self.advance(ConnectionState::Connected)
            }
            Err(stop) => {
                self.metrics.failed_connections += u64::from(attempts);
                let context = self.context(None, attempts);
                let err = match stop.into_error() {
                    Some(source) => LifecycleError::Connect { source, context },
                    None => LifecycleError::Cancelled { context },
                };
                Err(self.fail_terminal(err))
            }
        }
    }

    /// Best-effort close of the current handle, bounded by the attempt timeout.
    async fn close_handle(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let close = self.connector.close(handle);
        let res = match self.config.attempt_timeout() {
            Some(dur) => time::timeout(dur, close)
                .await
                .unwrap_or_else(|_| Err(ConnectorError::Timeout { timeout: dur })),
            None => close.await,
        };
        if let Err(e) = res {
            self.metrics.record_error(SystemTime::now());
            self.bus.publish(
                Event::new(EventKind::CloseFailed)
                    .with_connection(Arc::clone(&self.name))
                    .with_reason(e.to_string()),
            );
        }
    }

    fn record_failure(
        &mut self,
        operation: String,
        attempts: u32,
        elapsed: std::time::Duration,
        err: &LifecycleError,
    ) {
        self.metrics.operations_failed += 1;
        self.results.record(
            operation,
            attempts,
            elapsed,
            Outcome::Failure {
                label: err.as_label(),
                message: err.to_string(),
            },
        );
    }

    /// Moves the state machine and publishes the change.
    fn advance(&mut self, next: ConnectionState) -> Result<(), LifecycleError> {
        let from = self.state.transition(next)?;
        self.bus
            .publish(Event::state_changed(Arc::clone(&self.name), from, next));
        Ok(())
    }

    /// Like [`Self::advance`], but a rejected transition is ignored.
    fn advance_or_skip(&mut self, next: ConnectionState, reason: Option<&LifecycleError>) {
        if let Ok(from) = self.state.transition(next) {
            let mut ev = Event::state_changed(Arc::clone(&self.name), from, next);
            if let Some(err) = reason {
                ev = ev.with_reason(err.to_string());
            }
            self.bus.publish(ev);
        }
    }

    /// Records the error in history and metrics and hands it back.
    fn fail(&mut self, err: LifecycleError) -> LifecycleError {
        self.metrics
            .record_error(err.timestamp().unwrap_or_else(SystemTime::now));
        self.errors.push(err.clone());
        err
    }

    /// Like [`Self::fail`], and moves the connection to `Error`.
    fn fail_terminal(&mut self, err: LifecycleError) -> LifecycleError {
        self.advance_or_skip(ConnectionState::Error, Some(&err));
        self.fail(err)
    }

    fn unusable(&mut self, state: ConnectionState) -> LifecycleError {
        self.fail(LifecycleError::Unusable {
            state,
            at: SystemTime::now(),
        })
    }

    fn context(&self, operation: Option<String>, attempts: u32) -> Box<ErrorContext> {
        Box::new(ErrorContext {
            connection: self.config.name().to_string(),
            backend: self.connector.name().to_string(),
            host: self.config.host().to_string(),
            port: self.config.port(),
            operation,
            attempts,
            at: SystemTime::now(),
        })
    }
}

impl<C: Connector> fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("connector", &self.connector.name())
            .field("state", &self.state.current())
            .field("results", &self.results.len())
            .finish_non_exhaustive()
    }
}
