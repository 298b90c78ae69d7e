//! # Connector capability trait.
//!
//! A [`Connector`] is the backend adapter a [`Connection`](crate::Connection)
//! drives: it knows how to open a handle, perform one operation against it and
//! close it. Retry, timeouts, state and result bookkeeping stay in the
//! connection; a connector performs exactly one attempt per call.
//!
//! ## Contract
//! - `open` may be called again after a failed attempt.
//! - `perform` must not retry internally.
//! - `close` is best effort and must succeed for an already-closed handle.
//! - Errors classify themselves through [`ConnectorError`] variants:
//!   `Fail`/`Timeout` retryable, `Fatal` aborts the retry loop,
//!   `Disconnected` from `perform` ends the connection.

use std::fmt;

use async_trait::async_trait;

use crate::config::ConnectionConfig;
use crate::error::ConnectorError;

/// # Backend adapter driven by a connection.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use connvisor::{ConnectionConfig, Connector, ConnectorError};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Connector for Echo {
///     type Handle = String;
///     type Operation = String;
///     type Output = String;
///
///     fn name(&self) -> &str { "echo" }
///
///     async fn open(&self, cfg: &ConnectionConfig) -> Result<String, ConnectorError> {
///         Ok(cfg.host().to_string())
///     }
///
///     async fn perform(&self, host: &mut String, op: &String) -> Result<String, ConnectorError> {
///         Ok(format!("{host}: {op}"))
///     }
///
///     async fn close(&self, _host: String) -> Result<(), ConnectorError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Backend-specific open connection (client, session, channel, ...).
    type Handle: Send + 'static;
    /// One unit of work (query, request, command, API call).
    type Operation: fmt::Debug + Send + Sync + 'static;
    /// Payload produced by a successful operation.
    type Output: Send + 'static;

    /// Stable backend label used in events and error contexts.
    fn name(&self) -> &str;

    /// Establishes the backend connection.
    async fn open(&self, config: &ConnectionConfig) -> Result<Self::Handle, ConnectorError>;

    /// Executes one operation against an open handle.
    async fn perform(
        &self,
        handle: &mut Self::Handle,
        operation: &Self::Operation,
    ) -> Result<Self::Output, ConnectorError>;

    /// Tears the handle down.
    async fn close(&self, handle: Self::Handle) -> Result<(), ConnectorError>;

    /// Short description of an operation for error contexts and events.
    fn describe(&self, operation: &Self::Operation) -> String {
        format!("{operation:?}")
    }
}
