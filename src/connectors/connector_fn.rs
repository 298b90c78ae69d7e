//! # Function-backed connector (`ConnectorFn`)
//!
//! [`ConnectorFn`] wraps two closures, one that opens a handle and one that
//! performs an operation, producing a fresh future per attempt. Both closures
//! receive owned arguments: `open` gets a clone of the configuration and the
//! handle is cloned into every `perform` call, so it should be a cheap shared
//! client (`Arc<...>`, a pooled client, a channel sender). Closing drops the
//! handle unless a close closure is set with [`ConnectorFn::with_close`].
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use connvisor::{ConnectionConfig, Connector, ConnectorError, ConnectorFn};
//!
//! let echo = ConnectorFn::new(
//!     "echo",
//!     |cfg: ConnectionConfig| async move {
//!         Ok::<_, ConnectorError>(Arc::<str>::from(cfg.host()))
//!     },
//!     |host: Arc<str>, cmd: String| async move {
//!         Ok::<_, ConnectorError>(format!("{host}$ {cmd}"))
//!     },
//! );
//!
//! assert_eq!(echo.name(), "echo");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::config::ConnectionConfig;
use crate::connectors::connector::Connector;
use crate::error::ConnectorError;

type CloseFn<H> = Arc<dyn Fn(H) -> BoxFuture<'static, Result<(), ConnectorError>> + Send + Sync>;

/// Function-backed connector implementation.
pub struct ConnectorFn<OpenF, PerformF, H, O, R> {
    name: Cow<'static, str>,
    open: OpenF,
    perform: PerformF,
    close: Option<CloseFn<H>>,
    _types: PhantomData<fn(H, O) -> R>,
}

impl<OpenF, PerformF, H, O, R> ConnectorFn<OpenF, PerformF, H, O, R> {
    /// Creates a new function-backed connector.
    ///
    /// - `open` receives a clone of the configuration and returns a future resolving to a handle.
    /// - `perform` receives a clone of the handle and the operation.
    pub fn new(name: impl Into<Cow<'static, str>>, open: OpenF, perform: PerformF) -> Self {
        Self {
            name: name.into(),
            open,
            perform,
            close: None,
            _types: PhantomData,
        }
    }

    /// Sets a closure that releases the handle on `close`.
    pub fn with_close<CloseF, CloseFut>(mut self, close: CloseF) -> Self
    where
        CloseF: Fn(H) -> CloseFut + Send + Sync + 'static,
        CloseFut: Future<Output = Result<(), ConnectorError>> + Send + 'static,
        H: 'static,
    {
        let close: CloseFn<H> = Arc::new(move |h: H| close(h).boxed());
        self.close = Some(close);
        self
    }
}

impl<OpenF, PerformF, H, O, R> fmt::Debug for ConnectorFn<OpenF, PerformF, H, O, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorFn")
            .field("name", &self.name)
            .field("has_close", &self.close.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<OpenF, OpenFut, PerformF, PerformFut, H, O, R> Connector
    for ConnectorFn<OpenF, PerformF, H, O, R>
where
    OpenF: Fn(ConnectionConfig) -> OpenFut + Send + Sync + 'static,
    OpenFut: Future<Output = Result<H, ConnectorError>> + Send + 'static,
    PerformF: Fn(H, O) -> PerformFut + Send + Sync + 'static,
    PerformFut: Future<Output = Result<R, ConnectorError>> + Send + 'static,
    H: Clone + Send + Sync + 'static,
    O: Clone + fmt::Debug + Send + Sync + 'static,
    R: Send + 'static,
{
    type Handle = H;
    type Operation = O;
    type Output = R;

    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self, config: &ConnectionConfig) -> Result<H, ConnectorError> {
        (self.open)(config.clone()).await
    }

    async fn perform(&self, handle: &mut H, operation: &O) -> Result<R, ConnectorError> {
        (self.perform)(handle.clone(), operation.clone()).await
    }

    async fn close(&self, handle: H) -> Result<(), ConnectorError> {
        match &self.close {
            Some(close) => close(handle).await,
            None => Ok(()),
        }
    }
}
