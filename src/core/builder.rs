//! # Connection builder.
//!
//! [`ConnectionBuilder`] wires a [`Connection`] to its event bus, optional
//! subscribers and cancellation token.
//!
//! ```text
//! build()
//!   ├─► Bus::new(capacity)
//!   ├─► subscribers? ─► SubscriberSet + listener task (Bus ─► SubscriberSet::emit)
//!   └─► Connection::from_parts(config, connector, token, bus, listener guard)
//! ```
//!
//! The listener stops when the connection is dropped: pending bus events are
//! forwarded, then subscriber queues are drained.
//!
//! Events the fan-out raises about itself (`SubscriberPanicked`,
//! `SubscriberOverflow`) reach raw bus receivers but are never fed back into
//! the [`SubscriberSet`], so a handler that always panics cannot loop.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::warn;

use super::connection::Connection;
use crate::config::ConnectionConfig;
use crate::connectors::Connector;
use crate::events::{Bus, DEFAULT_BUS_CAPACITY};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for [`Connection`].
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use connvisor::{
///     Connection, ConnectionConfig, ConnectorError, ConnectorFn, LogWriter, Subscribe,
/// };
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let shutdown = CancellationToken::new();
/// let connector = ConnectorFn::new(
///     "noop",
///     |_cfg: ConnectionConfig| async { Ok::<_, ConnectorError>(()) },
///     |_h: (), _op: ()| async { Ok::<_, ConnectorError>(()) },
/// );
/// let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
/// let conn = Connection::builder(ConnectionConfig::builder("svc", "localhost").build(), connector)
///     .with_subscribers(subs)
///     .with_cancellation(shutdown.child_token())
///     .with_bus_capacity(256)
///     .build();
/// assert_eq!(conn.name(), "svc");
/// # }
/// ```
pub struct ConnectionBuilder<C: Connector> {
    config: ConnectionConfig,
    connector: C,
    subscribers: Vec<Arc<dyn Subscribe>>,
    token: Option<CancellationToken>,
    bus_capacity: usize,
}

impl<C: Connector> ConnectionBuilder<C> {
    pub fn new(config: ConnectionConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            subscribers: Vec::new(),
            token: None,
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }

    /// Event subscribers, each fed through its own bounded queue.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Token that aborts the connection's retry loops.
    ///
    /// Pass `parent.child_token()` to tie the connection to a wider shutdown.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Bus ring-buffer size (minimum 1).
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Builds the connection.
    ///
    /// With subscribers configured this spawns tasks, so it must run inside a
    /// Tokio runtime; without subscribers it does not.
    pub fn build(self) -> Connection<C> {
        let bus = Bus::new(self.bus_capacity);
        let listener = if self.subscribers.is_empty() {
            None
        } else {
            Some(spawn_listener(&bus, self.subscribers))
        };
        let token = self.token.unwrap_or_else(CancellationToken::new);
        Connection::from_parts(self.config, self.connector, token, bus, listener)
    }
}

/// Forwards bus events to a [`SubscriberSet`] until the returned guard drops.
fn spawn_listener(bus: &Bus, subscribers: Vec<Arc<dyn Subscribe>>) -> DropGuard {
    let set = SubscriberSet::new(subscribers, bus.clone());
    let mut rx = bus.subscribe();
    let stop = CancellationToken::new();
    let guard = stop.clone().drop_guard();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Ok(ev) if ev.is_subscriber_event() => {}
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber listener lagged; events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = stop.cancelled() => {
                    while let Ok(ev) = rx.try_recv() {
                        if !ev.is_subscriber_event() {
                            set.emit(&ev);
                        }
                    }
                    break;
                }
            }
        }
        set.shutdown().await;
    });
    guard
}
