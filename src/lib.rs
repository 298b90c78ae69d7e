//! # connvisor
//!
//! **Connvisor** gives every backend connection the same lifecycle:
//! validate the configuration, connect under a retry policy, execute
//! operations, keep their results, disconnect.
//!
//! A backend (database driver, HTTP client, SSH session, cloud SDK) only has
//! to implement [`Connector`]: open a handle, perform one operation, close.
//! Everything else lives in [`Connection`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ConnectionConfig (+ Backend variant)          Connector (open / perform / close)
//!            │                                               │
//!            ▼                                               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Connection<C>                                                    │
//! │  - StateMachine   (Initialized → … → Connected → … → Disconnected)│
//! │  - RetryPolicy    (interval × backoff^(n-1), cap, jitter)         │
//! │  - ResultLog      (ordered ExecutionResult history)               │
//! │  - metrics, error history, CancellationToken                      │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │ publishes: StateChanged, AttemptStarting/Succeeded/Failed,
//!        │            TimeoutHit, BackoffScheduled, RetriesExhausted, ...
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Bus (broadcast channel)                       │
//! └──────────────┬──────────────────────────────────────┬─────────────┘
//!                ▼                                      ▼
//!       subscriber listener                  Connection::subscribe()
//!                ▼                              (caller-owned receiver)
//!          SubscriberSet (per-sub queues)
//!        ┌───────┼────────┐
//!        ▼       ▼        ▼
//!    LogWriter  sub2    subN
//!    (tracing)
//! ```
//!
//! ### Lifecycle
//! ```text
//! execute(op)
//!   ├─► Error / Disconnected ─► LifecycleError::Unusable
//!   ├─► Initialized ─► Validating ─► Connecting ─► Connected
//!   │                      │              │
//!   │                      │              └─ open under retry:
//!   │                      │                   ├─ Ok          ─► Connected
//!   │                      │                   ├─ Fatal       ─► Error (1 attempt)
//!   │                      │                   ├─ exhausted   ─► Error (N+1 attempts)
//!   │                      │                   └─ cancelled   ─► Error (Cancelled)
//!   │                      └─ invalid config ─► Error (no attempt)
//!   └─► perform under retry ─► ExecutionResult appended to the history
//!
//! disconnect() ─► Disconnecting ─► close(handle) ─► Disconnected   (never fails)
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Connectors**    | Backend adapters as trait impls or closures.                  | [`Connector`], [`ConnectorFn`]              |
//! | **Lifecycle**     | State machine, retries, results, metrics.                     | [`Connection`], [`ConnectionState`]         |
//! | **Configuration** | Shared parameters, backend variants, validation.              | [`ConnectionConfig`], [`Backend`]           |
//! | **Policies**      | Exponential backoff with cap and jitter.                      | [`RetryPolicy`], [`JitterPolicy`]           |
//! | **Errors**        | Typed connector, config and lifecycle errors.                 | [`ConnectorError`], [`LifecycleError`]      |
//! | **Events**        | Lifecycle events, subscribers and a `tracing` bridge.         | [`Event`], [`Subscribe`], [`LogWriter`]     |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//! use connvisor::{Connection, ConnectionConfig, ConnectionState, ConnectorError, ConnectorFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tries = Arc::new(AtomicU32::new(0));
//!     let counter = Arc::clone(&tries);
//!
//!     // Refuses the first connection attempt, then accepts.
//!     let connector = ConnectorFn::new(
//!         "kv",
//!         move |cfg: ConnectionConfig| {
//!             let n = counter.fetch_add(1, Ordering::SeqCst);
//!             async move {
//!                 if n == 0 {
//!                     return Err(ConnectorError::fail("connection refused"));
//!                 }
//!                 Ok(Arc::<str>::from(cfg.host()))
//!             }
//!         },
//!         |host: Arc<str>, key: String| async move {
//!             Ok::<_, ConnectorError>(format!("{host}/{key}"))
//!         },
//!     );
//!
//!     let config = ConnectionConfig::builder("cache", "kv.local")
//!         .max_retries(2)
//!         .retry_interval(Duration::from_millis(10))
//!         .retry_jitter(false)
//!         .build();
//!     let mut conn = Connection::new(config, connector);
//!
//!     let res = conn.execute("users:42".to_string()).await?;
//!     assert_eq!(res.output().map(String::as_str), Some("kv.local/users:42"));
//!     assert_eq!(tries.load(Ordering::SeqCst), 2);
//!     assert_eq!(conn.metrics().failed_connections, 1);
//!
//!     conn.disconnect().await;
//!     assert_eq!(conn.status(), ConnectionState::Disconnected);
//!     Ok(())
//! }
//! ```
mod config;
mod connectors;
mod core;
mod error;
mod events;
mod policies;
mod results;
mod subscribers;

// ---- Public re-exports ----

pub use config::{
    ApiAuth, ApiKeyLocation, ApiOptions, AwsAuth, AwsOptions, Backend, ConnectionConfig,
    ConnectionConfigBuilder, DatabaseKind, DatabaseOptions, KubernetesAuth, KubernetesOptions,
    SshAuth, SshOptions,
};
pub use connectors::{Connector, ConnectorFn};
pub use crate::core::{
    Connection, ConnectionBuilder, ConnectionInfo, ConnectionMetrics, ConnectionState,
};
pub use error::{ConfigError, ConnectorError, ErrorCategory, ErrorContext, LifecycleError};
pub use events::{Bus, DEFAULT_BUS_CAPACITY, Event, EventKind, Phase};
pub use policies::{JitterPolicy, RetryPolicy};
pub use results::{ExecutionResult, Outcome, ResultLog};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
