//! Connection core: state machine, retry loop and orchestration.
//!
//! The public API from this module is [`Connection`] (with [`ConnectionBuilder`]),
//! the [`ConnectionState`] enum and the metrics snapshots.
//!
//! Internal modules:
//! - [`state`]: state enum and the transition table;
//! - [`runner`]: executes one connector attempt with timeout/cancellation and events;
//! - [`retry`]: drives attempts under the retry policy;
//! - [`connection`]: the orchestrator;
//! - [`builder`]: bus, subscribers and cancellation wiring;
//! - [`metrics`]: counters and the info snapshot.

mod builder;
mod connection;
mod metrics;
mod retry;
mod runner;
mod state;

pub use builder::ConnectionBuilder;
pub use connection::Connection;
pub use metrics::{ConnectionInfo, ConnectionMetrics};
pub use state::ConnectionState;
