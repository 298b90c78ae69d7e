//! Lifecycle events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`Phase`] event classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the connection state machine, the retry loop and the
//!   attempt runner in `core`, plus `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the subscriber listener spawned by
//!   [`ConnectionBuilder::build`](crate::ConnectionBuilder::build) and any
//!   receiver obtained through [`Connection::subscribe`](crate::Connection::subscribe).

mod bus;
mod event;

pub use bus::{Bus, DEFAULT_BUS_CAPACITY};
pub use event::{Event, EventKind, Phase};
