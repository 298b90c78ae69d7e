//! # Event subscribers.
//!
//! Subscribers observe the lifecycle events a [`Connection`](crate::Connection)
//! publishes on its [`Bus`](crate::Bus), without ever slowing the connection down.
//!
//! ```text
//! Connection ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                           │
//!                                          ┌────────────────┼───────────┐
//!                                          ▼                ▼           ▼
//!                                      LogWriter         Metrics      Custom
//! ```
//!
//! - [`Subscribe`] - the handler trait
//! - [`SubscriberSet`] - per-subscriber queues, workers and panic isolation
//! - [`LogWriter`] - built-in bridge to `tracing`

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
