//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging event handlers (audit logs,
//! metrics exporters, alerting) into a connection. Each subscriber is driven by
//! its own worker task fed from a bounded queue owned by the
//! [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Handlers may be slow; they never block the connection or other subscribers.
//! - A full queue drops events for that subscriber only and publishes
//!   [`EventKind::SubscriberOverflow`](crate::EventKind::SubscriberOverflow).
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use connvisor::{Event, EventKind, Subscribe};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Subscribe for Audit {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::StateChanged {
//!             // persist ev.from / ev.to ...
//!         }
//!     }
//!     fn name(&self) -> &'static str { "audit" }
//!     fn queue_capacity(&self) -> usize { 256 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue (minimum 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
