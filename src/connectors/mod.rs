//! # Connector abstractions.
//!
//! This module provides the backend-facing types:
//! - [`Connector`] - trait every backend adapter implements (open / perform / close)
//! - [`ConnectorFn`] - closure-backed connector for light adapters and tests

mod connector;
mod connector_fn;

pub use connector::Connector;
pub use connector_fn::ConnectorFn;
