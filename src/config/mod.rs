//! Connection configuration.
//!
//! ## Contents
//! - [`ConnectionConfig`] immutable shared parameters (host, credentials, timeout, retry knobs)
//! - [`ConnectionConfigBuilder`] fluent construction with defaults
//! - [`Backend`] and its option structs: per-backend parameters and validation rules

mod backend;
mod connection;

pub use backend::{
    ApiAuth, ApiKeyLocation, ApiOptions, AwsAuth, AwsOptions, Backend, DatabaseKind,
    DatabaseOptions, KubernetesAuth, KubernetesOptions, SshAuth, SshOptions,
};
pub use connection::{ConnectionConfig, ConnectionConfigBuilder};
