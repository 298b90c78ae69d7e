//! # Connection configuration.
//!
//! [`ConnectionConfig`] is the immutable parameter bundle a
//! [`Connection`](crate::Connection) is built from. It is assembled with
//! [`ConnectionConfig::builder`] and never mutated afterwards: all fields are
//! private and exposed through read accessors.
//!
//! Validation is a pure check ([`ConnectionConfig::validate`]) that the
//! connection runs while in the `Validating` state, before the first `open`.
//!
//! ## Sentinel values
//! - `timeout = 0s` → no per-attempt timeout ([`ConnectionConfig::attempt_timeout`] is `None`)
//! - `max_retries = 0` → a single attempt per operation
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use connvisor::{Backend, ConnectionConfig, DatabaseOptions};
//!
//! let cfg = ConnectionConfig::builder("orders-db", "db.internal")
//!     .credentials("app", "secret")
//!     .max_retries(2)
//!     .retry_interval(Duration::from_millis(200))
//!     .backend(Backend::Database(DatabaseOptions {
//!         database: Some("orders".into()),
//!         ..Default::default()
//!     }))
//!     .build();
//!
//! assert!(cfg.validate().is_ok());
//! assert_eq!(cfg.port(), Some(5432));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::config::backend::{Backend, Shared};
use crate::error::ConfigError;

/// Immutable, validated-before-use connection parameters.
#[derive(Clone)]
pub struct ConnectionConfig {
    name: String,
    host: String,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
    max_retries: u32,
    retry_interval: Duration,
    retry_backoff: f64,
    retry_jitter: bool,
    retry_max_delay: Option<Duration>,
    ssl_enabled: bool,
    ssl_verify: bool,
    options: BTreeMap<String, Value>,
    backend: Backend,
}

impl ConnectionConfig {
    /// Starts a builder with the defaults:
    ///
    /// - `timeout = 30s`
    /// - `max_retries = 3`
    /// - `retry_interval = 5s`
    /// - `retry_backoff = 1.5`
    /// - `retry_jitter = true`
    /// - `ssl_enabled = ssl_verify = true`
    /// - `backend = Backend::Generic`
    pub fn builder(name: impl Into<String>, host: impl Into<String>) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::new(name.into(), host.into())
    }

    /// Checks the configuration for the selected backend variant.
    ///
    /// Fails fast with the first class of problem found: shared retry knobs,
    /// then host presence, then backend-specific requirements.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "name",
                reason: "must not be empty".into(),
            });
        }
        if self.retry_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "retry_interval",
                reason: "must be greater than zero".into(),
            });
        }
        if !self.retry_backoff.is_finite() || self.retry_backoff < 1.0 {
            return Err(ConfigError::Invalid {
                field: "retry_backoff",
                reason: format!("must be a finite multiplier >= 1, got {}", self.retry_backoff),
            });
        }
        if self.backend.requires_host() && self.host.trim().is_empty() {
            return Err(ConfigError::Missing {
                backend: self.backend.as_label(),
                fields: vec!["host"],
            });
        }

        self.backend.validate(&Shared {
            host: &self.host,
            port: self.port,
            username: self.username.as_deref(),
            password: self.password.as_deref(),
        })
    }

    /// Human-readable connection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target host (URL for API backends, trailing `/` stripped).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, or the backend's default port.
    pub fn port(&self) -> Option<u16> {
        self.port.or_else(|| self.backend.default_port())
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Configured per-attempt timeout (`0s` = none).
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the per-attempt timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → each `open`/`perform` attempt is bounded by `d`
    #[inline]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        if self.timeout.is_zero() {
            None
        } else {
            Some(self.timeout)
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    pub fn retry_backoff(&self) -> f64 {
        self.retry_backoff
    }

    pub fn retry_jitter(&self) -> bool {
        self.retry_jitter
    }

    /// Optional cap on a single backoff delay.
    pub fn retry_max_delay(&self) -> Option<Duration> {
        self.retry_max_delay
    }

    pub fn ssl_enabled(&self) -> bool {
        self.ssl_enabled
    }

    pub fn ssl_verify(&self) -> bool {
        self.ssl_verify
    }

    /// Backend-specific opaque option.
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// All backend-specific opaque options.
    pub fn options(&self) -> &BTreeMap<String, Value> {
        &self.options
    }

    /// Selected backend variant.
    pub fn backend(&self) -> &Backend {
        &self.backend
    }
}

impl fmt::Debug for ConnectionConfig {
    /// Credentials and backend secrets are never printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_interval", &self.retry_interval)
            .field("retry_backoff", &self.retry_backoff)
            .field("retry_jitter", &self.retry_jitter)
            .field("backend", &self.backend.as_label())
            .finish_non_exhaustive()
    }
}

/// Fluent builder for [`ConnectionConfig`].
#[derive(Clone, Debug)]
pub struct ConnectionConfigBuilder {
    inner: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    fn new(name: String, host: String) -> Self {
        Self {
            inner: ConnectionConfig {
                name,
                host,
                port: None,
                username: None,
                password: None,
                timeout: Duration::from_secs(30),
                max_retries: 3,
                retry_interval: Duration::from_secs(5),
                retry_backoff: 1.5,
                retry_jitter: true,
                retry_max_delay: None,
                ssl_enabled: true,
                ssl_verify: true,
                options: BTreeMap::new(),
                backend: Backend::Generic,
            },
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.inner.port = Some(port);
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.inner.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.inner.password = Some(password.into());
        self
    }

    /// Sets username and password together.
    pub fn credentials(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username(username).password(password)
    }

    /// Per-attempt timeout (`Duration::ZERO` disables it).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.inner.max_retries = max_retries;
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.inner.retry_interval = interval;
        self
    }

    pub fn retry_backoff(mut self, factor: f64) -> Self {
        self.inner.retry_backoff = factor;
        self
    }

    pub fn retry_jitter(mut self, enabled: bool) -> Self {
        self.inner.retry_jitter = enabled;
        self
    }

    pub fn retry_max_delay(mut self, max: Duration) -> Self {
        self.inner.retry_max_delay = Some(max);
        self
    }

    pub fn ssl(mut self, enabled: bool, verify: bool) -> Self {
        self.inner.ssl_enabled = enabled;
        self.inner.ssl_verify = verify;
        self
    }

    /// Adds one backend-specific opaque option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inner.options.insert(key.into(), value.into());
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.inner.backend = backend;
        self
    }

    /// Finalizes the configuration.
    ///
    /// Normalizes the host (API and Kubernetes hosts lose trailing `/`) but does
    /// not validate; see [`ConnectionConfig::validate`].
    pub fn build(mut self) -> ConnectionConfig {
        if self.inner.backend.normalizes_host() {
            let trimmed = self.inner.host.trim_end_matches('/').len();
            self.inner.host.truncate(trimmed);
        }
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::backend::{ApiOptions, DatabaseKind, DatabaseOptions, SshOptions};

    #[test]
    fn test_defaults() {
        let cfg = ConnectionConfig::builder("x", "h").build();
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.max_retries(), 3);
        assert_eq!(cfg.retry_interval(), Duration::from_secs(5));
        assert_eq!(cfg.retry_backoff(), 1.5);
        assert!(cfg.retry_jitter());
        assert!(cfg.ssl_enabled() && cfg.ssl_verify());
        assert_eq!(cfg.backend(), &Backend::Generic);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_is_none() {
        let cfg = ConnectionConfig::builder("x", "h")
            .timeout(Duration::ZERO)
            .build();
        assert!(cfg.attempt_timeout().is_none());
    }

    #[test]
    fn test_rejects_bad_retry_knobs() {
        let zero = ConnectionConfig::builder("x", "h")
            .retry_interval(Duration::ZERO)
            .build();
        assert!(matches!(
            zero.validate(),
            Err(ConfigError::Invalid { field: "retry_interval", .. })
        ));

        let shrinking = ConnectionConfig::builder("x", "h").retry_backoff(0.5).build();
        assert!(matches!(
            shrinking.validate(),
            Err(ConfigError::Invalid { field: "retry_backoff", .. })
        ));

        let nan = ConnectionConfig::builder("x", "h").retry_backoff(f64::NAN).build();
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_missing_host() {
        let cfg = ConnectionConfig::builder("x", "  ").build();
        match cfg.validate() {
            Err(ConfigError::Missing { backend, fields }) => {
                assert_eq!(backend, "generic");
                assert_eq!(fields, vec!["host"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_api_host_normalized() {
        let cfg = ConnectionConfig::builder("api", "https://api.example.com//")
            .backend(Backend::Api(ApiOptions::default()))
            .build();
        assert_eq!(cfg.host(), "https://api.example.com");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_ssh_default_port_and_explicit_override() {
        let cfg = ConnectionConfig::builder("ssh", "bastion")
            .credentials("ops", "pw")
            .backend(Backend::Ssh(SshOptions::default()))
            .build();
        assert_eq!(cfg.port(), Some(22));

        let cfg = ConnectionConfig::builder("ssh", "bastion")
            .port(2222)
            .credentials("ops", "pw")
            .backend(Backend::Ssh(SshOptions::default()))
            .build();
        assert_eq!(cfg.port(), Some(2222));
    }

    #[test]
    fn test_oracle_port_is_never_implied() {
        let oracle = || {
            Backend::Database(DatabaseOptions {
                kind: DatabaseKind::Oracle,
                service_name: Some("ORCLPDB1".into()),
                ..Default::default()
            })
        };
        let cfg = ConnectionConfig::builder("ledger", "ora.internal")
            .backend(oracle())
            .build();
        assert_eq!(cfg.port(), None);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Missing { ref fields, .. }) if fields == &vec!["port"]
        ));

        let cfg = ConnectionConfig::builder("ledger", "ora.internal")
            .port(1522)
            .backend(oracle())
            .build();
        assert_eq!(cfg.port(), Some(1522));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_options_are_opaque_values() {
        let cfg = ConnectionConfig::builder("x", "h")
            .option("pool_size", 8)
            .option("application_name", "billing")
            .build();
        assert_eq!(cfg.option("pool_size"), Some(&Value::from(8)));
        assert_eq!(cfg.options().len(), 2);
        assert!(cfg.option("missing").is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let cfg = ConnectionConfig::builder("x", "h")
            .credentials("user", "hunter2")
            .build();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("***"));
    }
}
