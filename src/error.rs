//! Error types used by connectors and the connection lifecycle.
//!
//! This module defines three error enums:
//!
//! - [`ConnectorError`]: errors raised by a backend adapter for one attempt.
//! - [`ConfigError`]: configuration validation failures.
//! - [`LifecycleError`]: errors surfaced to callers of [`Connection`](crate::Connection).
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! [`ConnectorError`] additionally classifies itself ([`ConnectorError::is_retryable`],
//! [`ConnectorError::is_connection_fatal`]) so the retry loop can decide what to do.

use std::fmt;
use std::time::{Duration, SystemTime};

use thiserror::Error;

use crate::core::ConnectionState;

/// # Errors produced by a connector for a single attempt.
///
/// Adapters classify their failures by choosing a variant. Anything built with
/// [`ConnectorError::fail`] is retryable; `From<std::io::Error>` classifies by error kind.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectorError {
    /// Attempt failed but may succeed if retried.
    #[error("attempt failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable error (bad credentials, unknown database, ...). Never retried.
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The transport under an open handle is gone.
    ///
    /// Retryable while opening; ends the connection when raised by `perform`.
    #[error("connection lost: {error}")]
    Disconnected {
        /// The underlying error message.
        error: String,
    },

    /// Attempt exceeded its per-attempt timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Attempt observed cancellation and gave up.
    #[error("attempt cancelled")]
    Canceled,
}

impl ConnectorError {
    /// Retryable failure from any displayable error.
    pub fn fail(error: impl fmt::Display) -> Self {
        ConnectorError::Fail {
            error: error.to_string(),
        }
    }

    /// Non-retryable failure from any displayable error.
    pub fn fatal(error: impl fmt::Display) -> Self {
        ConnectorError::Fatal {
            error: error.to_string(),
        }
    }

    /// Connection-fatal failure from any displayable error.
    pub fn disconnected(error: impl fmt::Display) -> Self {
        ConnectorError::Disconnected {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use connvisor::ConnectorError;
    ///
    /// assert_eq!(ConnectorError::fatal("bad password").as_label(), "connector_fatal");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConnectorError::Fail { .. } => "connector_failed",
            ConnectorError::Fatal { .. } => "connector_fatal",
            ConnectorError::Disconnected { .. } => "connector_disconnected",
            ConnectorError::Timeout { .. } => "connector_timeout",
            ConnectorError::Canceled => "connector_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ConnectorError::Fail { error } => format!("error: {error}"),
            ConnectorError::Fatal { error } => format!("fatal: {error}"),
            ConnectorError::Disconnected { error } => format!("disconnected: {error}"),
            ConnectorError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            ConnectorError::Canceled => "attempt cancelled".to_string(),
        }
    }

    /// Indicates whether another attempt is allowed after this error.
    ///
    /// Returns `true` for [`ConnectorError::Fail`], [`ConnectorError::Timeout`]
    /// and [`ConnectorError::Disconnected`]; the retry loop additionally stops on
    /// `Disconnected` while performing (see [`ConnectorError::is_connection_fatal`]).
    ///
    /// # Example
    /// ```
    /// use connvisor::ConnectorError;
    ///
    /// assert!(ConnectorError::fail("refused").is_retryable());
    /// assert!(!ConnectorError::fatal("auth").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConnectorError::Fail { .. }
                | ConnectorError::Timeout { .. }
                | ConnectorError::Disconnected { .. }
        )
    }

    /// Indicates the open handle can no longer be used.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, ConnectorError::Disconnected { .. })
    }
}

impl From<std::io::Error> for ConnectorError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::PermissionDenied => ConnectorError::fatal(err),
            ErrorKind::ConnectionReset | ErrorKind::BrokenPipe | ErrorKind::NotConnected => {
                ConnectorError::disconnected(err)
            }
            _ => ConnectorError::fail(err),
        }
    }
}

/// # Configuration validation failures.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required fields for the selected backend are absent.
    #[error("{backend} configuration is missing: {}", .fields.join(", "))]
    Missing {
        /// Backend label the rule belongs to.
        backend: &'static str,
        /// Missing field names (alternatives joined with `|`).
        fields: Vec<&'static str>,
    },

    /// A field is present but unusable.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Missing { .. } => "config_missing",
            ConfigError::Invalid { .. } => "config_invalid",
        }
    }
}

/// Coarse classification of a [`LifecycleError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Validation failed; never retried.
    Configuration,
    /// Open failed, illegal transition, or connection unusable.
    Connection,
    /// Perform failed.
    Execution,
    /// External abort of a retry loop.
    Cancellation,
    /// Result history queried while empty.
    NoResults,
}

/// Structured context captured when a lifecycle error is raised.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorContext {
    /// Connection name from the configuration.
    pub connection: String,
    /// Backend label (connector name).
    pub backend: String,
    /// Target host.
    pub host: String,
    /// Effective port, if known.
    pub port: Option<u16>,
    /// Operation being performed (`None` while opening).
    pub operation: Option<String>,
    /// Attempts made before the error surfaced.
    pub attempts: u32,
    /// Capture time.
    pub at: SystemTime,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.connection, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        if let Some(op) = &self.operation {
            write!(f, " op={op}")?;
        }
        Ok(())
    }
}

/// # Errors surfaced by [`Connection`](crate::Connection).
///
/// Every failure path either retries within budget or ends here.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum LifecycleError {
    /// Configuration validation failed; the connection moved to `Error`.
    #[error("invalid configuration ({context}): {source}")]
    Configuration {
        source: ConfigError,
        context: Box<ErrorContext>,
    },

    /// `open` did not succeed within the retry budget, or failed fatally.
    #[error("connect failed after {} attempt(s) ({context}): {source}", .context.attempts)]
    Connect {
        source: ConnectorError,
        context: Box<ErrorContext>,
    },

    /// `perform` did not succeed within the retry budget, failed fatally, or lost the transport.
    #[error("execution failed after {} attempt(s) ({context}): {source}", .context.attempts)]
    Execution {
        source: ConnectorError,
        context: Box<ErrorContext>,
    },

    /// The retry loop was cancelled from outside.
    #[error("cancelled after {} attempt(s) ({context})", .context.attempts)]
    Cancelled { context: Box<ErrorContext> },

    /// The state machine rejected a transition.
    #[error("illegal state transition {from} -> {to}")]
    IllegalTransition {
        from: ConnectionState,
        to: ConnectionState,
        at: SystemTime,
    },

    /// An operation was requested in a terminal state.
    #[error("connection is {state}; no further operations accepted")]
    Unusable {
        state: ConnectionState,
        at: SystemTime,
    },

    /// The result history is empty.
    #[error("no results recorded yet")]
    NoResults,
}

impl LifecycleError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use connvisor::LifecycleError;
    ///
    /// assert_eq!(LifecycleError::NoResults.as_label(), "no_results");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LifecycleError::Configuration { .. } => "configuration_error",
            LifecycleError::Connect { .. } => "connection_error",
            LifecycleError::Execution { .. } => "execution_error",
            LifecycleError::Cancelled { .. } => "cancellation_error",
            LifecycleError::IllegalTransition { .. } => "illegal_transition",
            LifecycleError::Unusable { .. } => "connection_unusable",
            LifecycleError::NoResults => "no_results",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }

    /// Coarse category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            LifecycleError::Configuration { .. } => ErrorCategory::Configuration,
            LifecycleError::Connect { .. }
            | LifecycleError::IllegalTransition { .. }
            | LifecycleError::Unusable { .. } => ErrorCategory::Connection,
            LifecycleError::Execution { .. } => ErrorCategory::Execution,
            LifecycleError::Cancelled { .. } => ErrorCategory::Cancellation,
            LifecycleError::NoResults => ErrorCategory::NoResults,
        }
    }

    /// Structured context, when the error came out of a lifecycle step.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            LifecycleError::Configuration { context, .. }
            | LifecycleError::Connect { context, .. }
            | LifecycleError::Execution { context, .. }
            | LifecycleError::Cancelled { context } => Some(&**context),
            _ => None,
        }
    }

    /// Attempts made before the error surfaced (`0` when nothing was attempted).
    pub fn attempts(&self) -> u32 {
        self.context().map_or(0, |c| c.attempts)
    }

    /// Last connector failure, for retry-loop errors.
    pub fn connector_error(&self) -> Option<&ConnectorError> {
        match self {
            LifecycleError::Connect { source, .. } | LifecycleError::Execution { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }

    /// Capture timestamp (`None` for [`LifecycleError::NoResults`]).
    pub fn timestamp(&self) -> Option<SystemTime> {
        match self {
            LifecycleError::IllegalTransition { at, .. } | LifecycleError::Unusable { at, .. } => {
                Some(*at)
            }
            other => other.context().map(|c| c.at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(attempts: u32) -> Box<ErrorContext> {
        Box::new(ErrorContext {
            connection: "orders".into(),
            backend: "database".into(),
            host: "db.internal".into(),
            port: Some(5432),
            operation: Some("SELECT 1".into()),
            attempts,
            at: SystemTime::now(),
        })
    }

    #[test]
    fn test_connector_classification() {
        assert!(ConnectorError::fail("x").is_retryable());
        assert!(ConnectorError::Timeout {
            timeout: Duration::from_secs(1)
        }
        .is_retryable());
        assert!(!ConnectorError::fatal("x").is_retryable());
        assert!(!ConnectorError::Canceled.is_retryable());
        assert!(ConnectorError::disconnected("x").is_connection_fatal());
        assert!(!ConnectorError::fail("x").is_connection_fatal());
    }

    #[test]
    fn test_io_error_mapping() {
        use std::io::{Error, ErrorKind};
        let denied: ConnectorError = Error::new(ErrorKind::PermissionDenied, "no").into();
        assert_eq!(denied.as_label(), "connector_fatal");
        let reset: ConnectorError = Error::new(ErrorKind::ConnectionReset, "rst").into();
        assert!(reset.is_connection_fatal());
        let refused: ConnectorError = Error::new(ErrorKind::ConnectionRefused, "nope").into();
        assert_eq!(refused.as_label(), "connector_failed");
    }

    #[test]
    fn test_any_std_error_wraps_as_retryable() {
        let parse = "port".parse::<u16>().unwrap_err();
        let err = ConnectorError::fail(&parse);
        assert!(err.is_retryable());
        assert_eq!(err, ConnectorError::fail(parse.to_string()));

        let io = std::io::Error::other("tls handshake");
        assert!(ConnectorError::from(io).is_retryable());
    }

    #[test]
    fn test_lifecycle_accessors() {
        let err = LifecycleError::Execution {
            source: ConnectorError::fail("deadlock"),
            context: ctx(4),
        };
        assert_eq!(err.category(), ErrorCategory::Execution);
        assert_eq!(err.attempts(), 4);
        assert!(err.timestamp().is_some());
        assert_eq!(err.connector_error(), Some(&ConnectorError::fail("deadlock")));
        let msg = err.to_string();
        assert!(msg.contains("4 attempt(s)"), "{msg}");
        assert!(msg.contains("orders@db.internal:5432 op=SELECT 1"), "{msg}");
    }

    #[test]
    fn test_categories() {
        let at = SystemTime::now();
        let illegal = LifecycleError::IllegalTransition {
            from: ConnectionState::Initialized,
            to: ConnectionState::Connected,
            at,
        };
        assert_eq!(illegal.category(), ErrorCategory::Connection);
        assert_eq!(illegal.attempts(), 0);
        assert_eq!(illegal.timestamp(), Some(at));

        let cancelled = LifecycleError::Cancelled { context: ctx(2) };
        assert_eq!(cancelled.category(), ErrorCategory::Cancellation);
        assert_eq!(cancelled.as_label(), "cancellation_error");

        assert_eq!(LifecycleError::NoResults.category(), ErrorCategory::NoResults);
        assert!(LifecycleError::NoResults.timestamp().is_none());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Missing {
            backend: "database",
            fields: vec!["host", "database"],
        };
        assert_eq!(err.to_string(), "database configuration is missing: host, database");
    }
}
