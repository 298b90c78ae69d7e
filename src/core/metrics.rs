//! # Connection counters and snapshots.
//!
//! [`ConnectionMetrics`] is updated in place by the orchestrator; callers read
//! it through [`Connection::metrics`](crate::Connection::metrics).
//! [`ConnectionInfo`] is an owned summary for dashboards and logs.

use std::time::{Duration, SystemTime};

use uuid::Uuid;

use super::state::ConnectionState;

/// Per-connection counters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionMetrics {
    /// Successful opens.
    pub total_connections: u64,
    /// Failed `open` attempts (each attempt counts).
    pub failed_connections: u64,
    /// Completed teardowns.
    pub total_disconnections: u64,
    /// Lifecycle errors surfaced to callers plus close failures.
    pub total_errors: u64,
    /// Backoff sleeps taken across opens and performs.
    pub total_retries: u64,
    /// Operations recorded as successes.
    pub operations_succeeded: u64,
    /// Operations recorded as failures.
    pub operations_failed: u64,
    pub last_connected_at: Option<SystemTime>,
    pub last_disconnected_at: Option<SystemTime>,
    pub last_error_at: Option<SystemTime>,
    /// Running mean of successful connect durations, retries included.
    pub avg_connection_time: Duration,
}

impl ConnectionMetrics {
    pub(crate) fn record_connected(&mut self, took: Duration) {
        self.total_connections += 1;
        self.last_connected_at = Some(SystemTime::now());
        // total_connections >= 1 here
        let n = self.total_connections as u128;
        let avg = (self.avg_connection_time.as_nanos() * (n - 1) + took.as_nanos()) / n;
        self.avg_connection_time = Duration::from_nanos(avg.min(u64::MAX as u128) as u64);
    }

    pub(crate) fn record_disconnected(&mut self) {
        self.total_disconnections += 1;
        self.last_disconnected_at = Some(SystemTime::now());
    }

    pub(crate) fn record_error(&mut self, at: SystemTime) {
        self.total_errors += 1;
        self.last_error_at = Some(at);
    }
}

/// Owned summary of a connection.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionInfo {
    pub id: Uuid,
    pub name: String,
    /// Backend variant label from the configuration.
    pub backend: &'static str,
    /// Connector name.
    pub connector: String,
    pub status: ConnectionState,
    /// A handle is currently open.
    pub connected: bool,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_interval: Duration,
    pub ssl_enabled: bool,
    pub results: usize,
    pub metrics: ConnectionMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_average() {
        let mut m = ConnectionMetrics::default();
        m.record_connected(Duration::from_secs(2));
        assert_eq!(m.avg_connection_time, Duration::from_secs(2));
        m.record_connected(Duration::from_secs(4));
        assert_eq!(m.avg_connection_time, Duration::from_secs(3));
        assert_eq!(m.total_connections, 2);
        assert!(m.last_connected_at.is_some());
    }

    #[test]
    fn test_error_and_disconnect_counters() {
        let mut m = ConnectionMetrics::default();
        let at = SystemTime::now();
        m.record_error(at);
        m.record_disconnected();
        assert_eq!(m.total_errors, 1);
        assert_eq!(m.last_error_at, Some(at));
        assert_eq!(m.total_disconnections, 1);
    }
}
