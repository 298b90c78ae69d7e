mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{Scripted, config, drain, of_kind};
use connvisor::{
    ApiOptions, Backend, Connection, ConnectionConfig, ConnectionState, ConnectorError,
    ErrorCategory, Event, EventKind, LifecycleError, Outcome, Subscribe,
};
use tokio::sync::mpsc;

use ConnectionState::*;

#[tokio::test]
async fn test_first_execute_walks_states_once() {
    let connector = Scripted::new();
    let calls = connector.calls();
    let mut conn = Connection::new(config(3), connector);
    let mut rx = conn.subscribe();

    conn.execute("SELECT 1".into()).await.unwrap();
    conn.execute("SELECT 2".into()).await.unwrap();

    let events = drain(&mut rx);
    let transitions: Vec<_> = of_kind(&events, EventKind::StateChanged)
        .into_iter()
        .map(|e| (e.from.unwrap(), e.to.unwrap()))
        .collect();
    assert_eq!(
        transitions,
        vec![
            (Initialized, Validating),
            (Validating, Connecting),
            (Connecting, Connected)
        ]
    );
    assert_eq!(calls.open(), 1);
    assert_eq!(calls.perform(), 2);
    assert_eq!(conn.status(), Connected);
}

#[tokio::test]
async fn test_last_result_empty_then_latest() {
    let mut conn = Connection::new(config(0), Scripted::new());
    assert!(matches!(conn.last_result(), Err(LifecycleError::NoResults)));
    assert_eq!(
        conn.last_result().unwrap_err().category(),
        ErrorCategory::NoResults
    );

    conn.execute("PING".into()).await.unwrap();
    let last = conn.last_result().unwrap();
    assert_eq!(last.output().map(String::as_str), Some("PING"));
    assert_eq!(last.attempts, 1);
}

#[tokio::test]
async fn test_results_keep_call_order() {
    let mut conn = Connection::new(config(0), Scripted::new());
    for op in ["a", "b", "c"] {
        conn.execute(op.to_string()).await.unwrap();
    }
    let outputs: Vec<_> = conn
        .results()
        .iter()
        .filter_map(|r| r.output().cloned())
        .collect();
    assert_eq!(outputs, vec!["a", "b", "c"]);

    conn.reset_results();
    assert!(conn.results().is_empty());
    assert!(conn.last_result().is_err());
    assert_eq!(conn.status(), Connected);
}

#[tokio::test]
async fn test_disconnect_twice_never_fails() {
    let connector = Scripted::new();
    let calls = connector.calls();
    let mut conn = Connection::new(config(0), connector);
    conn.connect().await.unwrap();

    conn.disconnect().await;
    conn.disconnect().await;

    assert_eq!(conn.status(), Disconnected);
    assert_eq!(calls.close(), 1);
    assert_eq!(conn.metrics().total_disconnections, 1);
    assert!(!conn.is_connected());
}

#[tokio::test]
async fn test_disconnect_before_connect() {
    let connector = Scripted::new();
    let calls = connector.calls();
    let mut conn = Connection::new(config(0), connector);

    conn.disconnect().await;

    assert_eq!(conn.status(), Disconnected);
    assert_eq!(calls.open(), 0);
    assert_eq!(calls.close(), 0);
}

#[tokio::test]
async fn test_disconnect_from_error_keeps_error() {
    let connector = Scripted::new().open_always(ConnectorError::fatal("auth"));
    let mut conn = Connection::new(config(2), connector);

    assert!(conn.connect().await.is_err());
    assert_eq!(conn.status(), Error);

    conn.disconnect().await;
    conn.disconnect().await;
    assert_eq!(conn.status(), Error);
}

#[tokio::test]
async fn test_close_failure_is_swallowed_and_reported() {
    let connector = Scripted::new().close_error(ConnectorError::fail("eof"));
    let mut conn = Connection::new(config(0), connector);
    conn.connect().await.unwrap();
    let mut rx = conn.subscribe();

    conn.disconnect().await;

    assert_eq!(conn.status(), Disconnected);
    let events = drain(&mut rx);
    let failed = of_kind(&events, EventKind::CloseFailed);
    assert_eq!(failed.len(), 1);
    assert!(failed[0].reason.as_deref().unwrap().contains("eof"));
    assert_eq!(conn.metrics().total_errors, 1);
}

#[tokio::test]
async fn test_terminal_states_reject_operations() {
    let mut conn = Connection::new(config(0), Scripted::new());
    conn.execute("x".into()).await.unwrap();
    conn.disconnect().await;

    let err = conn.execute("y".into()).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Unusable { state: Disconnected, .. }));
    assert_eq!(err.category(), ErrorCategory::Connection);
    let err = conn.connect().await.unwrap_err();
    assert_eq!(err.as_label(), "connection_unusable");
    assert_eq!(conn.status(), Disconnected);
}

#[tokio::test]
async fn test_connection_lost_moves_to_error() {
    let connector = Scripted::new()
        .perform_script([Err(ConnectorError::disconnected("reset by peer"))]);
    let calls = connector.calls();
    let mut conn = Connection::new(config(3), connector);

    let err = conn.execute("SELECT 1".into()).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Execution);
    assert_eq!(err.attempts(), 1);
    assert_eq!(err.connector_error(), Some(&ConnectorError::disconnected("reset by peer")));
    assert_eq!(conn.status(), Error);
    assert_eq!(calls.perform(), 1);
    assert_eq!(calls.close(), 1);

    let last = conn.last_result().unwrap();
    assert!(!last.is_success());
    assert!(matches!(
        last.outcome,
        Outcome::Failure { label: "execution_error", .. }
    ));

    assert!(matches!(
        conn.execute("SELECT 2".into()).await,
        Err(LifecycleError::Unusable { state: Error, .. })
    ));
}

#[tokio::test]
async fn test_fatal_perform_keeps_connection() {
    let connector = Scripted::new().perform_script([Err(ConnectorError::fatal("syntax error"))]);
    let calls = connector.calls();
    let mut conn = Connection::new(config(3), connector);

    let err = conn.execute("SELEC 1".into()).await.unwrap_err();
    assert_eq!(err.attempts(), 1);
    assert_eq!(err.context().unwrap().operation.as_deref(), Some("\"SELEC 1\""));
    assert_eq!(conn.status(), Connected);

    conn.execute("SELECT 1".into()).await.unwrap();
    assert_eq!(calls.open(), 1);
    assert_eq!(conn.results().len(), 2);
    assert_eq!(conn.metrics().operations_failed, 1);
    assert_eq!(conn.metrics().operations_succeeded, 1);
}

#[tokio::test]
async fn test_invalid_config_fails_without_open() {
    let connector = Scripted::new();
    let calls = connector.calls();
    let cfg = ConnectionConfig::builder("billing", "ftp://billing.internal")
        .backend(Backend::Api(ApiOptions::default()))
        .build();
    let mut conn = Connection::new(cfg, connector);
    let mut rx = conn.subscribe();

    let err = conn.execute("GET /invoices".into()).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert_eq!(err.attempts(), 0);
    assert_eq!(conn.status(), Error);
    assert_eq!(calls.open(), 0);
    assert!(conn.results().is_empty());

    let events = drain(&mut rx);
    let last = of_kind(&events, EventKind::StateChanged).pop().unwrap();
    assert_eq!(last.to, Some(Error));
    assert!(last.reason.is_some());
}

#[tokio::test]
async fn test_error_history_and_info() {
    let connector = Scripted::new().perform_script([Err(ConnectorError::fatal("denied"))]);
    let mut conn = Connection::new(config(0), connector);
    let _ = conn.execute("DROP TABLE t".into()).await;
    conn.disconnect().await;
    let _ = conn.execute("SELECT 1".into()).await;

    let labels: Vec<_> = conn.errors().iter().map(|e| e.as_label()).collect();
    assert_eq!(labels, vec!["execution_error", "connection_unusable"]);

    let info = conn.info();
    assert_eq!(info.name, "orders");
    assert_eq!(info.status, Disconnected);
    assert!(!info.connected);
    assert_eq!(info.metrics.total_errors, 2);
    assert_eq!(info.metrics.total_connections, 1);
    assert!(info.metrics.last_error_at.is_some());
    assert_eq!(conn.config().port(), Some(5432));
}

struct Forward(mpsc::UnboundedSender<Event>);

#[async_trait]
impl Subscribe for Forward {
    async fn on_event(&self, ev: &Event) {
        let _ = self.0.send(ev.clone());
    }
    fn name(&self) -> &'static str {
        "forward"
    }
}

#[tokio::test]
async fn test_subscribers_receive_lifecycle_events() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Forward(tx))];
    let mut conn = Connection::builder(config(0), Scripted::new())
        .with_subscribers(subs)
        .build();

    conn.execute("PING".into()).await.unwrap();

    let connected = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(ev) = rx.recv().await {
            if ev.kind == EventKind::StateChanged && ev.to == Some(Connected) {
                return Some(ev);
            }
        }
        None
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(connected.connection.as_deref(), Some("orders"));
}

struct AlwaysPanics(Arc<AtomicU32>);

#[async_trait]
impl Subscribe for AlwaysPanics {
    async fn on_event(&self, _ev: &Event) {
        self.0.fetch_add(1, Ordering::SeqCst);
        panic!("handler bug");
    }
    fn name(&self) -> &'static str {
        "always-panics"
    }
}

#[tokio::test]
async fn test_panicking_subscriber_sees_each_event_once() {
    let handled = Arc::new(AtomicU32::new(0));
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(AlwaysPanics(Arc::clone(&handled)))];
    let mut conn = Connection::builder(config(0), Scripted::new())
        .with_subscribers(subs)
        .build();
    let mut rx = conn.subscribe();

    // three state changes, one attempt start, one attempt success
    conn.connect().await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    let first = handled.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    let second = handled.load(Ordering::SeqCst);

    assert_eq!(first, 5);
    assert_eq!(second, first);
    let events = drain(&mut rx);
    assert_eq!(of_kind(&events, EventKind::SubscriberPanicked).len(), 5);
}
