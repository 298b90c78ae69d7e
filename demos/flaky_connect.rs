//! # Example: flaky_connect
//!
//! Drives a connection to an in-memory key-value "server" that refuses the
//! first two connection attempts, then serves reads.
//!
//! Shows how to:
//! - Implement [`Connector`] for a backend
//! - Attach the [`LogWriter`] subscriber and see lifecycle events as `tracing` output
//! - Read results, metrics and the error history
//!
//! ## Flow
//! ```text
//! execute(Get("motd"))
//!   ├─► Initialized → Validating → Connecting
//!   ├─► open #1 → refused → BackoffScheduled(200ms)
//!   ├─► open #2 → refused → BackoffScheduled(400ms)
//!   ├─► open #3 → Connected
//!   └─► perform → Success("hello")
//! execute(Get("missing")) → Fatal → Failure recorded, still Connected
//! execute(Crash)          → Disconnected → Failure recorded, Error
//! disconnect()            → state stays Error
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=connvisor=debug cargo run --example flaky_connect
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use connvisor::{
    Connection, ConnectionConfig, Connector, ConnectorError, LogWriter, Outcome, Subscribe,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum Command {
    Get(&'static str),
    Crash,
}

struct KvStore {
    refusals: AtomicU32,
    data: Arc<HashMap<&'static str, &'static str>>,
}

#[async_trait]
impl Connector for KvStore {
    type Handle = Arc<HashMap<&'static str, &'static str>>;
    type Operation = Command;
    type Output = String;

    fn name(&self) -> &str {
        "kv"
    }

    async fn open(&self, cfg: &ConnectionConfig) -> Result<Self::Handle, ConnectorError> {
        let left = self.refusals.load(Ordering::SeqCst);
        if left > 0 {
            self.refusals.store(left - 1, Ordering::SeqCst);
            return Err(ConnectorError::fail(format!("{}: connection refused", cfg.host())));
        }
        Ok(Arc::clone(&self.data))
    }

    async fn perform(
        &self,
        handle: &mut Self::Handle,
        op: &Command,
    ) -> Result<String, ConnectorError> {
        match op {
            Command::Get(key) => handle
                .get(key)
                .map(|v| v.to_string())
                .ok_or_else(|| ConnectorError::fatal(format!("no such key: {key}"))),
            Command::Crash => Err(ConnectorError::disconnected("connection reset by peer")),
        }
    }

    async fn close(&self, _handle: Self::Handle) -> Result<(), ConnectorError> {
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("connvisor=debug")),
        )
        .init();

    let store = KvStore {
        refusals: AtomicU32::new(2),
        data: Arc::new(HashMap::from([("motd", "hello")])),
    };
    let config = ConnectionConfig::builder("kv-demo", "kv.local")
        .port(7000)
        .max_retries(3)
        .retry_interval(Duration::from_millis(200))
        .retry_backoff(2.0)
        .retry_jitter(false)
        .timeout(Duration::from_secs(2))
        .build();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let mut conn = Connection::builder(config, store)
        .with_subscribers(subs)
        .build();

    let res = conn.execute(Command::Get("motd")).await?;
    println!("motd = {:?} after {} attempt(s)", res.output(), res.attempts);

    if let Err(e) = conn.execute(Command::Get("missing")).await {
        println!("lookup failed [{}]: {e}", e.as_label());
    }
    println!("status after fatal perform: {}", conn.status());

    if let Err(e) = conn.execute(Command::Crash).await {
        println!("crash [{}]: {e}", e.as_label());
    }
    conn.disconnect().await;
    println!("status after transport loss: {}", conn.status());

    println!("\nresults:");
    for r in conn.results() {
        match &r.outcome {
            Outcome::Success(v) => println!("  #{} {} -> {v}", r.seq, r.operation),
            Outcome::Failure { label, .. } => println!("  #{} {} -> {label}", r.seq, r.operation),
        }
    }

    let m = conn.metrics();
    println!(
        "\nmetrics: connections={} failed_attempts={} retries={} errors={} avg_connect={:?}",
        m.total_connections,
        m.failed_connections,
        m.total_retries,
        m.total_errors,
        m.avg_connection_time
    );
    println!("errors recorded: {}", conn.errors().len());

    // let the subscriber worker flush before exit
    drop(conn);
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
