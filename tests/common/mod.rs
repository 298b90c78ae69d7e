#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use connvisor::{ConnectionConfig, Connector, ConnectorError, Event, EventKind};
use tokio::sync::broadcast;

/// Call counters shared between a test and its connector.
#[derive(Default)]
pub struct Calls {
    pub open: AtomicU32,
    pub perform: AtomicU32,
    pub close: AtomicU32,
}

impl Calls {
    pub fn open(&self) -> u32 {
        self.open.load(Ordering::SeqCst)
    }
    pub fn perform(&self) -> u32 {
        self.perform.load(Ordering::SeqCst)
    }
    pub fn close(&self) -> u32 {
        self.close.load(Ordering::SeqCst)
    }
}

/// Connector replaying scripted outcomes; once a script runs out every call succeeds.
///
/// Successful performs echo the operation back.
#[derive(Default)]
pub struct Scripted {
    pub calls: Arc<Calls>,
    opens: Mutex<VecDeque<Result<(), ConnectorError>>>,
    performs: Mutex<VecDeque<Result<String, ConnectorError>>>,
    open_delay: Option<Duration>,
    close_error: Option<ConnectorError>,
}

impl Scripted {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_script(
        mut self,
        script: impl IntoIterator<Item = Result<(), ConnectorError>>,
    ) -> Self {
        self.opens = Mutex::new(script.into_iter().collect());
        self
    }

    /// Every open fails with `err`.
    pub fn open_always(self, err: ConnectorError) -> Self {
        self.open_script(std::iter::repeat_n(Err(err), 1000))
    }

    pub fn perform_script(
        mut self,
        script: impl IntoIterator<Item = Result<String, ConnectorError>>,
    ) -> Self {
        self.performs = Mutex::new(script.into_iter().collect());
        self
    }

    pub fn open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn close_error(mut self, err: ConnectorError) -> Self {
        self.close_error = Some(err);
        self
    }

    pub fn calls(&self) -> Arc<Calls> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Connector for Scripted {
    type Handle = u32;
    type Operation = String;
    type Output = String;

    fn name(&self) -> &str {
        "scripted"
    }

    async fn open(&self, _config: &ConnectionConfig) -> Result<u32, ConnectorError> {
        let n = self.calls.open.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.opens.lock().unwrap().pop_front();
        next.unwrap_or(Ok(())).map(|()| n)
    }

    async fn perform(
        &self,
        _handle: &mut u32,
        operation: &String,
    ) -> Result<String, ConnectorError> {
        self.calls.perform.fetch_add(1, Ordering::SeqCst);
        let next = self.performs.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(operation.clone()))
    }

    async fn close(&self, _handle: u32) -> Result<(), ConnectorError> {
        self.calls.close.fetch_add(1, Ordering::SeqCst);
        match &self.close_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Config with deterministic, short backoff.
pub fn config(max_retries: u32) -> ConnectionConfig {
    ConnectionConfig::builder("orders", "db.internal")
        .port(5432)
        .max_retries(max_retries)
        .retry_interval(Duration::from_secs(1))
        .retry_backoff(2.0)
        .retry_jitter(false)
        .timeout(Duration::ZERO)
        .build()
}

/// Drains every event currently buffered in `rx`.
pub fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

pub fn of_kind(events: &[Event], kind: EventKind) -> Vec<&Event> {
    events.iter().filter(|e| e.kind == kind).collect()
}
