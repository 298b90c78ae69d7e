//! # Per-connection result history.
//!
//! [`ResultLog`] is the append-only record of every completed operation on a
//! connection, in completion order. Each entry is an [`ExecutionResult`]: when
//! it finished, how many attempts it took and its [`Outcome`].
//!
//! ## Rules
//! - `record` appends in amortized O(1); nothing is ever evicted.
//! - Growth is unbounded. Callers running long batches should call
//!   [`Connection::reset_results`](crate::Connection::reset_results) between them.
//! - Sequence numbers keep increasing across resets.
//! - Cancelled operations are not recorded; exhausted and fatal ones are, as failures.

use std::time::{Duration, SystemTime};

use crate::error::LifecycleError;

/// Outcome of one operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
    /// Backend payload (rows, response, command output, resource object).
    Success(T),
    /// Final failure after retries or a fatal error.
    Failure {
        /// Stable error label.
        label: &'static str,
        /// Human-readable error message.
        message: String,
    },
}

/// One recorded operation.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionResult<T> {
    /// Position in the connection's lifetime sequence (0-based).
    pub seq: u64,
    /// Completion time.
    pub at: SystemTime,
    /// Attempts used (1 = no retry).
    pub attempts: u32,
    /// Wall time from first attempt to completion, backoff included.
    pub elapsed: Duration,
    /// Operation description.
    pub operation: String,
    /// What happened.
    pub outcome: Outcome<T>,
}

impl<T> ExecutionResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// Payload of a successful operation.
    pub fn output(&self) -> Option<&T> {
        match &self.outcome {
            Outcome::Success(v) => Some(v),
            Outcome::Failure { .. } => None,
        }
    }

    /// Consumes the entry, returning the payload of a successful operation.
    pub fn into_output(self) -> Option<T> {
        match self.outcome {
            Outcome::Success(v) => Some(v),
            Outcome::Failure { .. } => None,
        }
    }
}

/// Ordered, append-only result history.
#[derive(Debug)]
pub struct ResultLog<T> {
    entries: Vec<ExecutionResult<T>>,
    next_seq: u64,
}

impl<T> Default for ResultLog<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<T> ResultLog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an outcome stamped with the current time and returns it.
    pub fn record(
        &mut self,
        operation: String,
        attempts: u32,
        elapsed: Duration,
        outcome: Outcome<T>,
    ) -> &ExecutionResult<T> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(ExecutionResult {
            seq,
            at: SystemTime::now(),
            attempts,
            elapsed,
            operation,
            outcome,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Most recent entry.
    ///
    /// # Errors
    /// [`LifecycleError::NoResults`] when nothing has been recorded since
    /// construction or the last [`ResultLog::clear`].
    pub fn last(&self) -> Result<&ExecutionResult<T>, LifecycleError> {
        self.entries.last().ok_or(LifecycleError::NoResults)
    }

    /// All entries in completion order.
    pub fn all(&self) -> &[ExecutionResult<T>] {
        &self.entries
    }

    /// Drops every entry. Sequence numbering continues.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
