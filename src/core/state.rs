//! # Connection state machine.
//!
//! [`ConnectionState`] enumerates the lifecycle of one connection and
//! [`StateMachine`] guards it: the only way to change state is
//! [`StateMachine::transition`], which rejects anything not in the table below.
//!
//! ## Transitions
//! ```text
//! Initialized ──► Validating ──► Connecting ──► Connected
//!      │              │              │              │
//!      └──────────────┴──────┬───────┴──────────────┘
//!                            ▼
//!                      Disconnecting ──► Disconnected   (terminal)
//!
//! any non-terminal ──► Error                            (terminal)
//! ```
//!
//! ## Rules
//! - `Error` and `Disconnected` accept no further transitions.
//! - `Connected → Connected` is not a transition: performing keeps the state.
//! - Self-transitions are rejected.

use std::fmt;
use std::time::SystemTime;

use crate::error::LifecycleError;

/// Lifecycle state of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Constructed, never used.
    Initialized,
    /// Configuration is being checked.
    Validating,
    /// `open` is running under the retry policy.
    Connecting,
    /// A handle is open; operations are accepted.
    Connected,
    /// Teardown in progress.
    Disconnecting,
    /// Torn down. Terminal.
    Disconnected,
    /// Unrecoverable failure. Terminal.
    Error,
}

impl ConnectionState {
    /// Returns a short stable label (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Initialized => "initialized",
            ConnectionState::Validating => "validating",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Error => "error",
        }
    }

    /// `true` for `Error` and `Disconnected`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Error | ConnectionState::Disconnected)
    }

    /// Whether `self → next` is a legal transition.
    ///
    /// # Example
    /// ```
    /// use connvisor::ConnectionState::*;
    ///
    /// assert!(Initialized.can_transition_to(Validating));
    /// assert!(Connected.can_transition_to(Error));
    /// assert!(!Initialized.can_transition_to(Connected));
    /// assert!(!Error.can_transition_to(Disconnecting));
    /// ```
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        if self.is_terminal() {
            return false;
        }
        match (*self, next) {
            (Initialized, Validating) => true,
            (Validating, Connecting) => true,
            (Connecting, Connected) => true,
            (Initialized | Validating | Connecting | Connected, Disconnecting) => true,
            (Disconnecting, Disconnected) => true,
            (_, Error) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Holds the current state and enforces the transition table.
#[derive(Debug)]
pub(crate) struct StateMachine {
    current: ConnectionState,
    changed_at: SystemTime,
}

impl StateMachine {
    pub(crate) fn new() -> Self {
        Self {
            current: ConnectionState::Initialized,
            changed_at: SystemTime::now(),
        }
    }

    #[inline]
    pub(crate) fn current(&self) -> ConnectionState {
        self.current
    }

    pub(crate) fn changed_at(&self) -> SystemTime {
        self.changed_at
    }

    /// Moves to `next`, returning the previous state.
    pub(crate) fn transition(
        &mut self,
        next: ConnectionState,
    ) -> Result<ConnectionState, LifecycleError> {
        let from = self.current;
        if !from.can_transition_to(next) {
            return Err(LifecycleError::IllegalTransition {
                from,
                to: next,
                at: SystemTime::now(),
            });
        }
        self.current = next;
        self.changed_at = SystemTime::now();
        Ok(from)
    }
}
