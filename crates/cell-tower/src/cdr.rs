//! Call detail records.
//!
//! A [`CallRecord`] tracks one caller-tower interaction attempt. The caller
//! creates it before first contact and passes a [`SharedCallRecord`] in its
//! messages; the tower mutates it in place and publishes a snapshot after
//! each transition.
//!
//! ```text
//! INITIATED ──► CONNECTED ──► RECONNECTED
//!     │             │               │
//!     ▼             ▼               ▼
//!   FAILED      DISCONNECTED ◄──────┘
//! ```
//!
//! FAILED and DISCONNECTED are terminal.

use crate::errors::TowerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lifecycle state of a call record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallState {
    Initiated,
    Connected,
    Reconnected,
    Failed,
    Disconnected,
}

impl CallState {
    /// Returns the state as a string for logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CallState::Initiated => "INITIATED",
            CallState::Connected => "CONNECTED",
            CallState::Reconnected => "RECONNECTED",
            CallState::Failed => "FAILED",
            CallState::Disconnected => "DISCONNECTED",
        }
    }

    /// No transition leaves a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, CallState::Failed | CallState::Disconnected)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// A connected caller may say Hello again (reconnect), so CONNECTED and
    /// RECONNECTED may re-enter CONNECTED.
    #[must_use]
    pub const fn can_transition_to(&self, next: CallState) -> bool {
        match (self, next) {
            (
                CallState::Initiated | CallState::Connected | CallState::Reconnected,
                CallState::Connected | CallState::Failed,
            )
            | (CallState::Connected | CallState::Reconnected, CallState::Reconnected)
            | (CallState::Connected | CallState::Reconnected, CallState::Disconnected) => true,
            _ => false,
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One call attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    caller_id: String,
    tower_id: Option<String>,
    /// Simulation time of the request, in seconds.
    time: f64,
    state: CallState,
}

impl CallRecord {
    /// New record in INITIATED state, not yet bound to a tower.
    #[must_use]
    pub fn new(caller_id: impl Into<String>, time: f64) -> Self {
        Self {
            caller_id: caller_id.into(),
            tower_id: None,
            time,
            state: CallState::Initiated,
        }
    }

    #[must_use]
    pub fn caller_id(&self) -> &str {
        &self.caller_id
    }

    #[must_use]
    pub fn tower_id(&self) -> Option<&str> {
        self.tower_id.as_deref()
    }

    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    #[must_use]
    pub fn state(&self) -> CallState {
        self.state
    }

    /// Load signal handed to the admission policy: the request time
    /// truncated to whole seconds.
    #[must_use]
    pub fn load_signal(&self) -> i64 {
        #[allow(clippy::cast_possible_truncation)]
        let secs = self.time.trunc() as i64;
        secs
    }

    /// Binds the record to the tower handling it.
    pub fn assign_tower(&mut self, tower_id: &str) {
        self.tower_id = Some(tower_id.to_string());
    }

    /// Moves the record to `next`.
    ///
    /// # Errors
    ///
    /// Returns `TowerError::InvalidTransition` if the lifecycle forbids the
    /// move; the record is left unchanged.
    pub fn transition(&mut self, next: CallState) -> Result<(), TowerError> {
        if !self.state.can_transition_to(next) {
            return Err(TowerError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Event payload for the stream.
    ///
    /// # Errors
    ///
    /// Returns `TowerError::Serialization` if encoding fails.
    pub fn to_event_payload(&self) -> Result<String, TowerError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A call record shared between a caller and the tower handling it.
///
/// Cloning shares the same record. The lock is only held for the duration of
/// a single transition or snapshot, never across an await point.
#[derive(Debug, Clone)]
pub struct SharedCallRecord {
    inner: Arc<Mutex<CallRecord>>,
}

impl SharedCallRecord {
    #[must_use]
    pub fn new(record: CallRecord) -> Self {
        Self {
            inner: Arc::new(Mutex::new(record)),
        }
    }

    /// Locks the record. A poisoned lock still yields the record; a panic
    /// elsewhere cannot leave a `CallRecord` half-written.
    pub fn lock(&self) -> MutexGuard<'_, CallRecord> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current record.
    #[must_use]
    pub fn snapshot(&self) -> CallRecord {
        self.lock().clone()
    }

    #[must_use]
    pub fn state(&self) -> CallState {
        self.lock().state()
    }

    #[must_use]
    pub fn caller_id(&self) -> String {
        self.lock().caller_id().to_string()
    }

    /// Whether both handles refer to the same record.
    #[must_use]
    pub fn ptr_eq(&self, other: &SharedCallRecord) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<CallRecord> for SharedCallRecord {
    fn from(record: CallRecord) -> Self {
        Self::new(record)
    }
}
