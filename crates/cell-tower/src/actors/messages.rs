//! Message types for tower and caller communication.
//!
//! Callers talk to towers through `tokio::sync::mpsc` mailboxes. Replies to
//! callers go to the caller's own mailbox ([`CallerRef`]) with `try_send`, so
//! a slow caller never holds up a tower; status queries use
//! `tokio::sync::oneshot`.

use crate::cdr::SharedCallRecord;
use crate::errors::TowerError;

use super::tower::TowerActorHandle;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

/// Messages sent to a `TowerActor`.
#[derive(Debug)]
pub enum TowerMessage {
    /// Publish the one-time registration event.
    Setup,

    /// A caller at `(x, y)` asks for the received signal strength.
    SignalReportRequest { x: f64, y: f64, reply_to: CallerRef },

    /// Call setup for `record`. `reconnect` marks a caller re-establishing a
    /// call it already had.
    Hello {
        record: SharedCallRecord,
        caller: CallerRef,
        reconnect: bool,
    },

    /// The caller ended the call. No reply is sent.
    Disconnect {
        caller_id: String,
        record: SharedCallRecord,
    },

    /// Snapshot of the tower's counters.
    GetStatus {
        respond_to: oneshot::Sender<TowerStatus>,
    },

    /// An envelope the tower does not understand, as delivered by an
    /// external transport.
    Raw { message_type: String, data: Bytes },
}

/// Messages a tower sends back to callers.
#[derive(Debug, Clone)]
pub enum CallerMessage {
    /// Signal strength at the caller's position. Only sent when in coverage.
    SignalReport {
        distance: f64,
        power: f64,
        tower_id: String,
        tower: TowerActorHandle,
    },

    /// The call was admitted.
    Connect {
        tower_id: String,
        tower: TowerActorHandle,
    },

    /// The call attempt failed.
    Fail { tower_id: String },
}

/// Return address of a caller.
#[derive(Debug, Clone)]
pub struct CallerRef {
    caller_id: String,
    sender: mpsc::Sender<CallerMessage>,
}

impl CallerRef {
    #[must_use]
    pub fn new(caller_id: impl Into<String>, sender: mpsc::Sender<CallerMessage>) -> Self {
        Self {
            caller_id: caller_id.into(),
            sender,
        }
    }

    /// Creates a caller mailbox and the reference towers reply to.
    #[must_use]
    pub fn channel(
        caller_id: impl Into<String>,
        buffer: usize,
    ) -> (Self, mpsc::Receiver<CallerMessage>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self::new(caller_id, sender), receiver)
    }

    #[must_use]
    pub fn caller_id(&self) -> &str {
        &self.caller_id
    }

    /// Deliver a reply to the caller's mailbox without waiting.
    ///
    /// A full or closed mailbox is an error; the reply is not kept.
    pub fn tell(&self, message: CallerMessage) -> Result<(), TowerError> {
        self.sender.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                TowerError::MailboxFull(format!("caller {}", self.caller_id))
            }
            mpsc::error::TrySendError::Closed(_) => {
                TowerError::MailboxClosed(format!("caller {}", self.caller_id))
            }
        })
    }
}

/// Per-tower counters, returned by `GetStatus`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TowerStatus {
    pub tower_id: String,
    pub setups: u64,
    pub connects: u64,
    pub reconnects: u64,
    pub fails: u64,
    pub drops: u64,
    pub disconnects: u64,
    pub reports_sent: u64,
    pub reports_suppressed: u64,
    /// Replies not delivered because the caller mailbox was full or closed.
    pub replies_dropped: u64,
    pub rejected_transitions: u64,
    pub unhandled: u64,
    pub events_published: u64,
    pub publish_failures: u64,
    pub messages_processed: u64,
}
