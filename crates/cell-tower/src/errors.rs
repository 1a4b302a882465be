//! Cell tower error types.
//!
//! None of these errors are fatal to a tower actor. Publish failures are
//! logged and counted, rejected transitions are logged, and unhandled
//! messages are signaled without stopping the mailbox loop.

use crate::cdr::CallState;
use thiserror::Error;

/// Cell tower error type.
#[derive(Debug, Error)]
pub enum TowerError {
    /// Event stream publish failed (transport error).
    #[error("Publish error: {0}")]
    Publish(String),

    /// Event payload could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A call record was asked to move to a state its lifecycle forbids.
    #[error("Invalid call state transition: {from} -> {to}")]
    InvalidTransition { from: CallState, to: CallState },

    /// The tower received a message kind it does not understand.
    #[error("Unhandled message: {0}")]
    UnhandledMessage(String),

    /// An actor mailbox is closed (actor stopped or handle dropped).
    #[error("Mailbox closed: {0}")]
    MailboxClosed(String),

    /// An actor mailbox is full and the message was not queued.
    #[error("Mailbox full: {0}")]
    MailboxFull(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TowerError {
    /// Returns a bounded label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            TowerError::Publish(_) => "publish",
            TowerError::Serialization(_) => "serialization",
            TowerError::Config(_) => "config",
            TowerError::InvalidTransition { .. } => "invalid_transition",
            TowerError::UnhandledMessage(_) => "unhandled_message",
            TowerError::MailboxClosed(_) => "mailbox_closed",
            TowerError::MailboxFull(_) => "mailbox_full",
            TowerError::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for TowerError {
    fn from(err: serde_json::Error) -> Self {
        TowerError::Serialization(err.to_string())
    }
}
