//! Mock caller mailbox.
//!
//! Towers reply through a `CallerRef`. `MockCaller` owns the receiving end
//! and offers timeout-based helpers, since a tower that decides not to
//! answer (out of coverage, dropped request) is indistinguishable from a
//! slow one except by waiting.

use cell_tower::actors::{CallerMessage, CallerRef, TowerActorHandle};
use std::time::Duration;
use tokio::sync::mpsc;

/// How long `recv` waits for a reply.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(1);

/// How long `expect_silence` waits before concluding no reply is coming.
pub const SILENCE_WINDOW: Duration = Duration::from_millis(100);

/// Caller side of a tower conversation.
#[derive(Debug)]
pub struct MockCaller {
    reference: CallerRef,
    inbox: mpsc::Receiver<CallerMessage>,
}

impl MockCaller {
    pub fn new(caller_id: impl Into<String>) -> Self {
        Self::with_capacity(caller_id, 16)
    }

    /// A caller whose mailbox holds at most `capacity` unread replies.
    pub fn with_capacity(caller_id: impl Into<String>, capacity: usize) -> Self {
        let (reference, inbox) = CallerRef::channel(caller_id, capacity);
        Self { reference, inbox }
    }

    /// Return address to put in tower messages.
    pub fn reference(&self) -> CallerRef {
        self.reference.clone()
    }

    pub fn caller_id(&self) -> &str {
        self.reference.caller_id()
    }

    /// Next reply, or `None` if nothing arrives within `REPLY_TIMEOUT`.
    pub async fn recv(&mut self) -> Option<CallerMessage> {
        tokio::time::timeout(REPLY_TIMEOUT, self.inbox.recv())
            .await
            .ok()
            .flatten()
    }

    /// Next reply if one is already queued.
    pub fn try_recv(&mut self) -> Option<CallerMessage> {
        self.inbox.try_recv().ok()
    }

    /// Panics if any reply arrives within `SILENCE_WINDOW`.
    pub async fn expect_silence(&mut self) {
        if let Ok(Some(message)) = tokio::time::timeout(SILENCE_WINDOW, self.inbox.recv()).await
        {
            panic!("expected no reply, got {message:?}");
        }
    }

    /// Next reply, which must be a signal report. Returns
    /// `(distance, power, tower_id, tower)`.
    pub async fn expect_signal_report(&mut self) -> (f64, f64, String, TowerActorHandle) {
        match self.recv().await {
            Some(CallerMessage::SignalReport {
                distance,
                power,
                tower_id,
                tower,
            }) => (distance, power, tower_id, tower),
            other => panic!("expected SignalReport, got {other:?}"),
        }
    }

    /// Next reply, which must be a Connect. Returns `(tower_id, tower)`.
    pub async fn expect_connect(&mut self) -> (String, TowerActorHandle) {
        match self.recv().await {
            Some(CallerMessage::Connect { tower_id, tower }) => (tower_id, tower),
            other => panic!("expected Connect, got {other:?}"),
        }
    }

    /// Next reply, which must be a Fail. Returns the tower id.
    pub async fn expect_fail(&mut self) -> String {
        match self.recv().await {
            Some(CallerMessage::Fail { tower_id }) => tower_id,
            other => panic!("expected Fail, got {other:?}"),
        }
    }

    /// Drop the receiving end so tower replies fail to deliver.
    pub fn hang_up(self) -> CallerRef {
        self.reference
    }
}
