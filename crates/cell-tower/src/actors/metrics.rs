//! Actor metrics and mailbox monitoring.
//!
//! Mailbox depth thresholds for tower actors:
//!
//! | Normal | Warning  | Critical |
//! |--------|----------|----------|
//! | < 100  | 100-500  | > 500    |
//!
//! A tower in flush mode waits on the event stream for every event, so
//! sustained depth usually means the sink is slow.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Mailbox depth thresholds for tower actors.
pub const TOWER_MAILBOX_NORMAL: usize = 100;
pub const TOWER_MAILBOX_WARNING: usize = 500;

/// Mailbox depth level for alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxLevel {
    /// Below normal threshold.
    Normal,
    /// Between normal and warning thresholds.
    Warning,
    /// Above warning threshold.
    Critical,
}

/// Mailbox monitor for one tower.
///
/// Depth is sampled from the receiver each time a message is taken off the
/// mailbox.
#[derive(Debug)]
pub struct MailboxMonitor {
    tower_id: String,
    depth: AtomicUsize,
    peak_depth: AtomicUsize,
    messages_processed: AtomicU64,
}

impl MailboxMonitor {
    #[must_use]
    pub fn new(tower_id: impl Into<String>) -> Self {
        Self {
            tower_id: tower_id.into(),
            depth: AtomicUsize::new(0),
            peak_depth: AtomicUsize::new(0),
            messages_processed: AtomicU64::new(0),
        }
    }

    /// Record the number of messages still queued behind the one being handled.
    pub fn record_depth(&self, depth: usize) {
        let previous = self.depth.swap(depth, Ordering::Relaxed);
        self.peak_depth.fetch_max(depth, Ordering::Relaxed);

        let level = level_for_depth(depth);
        if level == MailboxLevel::Critical {
            warn!(
                target: "cell.actor.mailbox",
                tower_id = %self.tower_id,
                depth = depth,
                threshold = TOWER_MAILBOX_WARNING,
                "Mailbox depth critical"
            );
        } else if level == MailboxLevel::Warning && level_for_depth(previous) == MailboxLevel::Normal
        {
            // Log once when crossing the warning threshold
            debug!(
                target: "cell.actor.mailbox",
                tower_id = %self.tower_id,
                depth = depth,
                "Mailbox depth elevated"
            );
        }
    }

    /// Record a message as fully handled.
    pub fn record_processed(&self) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn current_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn peak_depth(&self) -> usize {
        self.peak_depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn current_level(&self) -> MailboxLevel {
        level_for_depth(self.current_depth())
    }
}

fn level_for_depth(depth: usize) -> MailboxLevel {
    if depth > TOWER_MAILBOX_WARNING {
        MailboxLevel::Critical
    } else if depth >= TOWER_MAILBOX_NORMAL {
        MailboxLevel::Warning
    } else {
        MailboxLevel::Normal
    }
}

/// Aggregated metrics for all towers in the process.
#[derive(Debug, Default)]
pub struct ActorMetrics {
    /// Tower actors currently running.
    pub active_towers: AtomicUsize,
    /// Total actor panics (indicates bugs).
    pub actor_panics: AtomicU64,
    /// Total messages processed across all towers.
    pub total_messages_processed: AtomicU64,
}

impl ActorMetrics {
    /// Create a new shared metrics instance.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn tower_started(&self) {
        self.active_towers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tower_stopped(&self) {
        self.active_towers.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record an actor panic.
    pub fn record_panic(&self) {
        self.actor_panics.fetch_add(1, Ordering::Relaxed);
        tracing::error!(
            target: "cell.actor.panic",
            total_panics = self.actor_panics.load(Ordering::Relaxed),
            "Tower actor panic detected - indicates bug, investigation required"
        );
    }

    pub fn record_message_processed(&self) {
        self.total_messages_processed
            .fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn tower_count(&self) -> usize {
        self.active_towers.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.total_messages_processed.load(Ordering::Relaxed)
    }
}
