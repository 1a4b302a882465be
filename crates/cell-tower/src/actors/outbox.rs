//! Per-tower event delivery.
//!
//! [`PublishSink`] delivers one event and keeps the tower's publish counters.
//! In flush mode the tower awaits the sink inline. In background mode the
//! tower pushes events into an [`Outbox`]: a bounded queue drained by a
//! single worker task, so events leave in the order the tower produced them.
//! The tower joins the worker when it stops, after the queue has drained.

use crate::errors::TowerError;
use crate::observability::metrics as obs;
use crate::stream::{ChannelKind, EventPublisher};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Events the worker may fall behind by before the tower waits on it.
const OUTBOX_BUFFER: usize = 1000;

/// One event bound for the stream.
#[derive(Debug)]
pub(crate) struct Publication {
    pub kind: ChannelKind,
    pub channel: String,
    pub payload: String,
}

/// Delivers events for one tower. Clones share the counters.
#[derive(Clone)]
pub(crate) struct PublishSink {
    publisher: Arc<dyn EventPublisher>,
    tower_id: String,
    published: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
}

impl PublishSink {
    pub(crate) fn new(publisher: Arc<dyn EventPublisher>, tower_id: &str) -> Self {
        Self {
            publisher,
            tower_id: tower_id.to_string(),
            published: Arc::new(AtomicU64::new(0)),
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish one event. Errors are logged and counted, never returned.
    pub(crate) async fn deliver(&self, publication: Publication) {
        let Publication {
            kind,
            channel,
            payload,
        } = publication;

        let start = Instant::now();
        let result = self.publisher.publish(&channel, &payload).await;
        obs::record_publish(kind.as_str(), start.elapsed(), result.is_ok());

        match result {
            Ok(()) => {
                self.published.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.record_failure();
                warn!(
                    target: "cell.actor.outbox",
                    tower_id = %self.tower_id,
                    channel = %channel,
                    publisher = self.publisher.name(),
                    error = %e,
                    "Exception occurred while sending event"
                );
            }
        }
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub(crate) fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Ordered background delivery for one tower.
pub(crate) struct Outbox {
    sender: mpsc::Sender<Publication>,
    worker: JoinHandle<()>,
}

impl Outbox {
    /// Start the delivery worker.
    pub(crate) fn start(sink: PublishSink) -> Self {
        let (sender, receiver) = mpsc::channel(OUTBOX_BUFFER);
        let worker = tokio::spawn(drain(sink, receiver));
        Self { sender, worker }
    }

    /// Queue an event behind every event queued before it.
    ///
    /// Waits only when the worker is `OUTBOX_BUFFER` events behind.
    pub(crate) async fn push(&self, publication: Publication) -> Result<(), TowerError> {
        self.sender
            .send(publication)
            .await
            .map_err(|_| TowerError::MailboxClosed("outbox worker stopped".to_string()))
    }

    /// Stop accepting events and wait until every queued event is delivered.
    pub(crate) async fn close(self, tower_id: &str) {
        let Self { sender, worker } = self;
        drop(sender);

        if let Err(e) = worker.await {
            error!(
                target: "cell.actor.outbox",
                tower_id = %tower_id,
                error = ?e,
                "Outbox worker panicked"
            );
        }
    }
}

async fn drain(sink: PublishSink, mut receiver: mpsc::Receiver<Publication>) {
    debug!(
        target: "cell.actor.outbox",
        tower_id = %sink.tower_id,
        "Outbox worker started"
    );

    while let Some(publication) = receiver.recv().await {
        sink.deliver(publication).await;
    }

    debug!(
        target: "cell.actor.outbox",
        tower_id = %sink.tower_id,
        published = sink.published(),
        failures = sink.failures(),
        "Outbox drained"
    );
}
