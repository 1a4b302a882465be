//! Recording event publisher.
//!
//! Stands in for the Redis Streams sink. Every publish is recorded in
//! order, including publishes that were told to fail, so tests can assert on
//! what a tower attempted as well as on what it delivered.

use async_trait::async_trait;
use cell_tower::errors::TowerError;
use cell_tower::stream::EventPublisher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One publish attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    pub channel: String,
    pub payload: String,
    /// Whether the publish was reported as successful.
    pub delivered: bool,
}

impl PublishedEvent {
    /// Payload parsed as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.payload).expect("event payload should be valid JSON")
    }

    /// The `state` field of a call record event.
    pub fn state(&self) -> String {
        self.json()["state"]
            .as_str()
            .expect("event should carry a state")
            .to_string()
    }
}

/// Publisher that records every event. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<PublishedEvent>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every publish fails.
    pub fn failing() -> Self {
        let publisher = Self::new();
        publisher.set_failing(true);
        publisher
    }

    /// Make subsequent publishes fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// This publisher as the shared trait object towers take.
    pub fn shared(&self) -> Arc<dyn EventPublisher> {
        Arc::new(self.clone())
    }

    /// Every publish attempt, in order.
    pub fn events(&self) -> Vec<PublishedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Publish attempts on one channel, in order.
    pub fn events_on(&self, channel: &str) -> Vec<PublishedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.channel == channel)
            .collect()
    }

    /// States of the call record events on one channel, in order.
    pub fn states_on(&self, channel: &str) -> Vec<String> {
        self.events_on(channel).iter().map(PublishedEvent::state).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), TowerError> {
        let delivered = !self.failing.load(Ordering::SeqCst);
        self.events.lock().unwrap().push(PublishedEvent {
            channel: channel.to_string(),
            payload: payload.to_string(),
            delivered,
        });

        if delivered {
            Ok(())
        } else {
            Err(TowerError::Publish(format!("{channel}: sink unavailable")))
        }
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
