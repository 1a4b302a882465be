//! Publisher abstraction and channel naming.

use crate::errors::TowerError;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Default channel template for call record events. `{id}` is replaced by
/// the tower id.
pub const DEFAULT_TOWER_CHANNEL_TEMPLATE: &str = "tower-{id}";

/// Default channel for tower registration events.
pub const DEFAULT_INIT_CHANNEL: &str = "init";

const TOWER_ID_PLACEHOLDER: &str = "{id}";

/// Sink for tower events.
///
/// Implementations are shared across all tower actors via `Arc` and are
/// called concurrently.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Append `payload` to `channel`, resolving once the sink acknowledges it.
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), TowerError>;

    /// Publisher name for logs.
    fn name(&self) -> &'static str;
}

/// Which kind of channel an event goes to (bounded metric label).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Per-tower call record channel.
    Cdr,
    /// Shared registration channel.
    Init,
}

impl ChannelKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Cdr => "cdr",
            ChannelKind::Init => "init",
        }
    }
}

/// Channel naming for the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNames {
    tower_template: String,
    init: String,
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self::new(DEFAULT_TOWER_CHANNEL_TEMPLATE, DEFAULT_INIT_CHANNEL)
    }
}

impl ChannelNames {
    /// A template without `{id}` gets the tower id appended.
    #[must_use]
    pub fn new(tower_template: impl Into<String>, init: impl Into<String>) -> Self {
        Self {
            tower_template: tower_template.into(),
            init: init.into(),
        }
    }

    /// Call record channel for `tower_id`.
    #[must_use]
    pub fn cdr_channel(&self, tower_id: &str) -> String {
        if self.tower_template.contains(TOWER_ID_PLACEHOLDER) {
            self.tower_template.replace(TOWER_ID_PLACEHOLDER, tower_id)
        } else {
            format!("{}{tower_id}", self.tower_template)
        }
    }

    /// Shared registration channel.
    #[must_use]
    pub fn init_channel(&self) -> &str {
        &self.init
    }
}

/// How a tower waits on its publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishMode {
    /// Await every publish before handling the next mailbox message.
    ///
    /// Events of one record reach the stream in transition order, but every
    /// message pays the sink's round trip. This caps tower throughput at the
    /// publish latency.
    #[default]
    Flush,
    /// Spawn each publish and log its completion. The mailbox never waits on
    /// the sink; stream order across one record's events is not guaranteed.
    Background,
}

impl PublishMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PublishMode::Flush => "flush",
            PublishMode::Background => "background",
        }
    }
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishMode {
    type Err = TowerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flush" => Ok(PublishMode::Flush),
            "background" => Ok(PublishMode::Background),
            other => Err(TowerError::Config(format!("unknown publish mode: {other}"))),
        }
    }
}

/// Publisher that only logs events. Used for dry runs without a sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), TowerError> {
        info!(
            target: "cell.stream",
            channel = %channel,
            payload = %payload,
            "Event"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
