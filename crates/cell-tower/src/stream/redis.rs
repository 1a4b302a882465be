//! Redis Streams publisher.
//!
//! Each event is appended with `XADD <channel> * payload <json>`, optionally
//! capped with `MAXLEN ~ n`. The redis-rs `MultiplexedConnection` is cheap to
//! clone and safe for concurrent use, so every tower shares one publisher and
//! clones the connection per call. No locking is needed.

use crate::errors::TowerError;
use crate::stream::publisher::EventPublisher;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::StreamMaxlen;
use redis::{AsyncCommands, Client};
use tracing::{debug, error, instrument};

/// Field name holding the JSON payload in each stream entry.
pub const PAYLOAD_FIELD: &str = "payload";

/// Publisher appending events to Redis Streams.
#[derive(Clone)]
pub struct RedisStreamPublisher {
    connection: MultiplexedConnection,
    max_len: Option<usize>,
}

impl RedisStreamPublisher {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `TowerError::Publish` if the client cannot be opened or the
    /// connection fails.
    pub async fn connect(redis_url: &str, max_len: Option<usize>) -> Result<Self, TowerError> {
        let client = Client::open(redis_url).map_err(|e| {
            // Do not log redis_url, it may contain credentials.
            error!(
                target: "cell.stream.redis",
                error = %e,
                "Failed to open Redis client"
            );
            TowerError::Publish(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(
                    target: "cell.stream.redis",
                    error = %e,
                    "Failed to connect to Redis"
                );
                TowerError::Publish(format!("Failed to connect to Redis: {e}"))
            })?;

        debug!(
            target: "cell.stream.redis",
            max_len = ?max_len,
            "Redis stream publisher connected"
        );

        Ok(Self {
            connection,
            max_len,
        })
    }
}

#[async_trait]
impl EventPublisher for RedisStreamPublisher {
    #[instrument(skip_all, target = "cell.stream.redis", fields(channel = %channel))]
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), TowerError> {
        let mut conn = self.connection.clone();
        let fields = [(PAYLOAD_FIELD, payload)];

        let result: redis::RedisResult<String> = match self.max_len {
            Some(n) => {
                conn.xadd_maxlen(channel, StreamMaxlen::Approx(n), "*", &fields)
                    .await
            }
            None => conn.xadd(channel, "*", &fields).await,
        };

        let entry_id = result.map_err(|e| {
            TowerError::Publish(format!("XADD to {channel} failed: {e}"))
        })?;

        debug!(
            target: "cell.stream.redis",
            channel = %channel,
            entry_id = %entry_id,
            "Event appended"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
