//! Event stream publishing.
//!
//! Towers publish one event per call record transition to a tower-specific
//! channel and one registration event to the shared initialization channel.
//! The sink behind [`EventPublisher`] is shared by every tower in the process
//! and must be safe for concurrent use.
//!
//! - [`publisher`] - `EventPublisher` trait, channel naming, publish modes,
//!   log-only publisher
//! - [`redis`] - Redis Streams publisher (`XADD`)

pub mod publisher;
pub mod redis;

pub use publisher::{ChannelKind, ChannelNames, EventPublisher, LogPublisher, PublishMode};
pub use redis::RedisStreamPublisher;
