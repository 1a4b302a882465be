//! Actor model for the cell tower simulation.
//!
//! ```text
//! TowerFleet (one per process)
//! └── owns N TowerActors
//!     └── TowerActor (one per cell)
//!         ├── owns its antenna model and admission policy
//!         └── replies to callers through their CallerRef mailboxes
//! ```
//!
//! Each tower is a tokio task with a bounded `mpsc` mailbox and a child
//! `CancellationToken` of the fleet's root token. Callers are external: they
//! hold `TowerActorHandle`s and receive `CallerMessage`s.
//!
//! - [`tower`] - `TowerActor` and its handle
//! - [`fleet`] - `TowerFleet`, spawning and shutdown
//! - [`messages`] - message enums and the caller return address
//! - [`metrics`] - mailbox depth monitoring and process-wide actor counters
//!
//! Each tower in background publish mode also runs one outbox worker that
//! delivers its events in order.

pub mod fleet;
pub mod messages;
pub mod metrics;
mod outbox;
pub mod tower;

pub use fleet::TowerFleet;
pub use messages::{CallerMessage, CallerRef, TowerMessage, TowerStatus};
pub use metrics::{ActorMetrics, MailboxLevel, MailboxMonitor};
pub use tower::{
    RegistrationEvent, TowerActor, TowerActorHandle, TowerSettings,
    DEFAULT_MIN_RECEIVE_POWER_DBM,
};
