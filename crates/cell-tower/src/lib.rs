//! Cell Tower Simulation Library
//!
//! Base stations for a radio-network call simulation. Each tower is an
//! autonomous actor that:
//!
//! - Answers signal-strength queries from a log-distance propagation model
//! - Admits, fails or silently drops call attempts with a time-varying
//!   failure probability
//! - Records every call state transition as an event on an external stream
//!
//! # Architecture
//!
//! ```text
//! Caller ──► TowerActorHandle ──► TowerActor ──┬──► CallerRef (replies)
//!                                   │          └──► EventPublisher (events)
//!                                   ├── Antenna
//!                                   └── AdmissionPolicy + AdmissionBands
//! ```
//!
//! There are no tower capacity limits, no handoff between towers and no
//! retries: lost interactions are part of the simulation.
//!
//! # Modules
//!
//! - [`actors`] - Tower actors and the fleet that owns them
//! - [`admission`] - Failure probability policies and draw classification
//! - [`antenna`] - Distance and received power
//! - [`cdr`] - Call detail records and their state machine
//! - [`config`] - Process configuration from environment
//! - [`errors`] - Error types
//! - [`observability`] - Metrics and health endpoints
//! - [`stream`] - Event publishing (Redis Streams or log-only)

pub mod actors;
pub mod admission;
pub mod antenna;
pub mod cdr;
pub mod config;
pub mod errors;
pub mod observability;
pub mod stream;
