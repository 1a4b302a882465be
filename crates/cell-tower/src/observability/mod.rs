//! Observability for the cell tower process.
//!
//! - [`metrics`] - Prometheus metric definitions (`cell_` prefix)
//! - [`health`] - Liveness and readiness endpoints

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};
pub use metrics::init_metrics_recorder;
