//! Cell Tower
//!
//! Runs a fleet of simulated base stations for a radio-network call
//! simulation. Callers in the same process talk to towers through
//! `TowerActorHandle`s; every call state transition is published to the
//! event stream.
//!
//! # Servers
//!
//! - HTTP server for health endpoints and `/metrics` (default: 0.0.0.0:8090)
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize Prometheus metrics recorder
//! 3. Connect the event publisher (Redis Streams, or log-only if unset)
//! 4. Spawn one `TowerActor` per configured cell
//! 5. Send Setup to every tower (registration events), mark ready
//! 6. Start health HTTP server (liveness, readiness, metrics)
//! 7. Watch tower health until the shutdown signal

#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)] // main.rs orchestrates startup, naturally longer

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use cell_tower::actors::{ActorMetrics, TowerFleet};
use cell_tower::admission::draw_source;
use cell_tower::config::Config;
use cell_tower::observability::{health_router, init_metrics_recorder, HealthState};
use cell_tower::stream::{EventPublisher, LogPublisher, RedisStreamPublisher};
use secrecy::ExposeSecret;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often the fleet is checked for towers that stopped unexpectedly.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound on waiting for towers to drain at shutdown.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cell_tower=debug,cell=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cell Tower");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        health_bind_address = %config.health_bind_address,
        tower_count = config.tower_count,
        tower_spacing = config.tower_spacing,
        policy = ?config.policy,
        band_order = %config.bands.order(),
        success_upper_bound = config.bands.success_upper_bound(),
        min_receive_power_dbm = config.min_receive_power_dbm,
        publish_mode = %config.publish_mode,
        seeded = config.rng_seed.is_some(),
        "Configuration loaded successfully"
    );

    // Initialize Prometheus metrics recorder
    // This must happen before any metrics are recorded
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;
    info!("Prometheus metrics recorder initialized");

    let health_state = Arc::new(HealthState::new());

    // Event publisher
    let publisher: Arc<dyn EventPublisher> = if let Some(redis_url) = &config.redis_url {
        info!("Connecting to Redis...");
        let publisher =
            RedisStreamPublisher::connect(redis_url.expose_secret(), config.stream_max_len)
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to connect to Redis");
                    e
                })?;
        info!("Redis connection established");
        Arc::new(publisher)
    } else {
        warn!("REDIS_URL not set, events will only be logged");
        Arc::new(LogPublisher)
    };

    // Spawn towers
    let actor_metrics = ActorMetrics::new();
    let mut fleet = TowerFleet::new(Arc::clone(&publisher), Arc::clone(&actor_metrics));

    for (index, settings) in config.tower_settings().into_iter().enumerate() {
        let (x, y) = settings.antenna.position();
        debug!(
            tower_id = %settings.tower_id,
            x = x,
            y = y,
            coverage_radius = settings.antenna.range_for_power(config.min_receive_power_dbm),
            "Spawning tower"
        );
        fleet.spawn_tower(settings, draw_source(config.seed_for(index)))?;
    }

    fleet.broadcast_setup().await.map_err(|e| {
        error!(error = %e, "Failed to send Setup to towers");
        e
    })?;
    health_state.set_ready();
    info!(
        tower_count = fleet.len(),
        publisher = publisher.name(),
        "Towers registered"
    );

    let shutdown_token = fleet.child_token();

    // Start health HTTP server (MUST succeed - fail startup if it doesn't)
    let health_addr: SocketAddr = config.health_bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.health_bind_address, "Invalid health bind address");
        format!("Invalid health bind address: {e}")
    })?;

    let health_router = health_router(Arc::clone(&health_state));

    // Add /metrics endpoint served by Prometheus exporter
    let metrics_router = Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );

    let app = health_router.merge(metrics_router);

    // Bind listener BEFORE spawning to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(health_addr)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %health_addr, "Failed to bind health server");
            format!("Failed to bind health server to {health_addr}: {e}")
        })?;

    let health_shutdown_token = shutdown_token.child_token();
    tokio::spawn(async move {
        info!(addr = %health_addr, "Health server starting");
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            health_shutdown_token.cancelled().await;
            info!("Health server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "Health server failed");
        }
    });

    info!("Cell Tower running - press Ctrl+C to shutdown");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut health_check = tokio::time::interval(HEALTH_CHECK_INTERVAL);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = health_check.tick() => {
                let removed = fleet.check_health().await;
                if !removed.is_empty() {
                    warn!(
                        removed = ?removed,
                        remaining = fleet.len(),
                        "Towers stopped unexpectedly"
                    );
                }
            }
        }
    }

    info!("Shutdown signal received, initiating graceful shutdown...");

    // Mark as not ready immediately
    health_state.set_not_ready();

    for status in fleet.statuses().await {
        info!(
            tower_id = %status.tower_id,
            connects = status.connects,
            reconnects = status.reconnects,
            fails = status.fails,
            drops = status.drops,
            disconnects = status.disconnects,
            publish_failures = status.publish_failures,
            "Tower summary"
        );
    }

    shutdown_token.cancel();
    fleet.shutdown(SHUTDOWN_DEADLINE).await;

    info!("Cell Tower shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
