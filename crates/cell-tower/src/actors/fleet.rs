//! `TowerFleet` - owner of every tower actor in the process.
//!
//! The fleet:
//! - Spawns towers with child tokens of one root `CancellationToken`
//! - Hands out tower handles to the caller population
//! - Monitors tower health (panic detection via `JoinHandle`)
//! - Shuts every tower down within a deadline
//!
//! Towers never talk to each other, so the fleet is a plain owner rather
//! than an actor of its own.

use crate::admission::UniformDraw;
use crate::errors::TowerError;
use crate::stream::EventPublisher;

use super::messages::TowerStatus;
use super::metrics::ActorMetrics;
use super::tower::{TowerActor, TowerActorHandle, TowerSettings};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A tower and its task.
struct ManagedTower {
    handle: TowerActorHandle,
    task_handle: JoinHandle<()>,
}

/// Set of running towers, in spawn order.
pub struct TowerFleet {
    towers: Vec<ManagedTower>,
    publisher: Arc<dyn EventPublisher>,
    cancel_token: CancellationToken,
    metrics: Arc<ActorMetrics>,
}

impl TowerFleet {
    #[must_use]
    pub fn new(publisher: Arc<dyn EventPublisher>, metrics: Arc<ActorMetrics>) -> Self {
        Self {
            towers: Vec::new(),
            publisher,
            cancel_token: CancellationToken::new(),
            metrics,
        }
    }

    /// Spawn one tower.
    ///
    /// # Errors
    ///
    /// Returns `TowerError::Config` if a tower with the same id is running.
    pub fn spawn_tower(
        &mut self,
        settings: TowerSettings,
        draws: Box<dyn UniformDraw>,
    ) -> Result<TowerActorHandle, TowerError> {
        if self.get(&settings.tower_id).is_some() {
            return Err(TowerError::Config(format!(
                "duplicate tower id: {}",
                settings.tower_id
            )));
        }

        let (handle, task_handle) = TowerActor::spawn(
            settings,
            Arc::clone(&self.publisher),
            draws,
            self.cancel_token.child_token(),
            Arc::clone(&self.metrics),
        );

        debug!(
            target: "cell.actor.fleet",
            tower_id = %handle.tower_id(),
            tower_count = self.towers.len() + 1,
            "Tower spawned"
        );

        self.towers.push(ManagedTower {
            handle: handle.clone(),
            task_handle,
        });
        Ok(handle)
    }

    #[must_use]
    pub fn get(&self, tower_id: &str) -> Option<&TowerActorHandle> {
        self.towers
            .iter()
            .map(|managed| &managed.handle)
            .find(|handle| handle.tower_id() == tower_id)
    }

    /// Handles of all towers, in spawn order.
    #[must_use]
    pub fn handles(&self) -> Vec<TowerActorHandle> {
        self.towers.iter().map(|m| m.handle.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.towers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.towers.is_empty()
    }

    /// Token cancelled when the fleet shuts down.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    /// Send Setup to every tower.
    ///
    /// # Errors
    ///
    /// Returns the first mailbox error; towers before it already got Setup.
    pub async fn broadcast_setup(&self) -> Result<(), TowerError> {
        for managed in &self.towers {
            managed.handle.setup().await?;
        }
        info!(
            target: "cell.actor.fleet",
            tower_count = self.towers.len(),
            "Setup sent to all towers"
        );
        Ok(())
    }

    /// Status of every tower that answers.
    pub async fn statuses(&self) -> Vec<TowerStatus> {
        let mut statuses = Vec::with_capacity(self.towers.len());
        for managed in &self.towers {
            match managed.handle.status().await {
                Ok(status) => statuses.push(status),
                Err(e) => {
                    warn!(
                        target: "cell.actor.fleet",
                        tower_id = %managed.handle.tower_id(),
                        error = %e,
                        "Tower did not report status"
                    );
                }
            }
        }
        statuses
    }

    /// Remove towers whose task has finished and report their ids.
    ///
    /// A tower only finishes on its own if it panicked or every handle to it
    /// was dropped, and the fleet holds one, so any finish here is a bug.
    pub async fn check_health(&mut self) -> Vec<String> {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.towers)
            .into_iter()
            .partition(|managed| managed.task_handle.is_finished());
        self.towers = running;

        let mut removed = Vec::with_capacity(finished.len());
        for managed in finished {
            let tower_id = managed.handle.tower_id().to_string();
            match managed.task_handle.await {
                Ok(()) => {
                    warn!(
                        target: "cell.actor.fleet",
                        tower_id = %tower_id,
                        "Tower actor task finished unexpectedly"
                    );
                }
                Err(join_error) => {
                    if join_error.is_panic() {
                        error!(
                            target: "cell.actor.fleet",
                            tower_id = %tower_id,
                            error = ?join_error,
                            "Tower actor panicked"
                        );
                        self.metrics.record_panic();
                    }
                }
            }
            removed.push(tower_id);
        }
        removed
    }

    /// Cancel every tower and wait for them to stop.
    ///
    /// The deadline bounds the whole wait, not each tower.
    pub async fn shutdown(self, deadline: Duration) {
        info!(
            target: "cell.actor.fleet",
            tower_count = self.towers.len(),
            "Performing graceful shutdown"
        );

        self.cancel_token.cancel();
        let until = tokio::time::Instant::now() + deadline;

        for managed in self.towers {
            let tower_id = managed.handle.tower_id().to_string();
            match tokio::time::timeout_at(until, managed.task_handle).await {
                Ok(Ok(())) => {
                    debug!(
                        target: "cell.actor.fleet",
                        tower_id = %tower_id,
                        "Tower actor completed cleanly"
                    );
                }
                Ok(Err(e)) => {
                    warn!(
                        target: "cell.actor.fleet",
                        tower_id = %tower_id,
                        error = ?e,
                        "Tower actor task panicked during shutdown"
                    );
                }
                Err(_) => {
                    warn!(
                        target: "cell.actor.fleet",
                        tower_id = %tower_id,
                        "Tower actor shutdown timed out"
                    );
                }
            }
        }

        info!(target: "cell.actor.fleet", "Graceful shutdown complete");
    }
}
