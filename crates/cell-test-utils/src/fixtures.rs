//! Pre-configured tower and call record fixtures.

use cell_tower::actors::{
    ActorMetrics, TowerActor, TowerActorHandle, TowerSettings, DEFAULT_MIN_RECEIVE_POWER_DBM,
};
use cell_tower::admission::{AdmissionBands, AdmissionPolicy, BandOrder, ConstantPolicy};
use cell_tower::antenna::Antenna;
use cell_tower::cdr::{CallRecord, SharedCallRecord};
use cell_tower::stream::{ChannelNames, EventPublisher, PublishMode};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::draws::ScriptedDraws;
use crate::mock_publisher::RecordingPublisher;

/// Failure probability used by `TestTower` unless overridden.
pub const TEST_FAIL_PROBABILITY: f64 = 0.1;

/// Tower settings builder.
///
/// Defaults: omni antenna at the origin, 24 dBm, exponent 1, constant
/// failure probability 0.1, fail-first bands with upper bound 0.95, minimum
/// receive power -55 dBm, flush publishing, default channel names.
#[derive(Debug, Clone)]
pub struct TestTower {
    settings: TowerSettings,
}

impl TestTower {
    pub fn new(tower_id: impl Into<String>) -> Self {
        Self {
            settings: TowerSettings {
                tower_id: tower_id.into(),
                antenna: Antenna::omni(0.0, 0.0),
                policy: Arc::new(ConstantPolicy::new(TEST_FAIL_PROBABILITY)),
                bands: AdmissionBands::default(),
                min_receive_power_dbm: DEFAULT_MIN_RECEIVE_POWER_DBM,
                publish_mode: PublishMode::Flush,
                channels: ChannelNames::default(),
            },
        }
    }

    pub fn with_antenna(mut self, antenna: Antenna) -> Self {
        self.settings.antenna = antenna;
        self
    }

    pub fn with_policy(mut self, policy: impl AdmissionPolicy + 'static) -> Self {
        self.settings.policy = Arc::new(policy);
        self
    }

    pub fn with_fail_probability(self, probability: f64) -> Self {
        self.with_policy(ConstantPolicy::new(probability))
    }

    pub fn with_bands(mut self, success_upper_bound: f64, order: BandOrder) -> Self {
        self.settings.bands =
            AdmissionBands::new(success_upper_bound, order).expect("valid admission bands");
        self
    }

    pub fn with_min_receive_power(mut self, min_receive_power_dbm: f64) -> Self {
        self.settings.min_receive_power_dbm = min_receive_power_dbm;
        self
    }

    pub fn with_publish_mode(mut self, publish_mode: PublishMode) -> Self {
        self.settings.publish_mode = publish_mode;
        self
    }

    pub fn with_channels(mut self, channels: ChannelNames) -> Self {
        self.settings.channels = channels;
        self
    }

    pub fn settings(&self) -> TowerSettings {
        self.settings.clone()
    }

    /// Per-tower event channel under these settings.
    pub fn cdr_channel(&self) -> String {
        self.settings.channels.cdr_channel(&self.settings.tower_id)
    }

    /// Spawn the tower with its own cancellation token and metrics.
    pub fn spawn(
        self,
        publisher: &RecordingPublisher,
        draws: ScriptedDraws,
    ) -> (TowerActorHandle, JoinHandle<()>) {
        self.spawn_with(publisher.shared(), draws)
    }

    /// Spawn the tower against any publisher.
    pub fn spawn_with(
        self,
        publisher: Arc<dyn EventPublisher>,
        draws: ScriptedDraws,
    ) -> (TowerActorHandle, JoinHandle<()>) {
        TowerActor::spawn(
            self.settings,
            publisher,
            Box::new(draws),
            CancellationToken::new(),
            ActorMetrics::new(),
        )
    }
}

/// A fresh INITIATED call record shared between caller and tower.
pub fn test_record(caller_id: &str, time: f64) -> SharedCallRecord {
    SharedCallRecord::new(CallRecord::new(caller_id, time))
}
