//! Tower actor behavior through its public handle.
//!
//! Every test talks to a real spawned `TowerActor` with a recording
//! publisher, scripted draws and a mock caller mailbox. `status()` is used
//! as a barrier: the tower answers it in mailbox order, so when it returns
//! every earlier message has been handled and (in flush mode) published.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cell_test_utils::{test_record, MockCaller, RecordingPublisher, ScriptedDraws, TestTower};
use cell_tower::actors::{TowerActorHandle, TowerMessage, TowerStatus};
use cell_tower::admission::{BandOrder, Step, StepPolicy};
use cell_tower::antenna::Antenna;
use cell_tower::cdr::CallState;
use cell_tower::errors::TowerError;
use cell_tower::stream::{ChannelNames, EventPublisher, PublishMode};

/// Recording publisher that takes `delay` for payloads containing `marker`.
struct SlowOn {
    inner: RecordingPublisher,
    marker: &'static str,
    delay: Duration,
}

#[async_trait]
impl EventPublisher for SlowOn {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), TowerError> {
        if payload.contains(self.marker) {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.publish(channel, payload).await
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

fn slow_on(publisher: &RecordingPublisher, marker: &'static str) -> Arc<dyn EventPublisher> {
    Arc::new(SlowOn {
        inner: publisher.clone(),
        marker,
        delay: Duration::from_millis(50),
    })
}

/// Polls until `done` holds for the tower's status.
async fn wait_for_status(tower: &TowerActorHandle, done: impl Fn(&TowerStatus) -> bool) {
    let reached = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if done(&tower.status().await.unwrap()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "tower status did not settle");
}

// ============================================================================
// Signal reports
// ============================================================================

#[tokio::test]
async fn test_signal_report_in_coverage_matches_antenna() {
    let publisher = RecordingPublisher::new();
    let antenna = Antenna::omni(0.0, 0.0).with_power(24.0, 1.0);
    let (tower, _task) = TestTower::new("7")
        .with_antenna(antenna.clone())
        .spawn(&publisher, ScriptedDraws::new([]));
    let mut caller = MockCaller::new("caller-1");

    // 10^7.4 away: 24 - 74 = -50 dBm, above the -55 dBm floor
    let x = 10f64.powf(7.4);
    tower
        .request_signal_report(x, 0.0, caller.reference())
        .await
        .unwrap();

    let (distance, power, tower_id, reply_tower) = caller.expect_signal_report().await;
    assert_eq!(tower_id, "7");
    assert_eq!(reply_tower.tower_id(), "7");
    assert_eq!(distance, antenna.distance(x, 0.0));
    assert_eq!(power, antenna.power(x, 0.0));
    assert!((power - (-50.0)).abs() < 1e-9);

    // Signal queries never publish
    assert!(publisher.events().is_empty());
}

#[tokio::test]
async fn test_signal_report_out_of_coverage_is_silent() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::new([]));
    let mut caller = MockCaller::new("caller-1");

    // 10^8.4 away: 24 - 84 = -60 dBm
    tower
        .request_signal_report(10f64.powf(8.4), 0.0, caller.reference())
        .await
        .unwrap();

    caller.expect_silence().await;
    let status = tower.status().await.unwrap();
    assert_eq!(status.reports_sent, 0);
    assert_eq!(status.reports_suppressed, 1);
}

#[tokio::test]
async fn test_signal_report_at_exact_threshold_is_silent() {
    let antenna = Antenna::omni(0.0, 0.0);
    let threshold = antenna.power(250.0, 0.0);

    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7")
        .with_antenna(antenna)
        .with_min_receive_power(threshold)
        .spawn(&publisher, ScriptedDraws::new([]));
    let mut caller = MockCaller::new("caller-1");

    tower
        .request_signal_report(250.0, 0.0, caller.reference())
        .await
        .unwrap();
    caller.expect_silence().await;

    tower
        .request_signal_report(249.0, 0.0, caller.reference())
        .await
        .unwrap();
    let (_, power, _, _) = caller.expect_signal_report().await;
    assert!(power > threshold);
}

#[tokio::test]
async fn test_signal_report_at_tower_position() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::new([]));
    let mut caller = MockCaller::new("caller-1");

    tower
        .request_signal_report(0.0, 0.0, caller.reference())
        .await
        .unwrap();

    let (distance, power, _, _) = caller.expect_signal_report().await;
    assert_eq!(distance, 0.0);
    assert_eq!(power, 24.0);
}

#[tokio::test]
async fn test_sector_tower_reports_in_front_not_behind() {
    let publisher = RecordingPublisher::new();
    // Boresight along +x, 60 degree beam, 25 dB front-to-back
    let antenna = Antenna::sector(0.0, 0.0, 0.0, std::f64::consts::PI / 3.0, 25.0);
    let (tower, _task) = TestTower::new("s1")
        .with_antenna(antenna)
        .spawn(&publisher, ScriptedDraws::new([]));
    let mut caller = MockCaller::new("caller-1");

    // -50 dBm on boresight, -75 dBm behind the antenna
    let r = 10f64.powf(7.4);
    tower
        .request_signal_report(r, 0.0, caller.reference())
        .await
        .unwrap();
    caller.expect_signal_report().await;

    tower
        .request_signal_report(-r, 0.0, caller.reference())
        .await
        .unwrap();
    caller.expect_silence().await;
}

// ============================================================================
// Hello: admission bands
// ============================================================================

#[tokio::test]
async fn test_hello_in_success_band_connects() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7")
        .with_fail_probability(0.1)
        .spawn(&publisher, ScriptedDraws::constant(0.5));
    let mut caller = MockCaller::new("caller-1");
    let record = test_record("caller-1", 42.0);

    tower
        .hello(record.clone(), caller.reference(), false)
        .await
        .unwrap();

    let (tower_id, reply_tower) = caller.expect_connect().await;
    assert_eq!(tower_id, "7");
    assert_eq!(reply_tower.tower_id(), "7");

    tower.status().await.unwrap();
    assert_eq!(record.state(), CallState::Connected);
    assert_eq!(record.snapshot().tower_id(), Some("7"));

    let events = publisher.events_on("tower-7");
    assert_eq!(events.len(), 1);
    let json = events[0].json();
    assert_eq!(json["callerId"], "caller-1");
    assert_eq!(json["towerId"], "7");
    assert_eq!(json["time"], 42.0);
    assert_eq!(json["state"], "CONNECTED");
}

#[tokio::test]
async fn test_hello_with_reconnect_emits_connected_then_reconnected() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::constant(0.5));
    let mut caller = MockCaller::new("caller-1");
    let record = test_record("caller-1", 0.0);

    tower
        .hello(record.clone(), caller.reference(), true)
        .await
        .unwrap();
    caller.expect_connect().await;

    let status = tower.status().await.unwrap();
    assert_eq!(status.connects, 1);
    assert_eq!(status.reconnects, 1);
    assert_eq!(record.state(), CallState::Reconnected);
    assert_eq!(
        publisher.states_on("tower-7"),
        vec!["CONNECTED", "RECONNECTED"]
    );

    // Both events describe the same record
    let events = publisher.events_on("tower-7");
    assert_eq!(events[0].json()["callerId"], events[1].json()["callerId"]);
}

#[tokio::test]
async fn test_reconnect_hello_on_connected_record() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::constant(0.5));
    let mut caller = MockCaller::new("caller-1");
    let record = test_record("caller-1", 0.0);

    tower
        .hello(record.clone(), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_connect().await;
    tower
        .hello(record.clone(), caller.reference(), true)
        .await
        .unwrap();
    caller.expect_connect().await;

    tower.status().await.unwrap();
    assert_eq!(record.state(), CallState::Reconnected);
    assert_eq!(
        publisher.states_on("tower-7"),
        vec!["CONNECTED", "CONNECTED", "RECONNECTED"]
    );
}

#[tokio::test]
async fn test_hello_in_fail_band_fails() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7")
        .with_fail_probability(0.1)
        .spawn(&publisher, ScriptedDraws::constant(0.05));
    let mut caller = MockCaller::new("caller-1");
    let record = test_record("caller-1", 0.0);

    tower
        .hello(record.clone(), caller.reference(), false)
        .await
        .unwrap();

    assert_eq!(caller.expect_fail().await, "7");
    tower.status().await.unwrap();
    assert_eq!(record.state(), CallState::Failed);
    assert_eq!(publisher.states_on("tower-7"), vec!["FAILED"]);
}

#[tokio::test]
async fn test_hello_in_drop_band_is_lost() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::constant(0.97));
    let mut caller = MockCaller::new("caller-1");
    let record = test_record("caller-1", 0.0);

    tower
        .hello(record.clone(), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_silence().await;

    let status = tower.status().await.unwrap();
    assert_eq!(status.drops, 1);
    assert_eq!(record.state(), CallState::Initiated);
    assert!(publisher.events().is_empty());
}

#[tokio::test]
async fn test_hello_draws_on_band_boundaries() {
    let publisher = RecordingPublisher::new();
    // fail [0, 0.1), connect [0.1, 0.95), drop [0.95, 1)
    let (tower, _task) = TestTower::new("7")
        .with_fail_probability(0.1)
        .spawn(&publisher, ScriptedDraws::new([0.1, 0.95]));
    let mut caller = MockCaller::new("caller-1");

    tower
        .hello(test_record("caller-1", 0.0), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_connect().await;

    tower
        .hello(test_record("caller-1", 0.0), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_silence().await;

    let status = tower.status().await.unwrap();
    assert_eq!((status.connects, status.fails, status.drops), (1, 0, 1));
    assert_eq!(publisher.states_on("tower-7"), vec!["CONNECTED"]);
}

#[tokio::test]
async fn test_saturating_fail_probabilities() {
    // Zero: the fail band is empty, even a draw of 0 connects
    let publisher = RecordingPublisher::new();
    let (never_fails, _task) = TestTower::new("a")
        .with_fail_probability(0.0)
        .spawn(&publisher, ScriptedDraws::constant(0.0));
    let mut caller = MockCaller::new("caller-1");

    never_fails
        .hello(test_record("caller-1", 0.0), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_connect().await;

    // Above the success bound: the connect band is empty, the drop band remains
    let (always_fails, _task) = TestTower::new("b")
        .with_fail_probability(0.99)
        .spawn(&publisher, ScriptedDraws::new([0.5, 0.995]));

    always_fails
        .hello(test_record("caller-1", 0.0), caller.reference(), false)
        .await
        .unwrap();
    assert_eq!(caller.expect_fail().await, "b");

    always_fails
        .hello(test_record("caller-1", 0.0), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_silence().await;

    let status = always_fails.status().await.unwrap();
    assert_eq!((status.connects, status.fails, status.drops), (0, 1, 1));
}

#[tokio::test]
async fn test_success_first_band_order() {
    let publisher = RecordingPublisher::new();
    // connect [0, 0.8), fail [0.8, 0.9), drop [0.9, 1)
    let (tower, _task) = TestTower::new("7")
        .with_bands(0.8, BandOrder::SuccessFirst)
        .with_fail_probability(0.1)
        .spawn(&publisher, ScriptedDraws::new([0.05, 0.85, 0.95]));
    let mut caller = MockCaller::new("caller-1");

    for _ in 0..3 {
        let record = test_record("caller-1", 0.0);
        tower.hello(record, caller.reference(), false).await.unwrap();
    }

    caller.expect_connect().await;
    caller.expect_fail().await;
    caller.expect_silence().await;

    let status = tower.status().await.unwrap();
    assert_eq!((status.connects, status.fails, status.drops), (1, 1, 1));
    assert_eq!(publisher.states_on("tower-7"), vec!["CONNECTED", "FAILED"]);
}

#[tokio::test]
async fn test_time_varying_policy_uses_record_time() {
    // Calls fail in the second half of every 100s period
    let policy = StepPolicy::new(
        100,
        vec![
            Step {
                start_secs: 0,
                probability: 0.0,
            },
            Step {
                start_secs: 50,
                probability: 0.9,
            },
        ],
    );
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7")
        .with_policy(policy)
        .spawn(&publisher, ScriptedDraws::constant(0.5));
    let mut caller = MockCaller::new("caller-1");

    tower
        .hello(test_record("caller-1", 10.9), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_connect().await;

    tower
        .hello(test_record("caller-1", 175.2), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_fail().await;
}

#[tokio::test]
async fn test_hello_on_terminal_record_is_rejected() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::new([0.05, 0.5]));
    let mut caller = MockCaller::new("caller-1");
    let record = test_record("caller-1", 0.0);

    tower
        .hello(record.clone(), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_fail().await;

    tower
        .hello(record.clone(), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_silence().await;

    let status = tower.status().await.unwrap();
    assert_eq!(status.rejected_transitions, 1);
    assert_eq!(status.connects, 0);
    assert_eq!(record.state(), CallState::Failed);
    assert_eq!(publisher.states_on("tower-7"), vec!["FAILED"]);
}

// ============================================================================
// Disconnect
// ============================================================================

#[tokio::test]
async fn test_disconnect_after_connect() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::constant(0.5));
    let mut caller = MockCaller::new("caller-1");
    let record = test_record("caller-1", 0.0);

    tower
        .hello(record.clone(), caller.reference(), false)
        .await
        .unwrap();
    let (_, reply_tower) = caller.expect_connect().await;
    tower.status().await.unwrap();
    publisher.clear();

    // The tower reference from the reply is a working handle
    reply_tower
        .disconnect("caller-1", record.clone())
        .await
        .unwrap();
    caller.expect_silence().await;

    let status = tower.status().await.unwrap();
    assert_eq!(status.disconnects, 1);
    assert_eq!(record.state(), CallState::Disconnected);
    assert_eq!(publisher.states_on("tower-7"), vec!["DISCONNECTED"]);
}

#[tokio::test]
async fn test_disconnect_after_reconnect() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::constant(0.5));
    let mut caller = MockCaller::new("caller-1");
    let record = test_record("caller-1", 0.0);

    tower
        .hello(record.clone(), caller.reference(), true)
        .await
        .unwrap();
    caller.expect_connect().await;
    tower.disconnect("caller-1", record.clone()).await.unwrap();

    tower.status().await.unwrap();
    assert_eq!(
        publisher.states_on("tower-7"),
        vec!["CONNECTED", "RECONNECTED", "DISCONNECTED"]
    );
}

#[tokio::test]
async fn test_disconnect_rejected_unless_connected() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::new([0.05, 0.5]));
    let mut caller = MockCaller::new("caller-1");

    // INITIATED
    let fresh = test_record("caller-1", 0.0);
    tower.disconnect("caller-1", fresh.clone()).await.unwrap();

    // FAILED
    let failed = test_record("caller-1", 0.0);
    tower
        .hello(failed.clone(), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_fail().await;
    tower.disconnect("caller-1", failed.clone()).await.unwrap();

    // DISCONNECTED twice
    let ended = test_record("caller-1", 0.0);
    tower
        .hello(ended.clone(), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_connect().await;
    tower.disconnect("caller-1", ended.clone()).await.unwrap();
    tower.disconnect("caller-1", ended.clone()).await.unwrap();

    let status = tower.status().await.unwrap();
    assert_eq!(status.rejected_transitions, 3);
    assert_eq!(status.disconnects, 1);
    assert_eq!(fresh.state(), CallState::Initiated);
    assert_eq!(failed.state(), CallState::Failed);
    assert_eq!(
        publisher.states_on("tower-7"),
        vec!["FAILED", "CONNECTED", "DISCONNECTED"]
    );
}

// ============================================================================
// Setup
// ============================================================================

#[tokio::test]
async fn test_setup_publishes_one_registration_event() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7")
        .with_antenna(Antenna::omni(3.0, 4.0))
        .spawn(&publisher, ScriptedDraws::new([]));

    tower.setup().await.unwrap();
    tower.status().await.unwrap();

    let events = publisher.events_on("init");
    assert_eq!(events.len(), 1);
    let json = events[0].json();
    assert_eq!(json["towerId"], "7");
    assert_eq!(json["x"], 3.0);
    assert_eq!(json["y"], 4.0);
    assert_eq!(json["transmitPowerDbm"], 24.0);
    assert_eq!(json["pathLossExponent"], 1.0);
    assert_eq!(json["referenceDistance"], 1.0);
    assert_eq!(json["pattern"]["kind"], "omni");
    assert_eq!(json["minimumReceivePower"], -55.0);
}

#[tokio::test]
async fn test_no_setup_means_no_registration() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::constant(0.5));
    let mut caller = MockCaller::new("caller-1");

    tower
        .request_signal_report(1.0, 1.0, caller.reference())
        .await
        .unwrap();
    tower
        .hello(test_record("caller-1", 0.0), caller.reference(), false)
        .await
        .unwrap();
    tower.status().await.unwrap();

    assert!(publisher.events_on("init").is_empty());
    assert_eq!(publisher.events_on("tower-7").len(), 1);
}

#[tokio::test]
async fn test_custom_channel_names() {
    let publisher = RecordingPublisher::new();
    let fixture = TestTower::new("3")
        .with_channels(ChannelNames::new("/telco:tower{id}.cdr", "/telco:init"));
    let cdr_channel = fixture.cdr_channel();
    let (tower, _task) = fixture.spawn(&publisher, ScriptedDraws::constant(0.5));
    let mut caller = MockCaller::new("caller-1");

    tower.setup().await.unwrap();
    tower
        .hello(test_record("caller-1", 0.0), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_connect().await;
    tower.status().await.unwrap();

    assert_eq!(cdr_channel, "/telco:tower3.cdr");
    assert_eq!(publisher.events_on("/telco:init").len(), 1);
    assert_eq!(publisher.states_on(&cdr_channel), vec!["CONNECTED"]);
    assert!(publisher.events_on("init").is_empty());
}

#[tokio::test]
async fn test_repeated_setup_publishes_each_time() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::new([]));

    tower.setup().await.unwrap();
    tower.setup().await.unwrap();
    tower.status().await.unwrap();

    let events = publisher.events_on("init");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].payload, events[1].payload);
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_publish_failure_keeps_state_and_reply() {
    let publisher = RecordingPublisher::failing();
    let (tower, _task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::new([0.5, 0.05]));
    let mut caller = MockCaller::new("caller-1");

    let connected = test_record("caller-1", 0.0);
    tower
        .hello(connected.clone(), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_connect().await;

    let failed = test_record("caller-2", 0.0);
    tower
        .hello(failed.clone(), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_fail().await;

    let status = tower.status().await.unwrap();
    assert_eq!(connected.state(), CallState::Connected);
    assert_eq!(failed.state(), CallState::Failed);
    assert_eq!(status.publish_failures, 2);
    assert_eq!(status.events_published, 0);

    // The tower kept going and still attempted both events
    assert_eq!(publisher.states_on("tower-7"), vec!["CONNECTED", "FAILED"]);
}

#[tokio::test]
async fn test_unhandled_message_does_not_stop_tower() {
    let publisher = RecordingPublisher::new();
    let (tower, task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::constant(0.5));
    let mut caller = MockCaller::new("caller-1");

    tower
        .send(TowerMessage::Raw {
            message_type: "handoff".to_string(),
            data: Bytes::from_static(b"opaque"),
        })
        .await
        .unwrap();
    tower
        .hello(test_record("caller-1", 0.0), caller.reference(), false)
        .await
        .unwrap();

    caller.expect_connect().await;
    let status = tower.status().await.unwrap();
    assert_eq!(status.unhandled, 1);
    assert_eq!(status.connects, 1);
    assert!(!task.is_finished());
}

#[tokio::test]
async fn test_closed_caller_mailbox_is_ignored() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::constant(0.5));
    let gone = MockCaller::new("caller-1").hang_up();
    let record = test_record("caller-1", 0.0);

    tower.hello(record.clone(), gone, false).await.unwrap();

    let status = tower.status().await.unwrap();
    assert_eq!(status.connects, 1);
    assert_eq!(status.replies_dropped, 1);
    assert_eq!(record.state(), CallState::Connected);
    assert_eq!(publisher.states_on("tower-7"), vec!["CONNECTED"]);
}

#[tokio::test]
async fn test_full_caller_mailbox_does_not_stall_tower() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::new([]));
    // One slot, never drained until the end
    let mut caller = MockCaller::with_capacity("caller-1", 1);

    for _ in 0..2 {
        tower
            .request_signal_report(1.0, 0.0, caller.reference())
            .await
            .unwrap();
    }

    let status = tokio::time::timeout(Duration::from_secs(2), tower.status())
        .await
        .expect("tower should keep processing its mailbox")
        .unwrap();
    assert_eq!(status.reports_sent, 2);
    assert_eq!(status.replies_dropped, 1);

    caller.expect_signal_report().await;
    caller.expect_silence().await;
}

// ============================================================================
// Publish modes and lifecycle
// ============================================================================

#[tokio::test]
async fn test_background_publish_delivers_events() {
    let publisher = RecordingPublisher::new();
    let (tower, _task) = TestTower::new("7")
        .with_publish_mode(PublishMode::Background)
        .spawn(&publisher, ScriptedDraws::constant(0.5));
    let mut caller = MockCaller::new("caller-1");

    tower.setup().await.unwrap();
    tower
        .hello(test_record("caller-1", 0.0), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_connect().await;

    wait_for_status(&tower, |status| status.events_published == 2).await;

    assert_eq!(publisher.events_on("init").len(), 1);
    assert_eq!(publisher.states_on("tower-7"), vec!["CONNECTED"]);
}

#[tokio::test]
async fn test_background_publish_keeps_record_order() {
    let publisher = RecordingPublisher::new();
    // The first event of the pair is the slow one
    let (tower, _task) = TestTower::new("7")
        .with_publish_mode(PublishMode::Background)
        .spawn_with(
            slow_on(&publisher, "\"CONNECTED\""),
            ScriptedDraws::constant(0.5),
        );
    let mut caller = MockCaller::new("caller-1");
    let record = test_record("caller-1", 0.0);

    tower
        .hello(record.clone(), caller.reference(), true)
        .await
        .unwrap();
    caller.expect_connect().await;
    tower.disconnect("caller-1", record).await.unwrap();

    wait_for_status(&tower, |status| status.events_published == 3).await;
    assert_eq!(
        publisher.states_on("tower-7"),
        vec!["CONNECTED", "RECONNECTED", "DISCONNECTED"]
    );
}

#[tokio::test]
async fn test_background_events_delivered_before_tower_stops() {
    let publisher = RecordingPublisher::new();
    let (tower, task) = TestTower::new("7")
        .with_publish_mode(PublishMode::Background)
        .spawn_with(slow_on(&publisher, "FAILED"), ScriptedDraws::constant(0.05));
    let mut caller = MockCaller::new("caller-1");

    tower
        .hello(test_record("caller-1", 0.0), caller.reference(), false)
        .await
        .unwrap();
    caller.expect_fail().await;
    drop(tower);

    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("tower should stop once its handles are gone")
        .unwrap();
    assert_eq!(publisher.states_on("tower-7"), vec!["FAILED"]);
}

#[tokio::test]
async fn test_cancelled_tower_stops() {
    let publisher = RecordingPublisher::new();
    let (tower, task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::new([]));

    tower.cancel();
    let result = tokio::time::timeout(Duration::from_secs(1), task).await;
    assert!(result.is_ok(), "tower should stop when cancelled");
    assert!(tower.setup().await.is_err());
}
