//! `TowerActor` - one actor per simulated cell.
//!
//! Each `TowerActor`:
//! - Owns one antenna model and one admission policy, both immutable
//! - Processes its mailbox one message at a time, in arrival order
//! - Drives the call record state machine and publishes one event per
//!   transition to its own channel
//! - Replies to callers on their mailboxes
//!
//! # Hello handling
//!
//! One uniform draw per Hello is classified into the fail, connect or drop
//! band (see [`crate::admission`]). Drops get no reply and no event.
//!
//! # Publishing
//!
//! In flush mode each event is published before the next mailbox entry. In
//! background mode events go through the tower's outbox, which keeps
//! their order. A failed publish is logged and counted. The transition
//! already applied to the record stays applied and the caller reply is
//! still sent.
//!
//! # Replies
//!
//! Replies are queued on the caller mailbox without waiting. A reply that
//! does not fit (full or closed mailbox) is logged and counted, and the
//! tower moves on.
//!
//! # Lifecycle
//!
//! 1. Spawned by the `TowerFleet` at simulation setup
//! 2. Runs until cancelled or until every handle is dropped
//! 3. Never migrated or restarted during a run

use crate::admission::{AdmissionBands, AdmissionOutcome, AdmissionPolicy, UniformDraw};
use crate::antenna::{Antenna, AntennaDescriptor};
use crate::cdr::{CallRecord, CallState, SharedCallRecord};
use crate::errors::TowerError;
use crate::observability::metrics as obs;
use crate::stream::{ChannelKind, ChannelNames, EventPublisher, PublishMode};

use super::messages::{CallerMessage, CallerRef, TowerMessage, TowerStatus};
use super::metrics::{ActorMetrics, MailboxMonitor};
use super::outbox::{Outbox, Publication, PublishSink};

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Default channel buffer size for the tower mailbox.
const TOWER_CHANNEL_BUFFER: usize = 1000;

/// Default minimum receive power in dBm for a signal report.
pub const DEFAULT_MIN_RECEIVE_POWER_DBM: f64 = -55.0;

/// Static settings of one tower.
#[derive(Debug, Clone)]
pub struct TowerSettings {
    pub tower_id: String,
    pub antenna: Antenna,
    pub policy: Arc<dyn AdmissionPolicy>,
    pub bands: AdmissionBands,
    /// Reports are only sent when received power is strictly above this.
    pub min_receive_power_dbm: f64,
    pub publish_mode: PublishMode,
    pub channels: ChannelNames,
}

/// Registration event published on Setup.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationEvent<'a> {
    pub tower_id: &'a str,
    #[serde(flatten)]
    pub antenna: AntennaDescriptor,
    pub minimum_receive_power: f64,
}

/// Handle to a `TowerActor`. Cheap to clone; this is the tower reference
/// callers receive in replies.
#[derive(Clone, Debug)]
pub struct TowerActorHandle {
    sender: mpsc::Sender<TowerMessage>,
    cancel_token: CancellationToken,
    tower_id: String,
}

impl TowerActorHandle {
    #[must_use]
    pub fn tower_id(&self) -> &str {
        &self.tower_id
    }

    /// Deliver any message to the tower mailbox.
    pub async fn send(&self, message: TowerMessage) -> Result<(), TowerError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TowerError::MailboxClosed(format!("tower {}", self.tower_id)))
    }

    /// Ask the tower to publish its registration event.
    pub async fn setup(&self) -> Result<(), TowerError> {
        self.send(TowerMessage::Setup).await
    }

    /// Ask for a signal report at `(x, y)`; the reply (if any) goes to `reply_to`.
    pub async fn request_signal_report(
        &self,
        x: f64,
        y: f64,
        reply_to: CallerRef,
    ) -> Result<(), TowerError> {
        self.send(TowerMessage::SignalReportRequest { x, y, reply_to })
            .await
    }

    /// Start (or re-establish) a call.
    pub async fn hello(
        &self,
        record: SharedCallRecord,
        caller: CallerRef,
        reconnect: bool,
    ) -> Result<(), TowerError> {
        self.send(TowerMessage::Hello {
            record,
            caller,
            reconnect,
        })
        .await
    }

    /// End a call.
    pub async fn disconnect(
        &self,
        caller_id: impl Into<String>,
        record: SharedCallRecord,
    ) -> Result<(), TowerError> {
        self.send(TowerMessage::Disconnect {
            caller_id: caller_id.into(),
            record,
        })
        .await
    }

    /// Tower counters. Every message sent before this call has been handled
    /// when it returns.
    pub async fn status(&self) -> Result<TowerStatus, TowerError> {
        let (tx, rx) = oneshot::channel();
        self.send(TowerMessage::GetStatus { respond_to: tx }).await?;

        rx.await
            .map_err(|e| TowerError::Internal(format!("response receive failed: {e}")))
    }

    /// Cancel the tower actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// The `TowerActor` implementation.
pub struct TowerActor {
    tower_id: String,
    antenna: Antenna,
    policy: Arc<dyn AdmissionPolicy>,
    bands: AdmissionBands,
    min_receive_power_dbm: f64,
    publish_mode: PublishMode,
    cdr_channel: String,
    init_channel: String,
    sink: PublishSink,
    /// Present while running in background mode.
    outbox: Option<Outbox>,
    draws: Box<dyn UniformDraw>,
    receiver: mpsc::Receiver<TowerMessage>,
    /// Weak so the actor's own reference does not keep its mailbox open.
    self_sender: mpsc::WeakSender<TowerMessage>,
    cancel_token: CancellationToken,
    metrics: Arc<ActorMetrics>,
    mailbox: MailboxMonitor,
    status: TowerStatus,
}

impl TowerActor {
    /// Spawn a new tower actor.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        settings: TowerSettings,
        publisher: Arc<dyn EventPublisher>,
        draws: Box<dyn UniformDraw>,
        cancel_token: CancellationToken,
        metrics: Arc<ActorMetrics>,
    ) -> (TowerActorHandle, JoinHandle<()>) {
        let (actor, handle) = Self::new(settings, publisher, draws, cancel_token, metrics);
        let task_handle = tokio::spawn(actor.run());
        (handle, task_handle)
    }

    fn new(
        settings: TowerSettings,
        publisher: Arc<dyn EventPublisher>,
        draws: Box<dyn UniformDraw>,
        cancel_token: CancellationToken,
        metrics: Arc<ActorMetrics>,
    ) -> (Self, TowerActorHandle) {
        let (sender, receiver) = mpsc::channel(TOWER_CHANNEL_BUFFER);
        let TowerSettings {
            tower_id,
            antenna,
            policy,
            bands,
            min_receive_power_dbm,
            publish_mode,
            channels,
        } = settings;

        let actor = Self {
            cdr_channel: channels.cdr_channel(&tower_id),
            init_channel: channels.init_channel().to_string(),
            antenna,
            policy,
            bands,
            min_receive_power_dbm,
            publish_mode,
            sink: PublishSink::new(publisher, &tower_id),
            outbox: None,
            draws,
            receiver,
            self_sender: sender.downgrade(),
            cancel_token: cancel_token.clone(),
            metrics,
            mailbox: MailboxMonitor::new(&tower_id),
            status: TowerStatus {
                tower_id: tower_id.clone(),
                ..TowerStatus::default()
            },
            tower_id: tower_id.clone(),
        };

        let handle = TowerActorHandle {
            sender,
            cancel_token,
            tower_id,
        };

        (actor, handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "cell.actor.tower", fields(tower_id = %self.tower_id))]
    async fn run(mut self) {
        self.metrics.tower_started();
        if self.publish_mode == PublishMode::Background {
            self.outbox = Some(Outbox::start(self.sink.clone()));
        }
        debug!(
            target: "cell.actor.tower",
            tower_id = %self.tower_id,
            policy = self.policy.name(),
            pattern = self.antenna.pattern().as_str(),
            band_order = %self.bands.order(),
            publish_mode = %self.publish_mode,
            "TowerActor started"
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "cell.actor.tower",
                        tower_id = %self.tower_id,
                        "TowerActor received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.mailbox.record_depth(self.receiver.len());
                            self.handle_message(message).await;
                            self.mailbox.record_processed();
                            self.metrics.record_message_processed();
                        }
                        None => {
                            debug!(
                                target: "cell.actor.tower",
                                tower_id = %self.tower_id,
                                "TowerActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        if let Some(outbox) = self.outbox.take() {
            outbox.close(&self.tower_id).await;
        }

        self.metrics.tower_stopped();
        info!(
            target: "cell.actor.tower",
            tower_id = %self.tower_id,
            messages_processed = self.mailbox.messages_processed(),
            peak_mailbox_depth = self.mailbox.peak_depth(),
            connects = self.status.connects,
            fails = self.status.fails,
            drops = self.status.drops,
            "TowerActor stopped"
        );
    }

    /// Handle a single message.
    async fn handle_message(&mut self, message: TowerMessage) {
        match message {
            TowerMessage::Setup => self.handle_setup().await,

            TowerMessage::SignalReportRequest { x, y, reply_to } => {
                self.handle_signal_report_request(x, y, reply_to).await;
            }

            TowerMessage::Hello {
                record,
                caller,
                reconnect,
            } => self.handle_hello(record, caller, reconnect).await,

            TowerMessage::Disconnect { caller_id, record } => {
                self.handle_disconnect(&caller_id, record).await;
            }

            TowerMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(self.status());
            }

            TowerMessage::Raw { message_type, data } => {
                let err = TowerError::UnhandledMessage(message_type);
                self.status.unhandled += 1;
                obs::record_unhandled_message();
                warn!(
                    target: "cell.actor.tower",
                    tower_id = %self.tower_id,
                    error = %err,
                    data_len = data.len(),
                    "Unhandled message"
                );
            }
        }
    }

    /// Publish the one-time registration event to the initialization channel.
    async fn handle_setup(&mut self) {
        self.status.setups += 1;
        let event = RegistrationEvent {
            tower_id: &self.tower_id,
            antenna: self.antenna.descriptor(),
            minimum_receive_power: self.min_receive_power_dbm,
        };

        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    target: "cell.actor.tower",
                    tower_id = %self.tower_id,
                    error = %e,
                    "Failed to encode registration event"
                );
                return;
            }
        };

        info!(
            target: "cell.actor.tower",
            tower_id = %self.tower_id,
            "Setup complete"
        );
        let channel = self.init_channel.clone();
        self.publish(ChannelKind::Init, channel, payload).await;
    }

    /// Reply with a signal report only when the caller is in coverage.
    async fn handle_signal_report_request(&mut self, x: f64, y: f64, reply_to: CallerRef) {
        let distance = self.antenna.distance(x, y);
        let power = self.antenna.power(x, y);

        if power <= self.min_receive_power_dbm {
            self.status.reports_suppressed += 1;
            obs::record_signal_report(false);
            debug!(
                target: "cell.actor.tower",
                tower_id = %self.tower_id,
                caller_id = %reply_to.caller_id(),
                distance = distance,
                power = power,
                "Caller out of coverage, no report"
            );
            return;
        }

        let Some(tower) = self.self_handle() else {
            debug!(
                target: "cell.actor.tower",
                tower_id = %self.tower_id,
                "Tower has no live handles, skipping report"
            );
            return;
        };

        self.status.reports_sent += 1;
        obs::record_signal_report(true);
        self.reply(
            &reply_to,
            CallerMessage::SignalReport {
                distance,
                power,
                tower_id: self.tower_id.clone(),
                tower,
            },
        );
    }

    /// Admit, fail or silently drop a call attempt.
    async fn handle_hello(&mut self, record: SharedCallRecord, caller: CallerRef, reconnect: bool) {
        let Some((caller_id, load_signal)) = self.bind_record(&record) else {
            return;
        };

        let u = self.draws.next_unit();
        let fail_probability = self.policy.fail_probability(load_signal);

        match self.bands.classify(u, fail_probability) {
            AdmissionOutcome::Fail => {
                obs::record_admission_outcome(AdmissionOutcome::Fail.as_str());
                let Some(snapshot) = self.apply_transition(&record, CallState::Failed) else {
                    return;
                };
                self.status.fails += 1;
                info!(
                    target: "cell.actor.tower",
                    tower_id = %self.tower_id,
                    caller_id = %caller_id,
                    draw = u,
                    fail_probability = fail_probability,
                    "Failed call"
                );
                self.publish_cdr(&snapshot).await;
                self.reply(
                    &caller,
                    CallerMessage::Fail {
                        tower_id: self.tower_id.clone(),
                    },
                );
            }

            AdmissionOutcome::Connect => {
                // Connect hands the caller a tower reference; with no live
                // handle left the request is lost before the record moves.
                let Some(tower) = self.self_handle() else {
                    warn!(
                        target: "cell.actor.tower",
                        tower_id = %self.tower_id,
                        caller_id = %caller_id,
                        "Tower has no live handles, call not admitted"
                    );
                    self.drop_request(&caller_id, u);
                    return;
                };
                obs::record_admission_outcome(AdmissionOutcome::Connect.as_str());
                let Some(snapshot) = self.apply_transition(&record, CallState::Connected) else {
                    return;
                };
                self.status.connects += 1;
                info!(
                    target: "cell.actor.tower",
                    tower_id = %self.tower_id,
                    caller_id = %caller_id,
                    reconnect = reconnect,
                    "Start call"
                );
                self.reply(
                    &caller,
                    CallerMessage::Connect {
                        tower_id: self.tower_id.clone(),
                        tower,
                    },
                );
                self.publish_cdr(&snapshot).await;

                if reconnect {
                    if let Some(snapshot) = self.apply_transition(&record, CallState::Reconnected)
                    {
                        self.status.reconnects += 1;
                        self.publish_cdr(&snapshot).await;
                    }
                }
            }

            AdmissionOutcome::Drop => self.drop_request(&caller_id, u),
        }
    }

    /// No reply and no event: the caller sees a lost request.
    fn drop_request(&mut self, caller_id: &str, u: f64) {
        self.status.drops += 1;
        obs::record_admission_outcome(AdmissionOutcome::Drop.as_str());
        debug!(
            target: "cell.actor.tower",
            tower_id = %self.tower_id,
            caller_id = %caller_id,
            draw = u,
            "Dropped call request"
        );
    }

    /// End a call. No reply is sent.
    async fn handle_disconnect(&mut self, caller_id: &str, record: SharedCallRecord) {
        let record_caller = record.caller_id();
        if record_caller != caller_id {
            warn!(
                target: "cell.actor.tower",
                tower_id = %self.tower_id,
                caller_id = %caller_id,
                record_caller_id = %record_caller,
                "Disconnect caller does not match call record"
            );
        }

        let Some(snapshot) = self.apply_transition(&record, CallState::Disconnected) else {
            return;
        };
        self.status.disconnects += 1;
        info!(
            target: "cell.actor.tower",
            tower_id = %self.tower_id,
            caller_id = %caller_id,
            "Finished call"
        );
        self.publish_cdr(&snapshot).await;
    }

    /// Stamp this tower onto a live record and read its load signal.
    /// Terminal records are rejected.
    fn bind_record(&mut self, record: &SharedCallRecord) -> Option<(String, i64)> {
        let mut guard = record.lock();
        let state = guard.state();
        if state.is_terminal() {
            drop(guard);
            self.reject(state, CallState::Connected);
            return None;
        }
        guard.assign_tower(&self.tower_id);
        Some((guard.caller_id().to_string(), guard.load_signal()))
    }

    /// Apply a transition and return the resulting snapshot for publishing.
    fn apply_transition(
        &mut self,
        record: &SharedCallRecord,
        next: CallState,
    ) -> Option<CallRecord> {
        let mut guard = record.lock();
        let from = guard.state();
        if guard.transition(next).is_ok() {
            return Some(CallRecord::clone(&guard));
        }
        drop(guard);

        self.reject(from, next);
        None
    }

    fn reject(&mut self, from: CallState, to: CallState) {
        self.status.rejected_transitions += 1;
        obs::record_rejected_transition(to.as_str());
        warn!(
            target: "cell.actor.tower",
            tower_id = %self.tower_id,
            error = %TowerError::InvalidTransition { from, to },
            "Call record transition rejected"
        );
    }

    async fn publish_cdr(&mut self, snapshot: &CallRecord) {
        obs::record_cdr_event(snapshot.state().as_str());
        match snapshot.to_event_payload() {
            Ok(payload) => {
                debug!(
                    target: "cell.actor.tower",
                    tower_id = %self.tower_id,
                    state = %snapshot.state(),
                    "CDR sent"
                );
                let channel = self.cdr_channel.clone();
                self.publish(ChannelKind::Cdr, channel, payload).await;
            }
            Err(e) => {
                self.sink.record_failure();
                error!(
                    target: "cell.actor.tower",
                    tower_id = %self.tower_id,
                    error = %e,
                    "Failed to encode call record"
                );
            }
        }
    }

    /// Publish according to the configured mode. Errors are logged and
    /// counted, never returned.
    async fn publish(&mut self, kind: ChannelKind, channel: String, payload: String) {
        let publication = Publication {
            kind,
            channel,
            payload,
        };

        match &self.outbox {
            None => self.sink.deliver(publication).await,
            Some(outbox) => {
                if let Err(e) = outbox.push(publication).await {
                    self.sink.record_failure();
                    error!(
                        target: "cell.actor.tower",
                        tower_id = %self.tower_id,
                        error = %e,
                        "Event not queued for publishing"
                    );
                }
            }
        }
    }

    fn reply(&mut self, caller: &CallerRef, message: CallerMessage) {
        if let Err(e) = caller.tell(message) {
            self.status.replies_dropped += 1;
            obs::record_reply_dropped(e.kind());
            warn!(
                target: "cell.actor.tower",
                tower_id = %self.tower_id,
                caller_id = %caller.caller_id(),
                error = %e,
                "Reply not delivered"
            );
        }
    }

    /// The tower reference handed to callers.
    fn self_handle(&self) -> Option<TowerActorHandle> {
        self.self_sender.upgrade().map(|sender| TowerActorHandle {
            sender,
            cancel_token: self.cancel_token.clone(),
            tower_id: self.tower_id.clone(),
        })
    }

    fn status(&self) -> TowerStatus {
        TowerStatus {
            events_published: self.sink.published(),
            publish_failures: self.sink.failures(),
            messages_processed: self.mailbox.messages_processed(),
            ..self.status.clone()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::admission::ConstantPolicy;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl EventPublisher for Recorder {
        async fn publish(&self, channel: &str, payload: &str) -> Result<(), TowerError> {
            self.events
                .lock()
                .unwrap()
                .push((channel.to_string(), payload.to_string()));
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Fixed(f64);

    impl UniformDraw for Fixed {
        fn next_unit(&mut self) -> f64 {
            self.0
        }
    }

    fn settings(tower_id: &str) -> TowerSettings {
        TowerSettings {
            tower_id: tower_id.to_string(),
            antenna: Antenna::omni(0.0, 0.0).with_power(24.0, 1.0),
            policy: Arc::new(ConstantPolicy::new(0.1)),
            bands: AdmissionBands::default(),
            min_receive_power_dbm: DEFAULT_MIN_RECEIVE_POWER_DBM,
            publish_mode: PublishMode::Flush,
            channels: ChannelNames::default(),
        }
    }

    fn build(draw: f64) -> (TowerActor, TowerActorHandle, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let (actor, handle) = TowerActor::new(
            settings("7"),
            Arc::clone(&recorder) as Arc<dyn EventPublisher>,
            Box::new(Fixed(draw)),
            CancellationToken::new(),
            ActorMetrics::new(),
        );
        (actor, handle, recorder)
    }

    fn spawn(draw: f64) -> (TowerActorHandle, JoinHandle<()>, Arc<Recorder>) {
        let (actor, handle, recorder) = build(draw);
        (handle, tokio::spawn(actor.run()), recorder)
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_run_future_is_send() {
        let (actor, _handle, _recorder) = build(0.5);
        let run = actor.run();
        assert_send(&run);
    }

    #[tokio::test]
    async fn test_connect_without_live_handle_leaves_record_initiated() {
        let (actor, handle, recorder) = build(0.5);
        let (caller, mut inbox) = CallerRef::channel("caller-1", 8);
        let record = SharedCallRecord::new(CallRecord::new("caller-1", 10.0));

        // Queued before the last handle goes away, handled after
        handle.hello(record.clone(), caller, false).await.unwrap();
        drop(handle);
        tokio::time::timeout(Duration::from_secs(1), actor.run())
            .await
            .unwrap();

        assert_eq!(record.state(), CallState::Initiated);
        assert!(inbox.try_recv().is_err());
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tower_actor_spawn_and_cancel() {
        let (handle, task, _recorder) = spawn(0.5);
        assert_eq!(handle.tower_id(), "7");
        assert!(!handle.is_cancelled());

        handle.cancel();
        assert!(handle.is_cancelled());

        let result = tokio::time::timeout(Duration::from_secs(1), task).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_tower_actor_exits_when_handles_dropped() {
        let (handle, task, _recorder) = spawn(0.5);
        drop(handle);

        let result = tokio::time::timeout(Duration::from_secs(1), task).await;
        assert!(result.is_ok(), "actor should not keep its own mailbox open");
    }

    #[tokio::test]
    async fn test_connect_marks_record_and_replies() {
        let (handle, _task, recorder) = spawn(0.5);
        let (caller, mut inbox) = CallerRef::channel("caller-1", 8);
        let record = SharedCallRecord::new(CallRecord::new("caller-1", 10.0));

        handle.hello(record.clone(), caller, false).await.unwrap();
        let status = handle.status().await.unwrap();

        assert_eq!(status.connects, 1);
        assert_eq!(record.state(), CallState::Connected);
        assert_eq!(record.snapshot().tower_id(), Some("7"));
        assert!(matches!(
            inbox.try_recv().unwrap(),
            CallerMessage::Connect { ref tower_id, .. } if tower_id == "7"
        ));

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events.first().unwrap().0, "tower-7");
    }

    #[tokio::test]
    async fn test_raw_message_is_unhandled_and_actor_continues() {
        let (handle, _task, recorder) = spawn(0.5);

        handle
            .send(TowerMessage::Raw {
                message_type: "handoff".to_string(),
                data: bytes::Bytes::from_static(b"\x01\x02"),
            })
            .await
            .unwrap();
        handle.setup().await.unwrap();

        let status = handle.status().await.unwrap();
        assert_eq!(status.unhandled, 1);
        assert_eq!(status.setups, 1);
        assert_eq!(recorder.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_registration_event_shape() {
        let (handle, _task, recorder) = spawn(0.5);
        handle.setup().await.unwrap();
        handle.status().await.unwrap();

        let events = recorder.events.lock().unwrap();
        let (channel, payload) = events.first().unwrap();
        assert_eq!(channel, "init");

        let json: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(json["towerId"], "7");
        assert_eq!(json["x"], 0.0);
        assert_eq!(json["transmitPowerDbm"], 24.0);
        assert_eq!(json["pattern"]["kind"], "omni");
        assert_eq!(json["minimumReceivePower"], -55.0);
    }
}
