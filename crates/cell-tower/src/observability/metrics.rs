//! Metrics definitions for the cell tower simulation.
//!
//! All metrics follow Prometheus naming conventions:
//! - `cell_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded enums; tower ids are never used as labels:
//! - `state`: 5 values (call states)
//! - `outcome`: 3 values (fail, connect, drop)
//! - `result`: 2 values (sent, suppressed)
//! - `channel_kind`: 2 values (cdr, init)
//! - `reason`: 2 values (mailbox_full, mailbox_closed)

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Stream publish latency - internal service call, flush mode waits on it
        .set_buckets_for_metric(
            Matcher::Prefix("cell_publish".to_string()),
            &[
                0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set publish latency buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Call Lifecycle Metrics (Counters)
// ============================================================================

/// Record a call record transition that was published (or attempted).
///
/// Metric: `cell_cdr_events_total`
/// Labels: `state`
pub fn record_cdr_event(state: &'static str) {
    counter!("cell_cdr_events_total", "state" => state).increment(1);
}

/// Record the band a Hello draw landed in.
///
/// Metric: `cell_admission_outcomes_total`
/// Labels: `outcome`
pub fn record_admission_outcome(outcome: &'static str) {
    counter!("cell_admission_outcomes_total", "outcome" => outcome).increment(1);
}

/// Record whether a signal report was sent or suppressed (out of coverage).
///
/// Metric: `cell_signal_reports_total`
/// Labels: `result`
pub fn record_signal_report(sent: bool) {
    let result = if sent { "sent" } else { "suppressed" };
    counter!("cell_signal_reports_total", "result" => result).increment(1);
}

/// Record a message kind the tower does not understand.
///
/// Metric: `cell_unhandled_messages_total`
/// Labels: none
pub fn record_unhandled_message() {
    counter!("cell_unhandled_messages_total").increment(1);
}

/// Record a rejected call state transition.
///
/// Metric: `cell_rejected_transitions_total`
/// Labels: `to`
pub fn record_rejected_transition(to: &'static str) {
    counter!("cell_rejected_transitions_total", "to" => to).increment(1);
}

/// Record a caller reply that could not be queued.
///
/// Metric: `cell_replies_dropped_total`
/// Labels: `reason`
pub fn record_reply_dropped(reason: &'static str) {
    counter!("cell_replies_dropped_total", "reason" => reason).increment(1);
}

// ============================================================================
// Event Stream Metrics
// ============================================================================

/// Record event publish latency and outcome.
///
/// Metrics: `cell_publish_duration_seconds`, `cell_publish_errors_total`
/// Labels: `channel_kind`
///
/// In flush mode this latency is paid by the tower mailbox on every event.
pub fn record_publish(channel_kind: &'static str, duration: Duration, ok: bool) {
    histogram!("cell_publish_duration_seconds", "channel_kind" => channel_kind)
        .record(duration.as_secs_f64());
    if !ok {
        counter!("cell_publish_errors_total", "channel_kind" => channel_kind).increment(1);
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

    type Entry = (
        metrics_util::CompositeKey,
        Option<metrics::Unit>,
        Option<metrics::SharedString>,
        DebugValue,
    );

    fn capture(record: impl FnOnce()) -> Vec<Entry> {
        let recorder = DebuggingRecorder::new();
        let snapshotter: Snapshotter = recorder.snapshotter();
        metrics::with_local_recorder(&recorder, record);
        snapshotter.snapshot().into_vec()
    }

    fn find<'a>(
        snapshot: &'a [Entry],
        name: &str,
        label: Option<(&str, &str)>,
    ) -> Option<&'a DebugValue> {
        snapshot
            .iter()
            .find(|(key, _, _, _)| {
                key.key().name() == name
                    && label.map_or(true, |(k, v)| {
                        key.key().labels().any(|l| l.key() == k && l.value() == v)
                    })
            })
            .map(|(_, _, _, value)| value)
    }

    fn counter_value(
        snapshot: &[Entry],
        name: &str,
        label: Option<(&str, &str)>,
    ) -> Option<u64> {
        find(snapshot, name, label).map(|value| match value {
            DebugValue::Counter(c) => *c,
            _ => 0,
        })
    }

    #[test]
    fn test_counters_recorded_with_labels() {
        let snapshot = capture(|| {
            record_signal_report(true);
            record_signal_report(false);
            record_signal_report(false);
            record_unhandled_message();
            record_rejected_transition("DISCONNECTED");
            record_reply_dropped("mailbox_full");
        });

        assert_eq!(
            counter_value(&snapshot, "cell_signal_reports_total", Some(("result", "sent"))),
            Some(1)
        );
        assert_eq!(
            counter_value(&snapshot, "cell_signal_reports_total", Some(("result", "suppressed"))),
            Some(2)
        );
        assert_eq!(counter_value(&snapshot, "cell_unhandled_messages_total", None), Some(1));
        assert_eq!(
            counter_value(&snapshot, "cell_rejected_transitions_total", Some(("to", "DISCONNECTED"))),
            Some(1)
        );
        assert_eq!(
            counter_value(&snapshot, "cell_replies_dropped_total", Some(("reason", "mailbox_full"))),
            Some(1)
        );
    }

    #[test]
    fn test_call_lifecycle_counters_per_label() {
        let snapshot = capture(|| {
            for state in ["INITIATED", "CONNECTED", "RECONNECTED", "FAILED", "DISCONNECTED"] {
                record_cdr_event(state);
            }
            record_cdr_event("CONNECTED");
            record_admission_outcome("fail");
            record_admission_outcome("connect");
            record_admission_outcome("connect");
            record_admission_outcome("drop");
        });

        assert_eq!(
            counter_value(&snapshot, "cell_cdr_events_total", Some(("state", "CONNECTED"))),
            Some(2)
        );
        assert_eq!(
            counter_value(&snapshot, "cell_cdr_events_total", Some(("state", "FAILED"))),
            Some(1)
        );
        assert_eq!(
            counter_value(&snapshot, "cell_admission_outcomes_total", Some(("outcome", "connect"))),
            Some(2)
        );
        assert_eq!(
            counter_value(&snapshot, "cell_admission_outcomes_total", Some(("outcome", "drop"))),
            Some(1)
        );
    }

    #[test]
    fn test_publish_latency_and_errors() {
        let snapshot = capture(|| {
            record_publish("cdr", Duration::from_millis(2), true);
            record_publish("cdr", Duration::from_millis(4), true);
            record_publish("init", Duration::from_millis(3), false);
        });

        match find(&snapshot, "cell_publish_duration_seconds", Some(("channel_kind", "cdr"))) {
            Some(DebugValue::Histogram(samples)) => {
                assert_eq!(samples.len(), 2);
                assert!((samples[0].0 - 0.002).abs() < 1e-9);
            }
            other => panic!("expected cdr latency histogram, got {other:?}"),
        }
        assert_eq!(
            counter_value(&snapshot, "cell_publish_errors_total", Some(("channel_kind", "init"))),
            Some(1)
        );
        assert_eq!(
            counter_value(&snapshot, "cell_publish_errors_total", Some(("channel_kind", "cdr"))),
            None
        );
    }
}
