//! Delivery lifecycle tracking.
//!
//! Records every delivery from submission to its terminal state, with a full
//! status history per request. Active and finished deliveries live in
//! separate partitions; finished records are pruned oldest-first past a
//! configurable retention bound.

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use qcp_core::{DeliveryRequest, DeliveryStatus};

/// One status transition in a delivery's history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    /// When the transition was recorded.
    pub timestamp: DateTime<Utc>,
    /// Status entered.
    pub status: DeliveryStatus,
    /// Human-readable transition message.
    pub message: String,
    /// Structured transition details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Full tracking record for one delivery request.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryRecord {
    /// Request id this record tracks.
    pub request_id: String,
    /// Destination assembler.
    pub assembler_id: String,
    /// Requested cell id, when addressed directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_id: Option<String>,
    /// Requested capability, when resolved by capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,
    /// Transport protocol name.
    pub protocol: String,
    /// Current status.
    pub status: DeliveryStatus,
    /// When tracking started.
    pub start_time: DateTime<Utc>,
    /// When the last transition was recorded.
    pub last_updated: DateTime<Utc>,
    /// When a terminal status was entered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
    /// Wall-clock milliseconds from start to terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Every transition recorded so far, in order.
    pub history: Vec<HistoryEntry>,

    // Monotonic twin of start_time, used for duration_ms.
    #[serde(skip)]
    started: Instant,
}

#[derive(Default)]
struct TrackerState {
    active: HashMap<String, DeliveryRecord>,
    finished: HashMap<String, DeliveryRecord>,
    total_requests: u64,
    completed_count: u64,
    failed_count: u64,
    cancelled_count: u64,
    avg_completion_time_ms: f64,
}

/// Tracker statistics snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TrackerStats {
    /// Deliveries ever tracked.
    pub total_requests: u64,
    /// Deliveries not yet terminal.
    pub active_count: usize,
    /// Deliveries that reached `COMPLETED`.
    pub completed_count: u64,
    /// Deliveries that reached `FAILED`.
    pub failed_count: u64,
    /// Deliveries that reached `CANCELLED`.
    pub cancelled_count: u64,
    /// Running mean duration of completed deliveries, in milliseconds.
    pub avg_completion_time_ms: f64,
}

/// Status and history bookkeeping for every delivery.
///
/// Unknown request ids and transitions on already-terminal records are
/// logged and ignored rather than treated as errors; racing writers (a
/// cancel against an in-flight delivery) resolve to whichever terminal
/// transition lands first.
pub struct DeliveryTracker {
    max_history_size: usize,
    state: Mutex<TrackerState>,
}

impl DeliveryTracker {
    /// Create a tracker retaining at most `max_history_size` finished
    /// records.
    #[must_use]
    pub fn new(max_history_size: usize) -> Self {
        Self {
            max_history_size,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Begin tracking a request in `QUEUED` status.
    ///
    /// A request id that is already tracked is logged and ignored.
    pub fn start_tracking(&self, request_id: &str, request: &DeliveryRequest) {
        let mut state = self.state.lock();
        if state.active.contains_key(request_id) || state.finished.contains_key(request_id) {
            warn!(request_id, "delivery is already tracked");
            return;
        }

        let now = Utc::now();
        let record = DeliveryRecord {
            request_id: request_id.to_string(),
            assembler_id: request.assembler_id.clone(),
            cell_id: request.cell_id.clone(),
            capability: request.capability.clone(),
            protocol: request.protocol.clone(),
            status: DeliveryStatus::Queued,
            start_time: now,
            last_updated: now,
            completion_time: None,
            duration_ms: None,
            history: vec![HistoryEntry {
                timestamp: now,
                status: DeliveryStatus::Queued,
                message: "Delivery request queued".to_string(),
                details: None,
            }],
            started: Instant::now(),
        };

        state.total_requests += 1;
        state.active.insert(request_id.to_string(), record);
        debug!(request_id, "started tracking delivery");
    }

    /// Record a status transition.
    ///
    /// Unknown request ids and transitions on records that already reached a
    /// terminal status are logged and ignored. A terminal transition stamps
    /// the completion time and duration, updates the aggregate counters, and
    /// moves the record to the finished partition.
    pub fn update_status(
        &self,
        request_id: &str,
        status: DeliveryStatus,
        message: impl Into<String>,
        details: Option<Value>,
    ) {
        let mut state = self.state.lock();
        let Some(mut record) = state.active.remove(request_id) else {
            warn!(request_id, %status, "status update for unknown or finished delivery");
            return;
        };

        let now = Utc::now();
        record.status = status;
        record.last_updated = now;
        record.history.push(HistoryEntry {
            timestamp: now,
            status,
            message: message.into(),
            details,
        });

        if !status.is_terminal() {
            state.active.insert(request_id.to_string(), record);
            return;
        }

        record.completion_time = Some(now);
        let duration_ms = u64::try_from(record.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        record.duration_ms = Some(duration_ms);

        match status {
            DeliveryStatus::Completed => {
                state.completed_count += 1;
                #[allow(clippy::cast_precision_loss)]
                let count = state.completed_count as f64;
                #[allow(clippy::cast_precision_loss)]
                let sample = duration_ms as f64;
                state.avg_completion_time_ms +=
                    (sample - state.avg_completion_time_ms) / count;
            }
            DeliveryStatus::Failed => state.failed_count += 1,
            DeliveryStatus::Cancelled => state.cancelled_count += 1,
            DeliveryStatus::Queued | DeliveryStatus::InProgress => {}
        }

        debug!(request_id, %status, duration_ms, "delivery reached terminal status");
        state.finished.insert(request_id.to_string(), record);
        Self::prune_finished(&mut state, self.max_history_size);
    }

    /// Snapshot the record for a request, searching active then finished
    /// deliveries.
    #[must_use]
    pub fn get_status(&self, request_id: &str) -> Option<DeliveryRecord> {
        let state = self.state.lock();
        state
            .active
            .get(request_id)
            .or_else(|| state.finished.get(request_id))
            .cloned()
    }

    /// Snapshot tracker statistics.
    #[must_use]
    pub fn stats(&self) -> TrackerStats {
        let state = self.state.lock();
        TrackerStats {
            total_requests: state.total_requests,
            active_count: state.active.len(),
            completed_count: state.completed_count,
            failed_count: state.failed_count,
            cancelled_count: state.cancelled_count,
            avg_completion_time_ms: state.avg_completion_time_ms,
        }
    }

    fn prune_finished(state: &mut TrackerState, max_history_size: usize) {
        while state.finished.len() > max_history_size {
            let Some(oldest) = state
                .finished
                .values()
                .min_by_key(|record| record.completion_time)
                .map(|record| record.request_id.clone())
            else {
                break;
            };
            state.finished.remove(&oldest);
            debug!(request_id = %oldest, "pruned finished delivery record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;

    fn tracker() -> DeliveryTracker {
        DeliveryTracker::new(100)
    }

    fn request(assembler_id: &str) -> DeliveryRequest {
        DeliveryRequest::for_cell(assembler_id, "c1")
    }

    #[test]
    fn tracking_starts_queued_with_history() {
        let tracker = tracker();
        tracker.start_tracking("r1", &request("a1"));

        let record = tracker.get_status("r1").unwrap();
        assert_eq!(record.status, DeliveryStatus::Queued);
        assert_eq!(record.assembler_id, "a1");
        assert_eq!(record.history.len(), 1);
        assert_eq!(tracker.stats().active_count, 1);
    }

    #[test]
    fn duplicate_start_is_ignored() {
        let tracker = tracker();
        tracker.start_tracking("r1", &request("a1"));
        tracker.start_tracking("r1", &request("a2"));

        assert_eq!(tracker.get_status("r1").unwrap().assembler_id, "a1");
        assert_eq!(tracker.stats().total_requests, 1);
    }

    #[test]
    fn unknown_update_is_ignored() {
        let tracker = tracker();
        tracker.update_status("ghost", DeliveryStatus::Completed, "done", None);
        assert!(tracker.get_status("ghost").is_none());
        assert_eq!(tracker.stats().completed_count, 0);
    }

    #[test]
    fn terminal_transition_moves_record_and_counts() {
        let tracker = tracker();
        tracker.start_tracking("r1", &request("a1"));
        tracker.update_status("r1", DeliveryStatus::InProgress, "picked up", None);
        tracker.update_status(
            "r1",
            DeliveryStatus::Completed,
            "delivered",
            Some(json!({"delivery_time_ms": 12})),
        );

        let record = tracker.get_status("r1").unwrap();
        assert_eq!(record.status, DeliveryStatus::Completed);
        assert!(record.completion_time.is_some());
        assert!(record.duration_ms.is_some());
        assert_eq!(record.history.len(), 3);

        let stats = tracker.stats();
        assert_eq!(stats.active_count, 0);
        assert_eq!(stats.completed_count, 1);
    }

    #[test]
    fn first_terminal_transition_wins() {
        let tracker = tracker();
        tracker.start_tracking("r1", &request("a1"));
        tracker.update_status("r1", DeliveryStatus::Cancelled, "cancelled", None);
        tracker.update_status("r1", DeliveryStatus::Completed, "delivered", None);

        assert_eq!(
            tracker.get_status("r1").unwrap().status,
            DeliveryStatus::Cancelled
        );
        let stats = tracker.stats();
        assert_eq!(stats.cancelled_count, 1);
        assert_eq!(stats.completed_count, 0);
    }

    #[test]
    fn avg_completion_time_is_running_mean() {
        let tracker = tracker();
        tracker.start_tracking("r1", &request("a1"));
        std::thread::sleep(Duration::from_millis(40));
        tracker.update_status("r1", DeliveryStatus::Completed, "delivered", None);

        tracker.start_tracking("r2", &request("a1"));
        std::thread::sleep(Duration::from_millis(120));
        tracker.update_status("r2", DeliveryStatus::Completed, "delivered", None);

        // Mean of roughly 40ms and 120ms, with scheduler slack.
        let avg = tracker.stats().avg_completion_time_ms;
        assert!(avg >= 80.0, "avg {avg} below expected band");
        assert!(avg <= 200.0, "avg {avg} above expected band");
    }

    #[test]
    fn failed_deliveries_do_not_skew_avg() {
        let tracker = tracker();
        tracker.start_tracking("r1", &request("a1"));
        std::thread::sleep(Duration::from_millis(50));
        tracker.update_status("r1", DeliveryStatus::Failed, "boom", None);

        let stats = tracker.stats();
        assert_eq!(stats.failed_count, 1);
        assert!((stats.avg_completion_time_ms - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn finished_records_are_pruned_oldest_first() {
        let tracker = DeliveryTracker::new(2);
        for id in ["r1", "r2", "r3"] {
            tracker.start_tracking(id, &request("a1"));
            tracker.update_status(id, DeliveryStatus::Completed, "delivered", None);
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(tracker.get_status("r1").is_none());
        assert!(tracker.get_status("r2").is_some());
        assert!(tracker.get_status("r3").is_some());
        // Counters survive pruning.
        assert_eq!(tracker.stats().completed_count, 3);
    }
}
