//! Shared delivery statistics.
//!
//! All protocol handlers record through this one routine so per-protocol
//! stats stay comparable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Atomic delivery counters for one protocol handler.
#[derive(Debug, Default)]
pub struct ProtocolStats {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    total_delivery_ms: AtomicU64,
}

impl ProtocolStats {
    /// Create zeroed stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one delivery attempt.
    pub fn record(&self, delivery_time: Duration, success: bool) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        let millis = u64::try_from(delivery_time.as_millis()).unwrap_or(u64::MAX);
        self.total_delivery_ms.fetch_add(millis, Ordering::Relaxed);
    }

    /// Snapshot current counters.
    #[must_use]
    pub fn snapshot(&self) -> ProtocolStatsSnapshot {
        let successes = self.successes.load(Ordering::Relaxed);
        let total_ms = self.total_delivery_ms.load(Ordering::Relaxed);
        // Cumulative time counts every attempt; the mean is per success.
        let average_delivery_time_ms = if successes > 0 {
            #[allow(clippy::cast_precision_loss)]
            {
                total_ms as f64 / successes as f64
            }
        } else {
            0.0
        };
        ProtocolStatsSnapshot {
            delivery_attempts: self.attempts.load(Ordering::Relaxed),
            successful_deliveries: successes,
            failed_deliveries: self.failures.load(Ordering::Relaxed),
            total_delivery_time_ms: total_ms,
            average_delivery_time_ms,
        }
    }
}

/// Point-in-time view of a handler's counters.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ProtocolStatsSnapshot {
    /// Deliveries attempted.
    pub delivery_attempts: u64,
    /// Deliveries acknowledged by the assembler.
    pub successful_deliveries: u64,
    /// Deliveries that failed.
    pub failed_deliveries: u64,
    /// Cumulative delivery time across all attempts.
    pub total_delivery_time_ms: u64,
    /// Average delivery time per successful delivery.
    pub average_delivery_time_ms: f64,
}
