//! The distribution manager.
//!
//! Owns the queue, tracker, rate limiter, cache, and protocol registry, and
//! orchestrates each delivery from submission to a terminal status.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use qcp_cache::{CacheStats, DeliveryCache};
use qcp_core::{
    Cell, CellRepository, CellVerifier, DeliveryRequest, DeliveryStatus, DistributionError,
    DistributionResult, Utc,
};
use qcp_ratelimit::{AssemblerRateLimiter, RateLimiterStats};
use qcp_transport::{ProtocolRegistry, ProtocolStatsSnapshot};

use crate::{DeliveryQueue, DeliveryRecord, DeliveryTracker, DistributionConfig, QueuedDelivery};

/// Aggregate pipeline statistics.
#[derive(Debug, Serialize)]
pub struct DistributionStats {
    /// Deliveries waiting in the priority queue.
    pub queue_size: usize,
    /// Tracker counters.
    pub tracker: crate::TrackerStats,
    /// Rate limiter counters.
    pub rate_limiter: RateLimiterStats,
    /// Per-protocol transport counters.
    pub protocols: HashMap<String, ProtocolStatsSnapshot>,
    /// Cache counters, absent when caching is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

struct ManagerInner {
    repository: Arc<dyn CellRepository>,
    verifier: Arc<dyn CellVerifier>,
    queue: DeliveryQueue,
    tracker: DeliveryTracker,
    rate_limiter: AssemblerRateLimiter,
    cache: Option<DeliveryCache>,
    protocols: ProtocolRegistry,
}

/// Orchestrates cell deliveries end to end.
///
/// `submit` validates, rate-limits, enqueues, and registers a request, then
/// returns immediately; a background dispatch loop started by [`start`]
/// drains the queue and spawns one task per delivery. Everything after
/// submission is observed through [`get_status`] and [`stats`].
///
/// [`start`]: DistributionManager::start
/// [`get_status`]: DistributionManager::get_status
/// [`stats`]: DistributionManager::stats
pub struct DistributionManager {
    inner: Arc<ManagerInner>,
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
}

impl DistributionManager {
    /// Create a manager with the built-in HTTP and WebSocket transports.
    ///
    /// # Errors
    /// Returns an error if the HTTP transport client cannot be constructed.
    pub fn new(
        repository: Arc<dyn CellRepository>,
        verifier: Arc<dyn CellVerifier>,
        config: DistributionConfig,
    ) -> DistributionResult<Self> {
        let protocols =
            ProtocolRegistry::with_defaults(config.http.clone(), config.websocket.clone())
                .map_err(|e| DistributionError::Transport {
                    message: e.to_string(),
                })?;
        Ok(Self::with_registry(repository, verifier, config, protocols))
    }

    /// Create a manager with a caller-assembled protocol registry.
    #[must_use]
    pub fn with_registry(
        repository: Arc<dyn CellRepository>,
        verifier: Arc<dyn CellVerifier>,
        config: DistributionConfig,
        protocols: ProtocolRegistry,
    ) -> Self {
        let cache = config
            .enable_cache
            .then(|| DeliveryCache::new(config.cache.clone()));
        info!(
            cache_enabled = cache.is_some(),
            protocols = ?protocols.names(),
            "distribution manager initialized"
        );
        Self {
            inner: Arc::new(ManagerInner {
                repository,
                verifier,
                queue: DeliveryQueue::new(),
                tracker: DeliveryTracker::new(config.max_history_size),
                rate_limiter: AssemblerRateLimiter::new(config.rate_limit.clone()),
                cache,
                protocols,
            }),
            dispatch_task: Mutex::new(None),
        }
    }

    /// Start the background dispatch loop.
    ///
    /// Idempotent: a second call while the loop is running does nothing.
    pub fn start(&self) {
        let mut task = self.dispatch_task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(async move {
            info!("dispatch loop started");
            loop {
                let entry = inner.queue.pop().await;

                // A request cancelled while queued is skipped, not delivered.
                let still_queued = inner
                    .tracker
                    .get_status(&entry.request_id)
                    .is_some_and(|record| record.status == DeliveryStatus::Queued);
                if !still_queued {
                    debug!(
                        request_id = %entry.request_id,
                        "skipping dequeued request that is no longer queued"
                    );
                    continue;
                }

                inner.tracker.update_status(
                    &entry.request_id,
                    DeliveryStatus::InProgress,
                    "Processing delivery request",
                    None,
                );
                let task_inner = Arc::clone(&inner);
                tokio::spawn(async move {
                    task_inner.deliver(entry.request_id, entry.request).await;
                });
            }
        }));
    }

    /// Stop the dispatch loop.
    ///
    /// Queued requests stay queued; in-flight delivery tasks run to their
    /// terminal status.
    pub fn stop(&self) {
        if let Some(handle) = self.dispatch_task.lock().take() {
            handle.abort();
            info!("dispatch loop stopped");
        }
    }

    /// Whether the dispatch loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.dispatch_task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Submit a delivery request.
    ///
    /// Stamps a request id and submission timestamp, then enqueues the
    /// request and begins tracking it in `QUEUED` status. Returns the
    /// request id for later status lookups.
    ///
    /// # Errors
    /// Returns `Validation` if the request names no assembler or neither a
    /// cell id nor a capability, and `RateLimited` if the assembler is over
    /// a configured ceiling. Nothing is enqueued or tracked on error.
    pub fn submit(&self, mut request: DeliveryRequest) -> DistributionResult<String> {
        if request.assembler_id.is_empty() {
            return Err(DistributionError::validation("assembler_id is required"));
        }
        if request.cell_id.is_none() && request.capability.is_none() {
            return Err(DistributionError::validation(
                "either cell_id or capability is required",
            ));
        }
        if !self.inner.rate_limiter.allow(&request.assembler_id) {
            return Err(DistributionError::RateLimited {
                assembler_id: request.assembler_id,
            });
        }

        let request_id = request
            .request_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        request.request_id = Some(request_id.clone());
        request.timestamp = Some(Utc::now());

        info!(
            request_id = %request_id,
            assembler_id = %request.assembler_id,
            protocol = %request.protocol,
            priority = request.priority,
            "delivery request accepted"
        );

        self.inner.tracker.start_tracking(&request_id, &request);
        self.inner.queue.push(QueuedDelivery {
            priority: request.priority,
            request_id: request_id.clone(),
            request,
        });
        Ok(request_id)
    }

    /// Cancel a delivery that has not reached a terminal status.
    ///
    /// Returns whether the cancellation was recorded. Cancelling a delivery
    /// whose transport send is already in flight races with completion; the
    /// first terminal transition wins.
    pub fn cancel(&self, request_id: &str) -> bool {
        let Some(record) = self.inner.tracker.get_status(request_id) else {
            return false;
        };
        if !record.status.is_cancellable() {
            return false;
        }
        self.inner.tracker.update_status(
            request_id,
            DeliveryStatus::Cancelled,
            "Delivery cancelled by request",
            None,
        );
        true
    }

    /// Snapshot the tracking record for a request.
    #[must_use]
    pub fn get_status(&self, request_id: &str) -> Option<DeliveryRecord> {
        self.inner.tracker.get_status(request_id)
    }

    /// Snapshot statistics across every pipeline component.
    #[must_use]
    pub fn stats(&self) -> DistributionStats {
        DistributionStats {
            queue_size: self.inner.queue.len(),
            tracker: self.inner.tracker.stats(),
            rate_limiter: self.inner.rate_limiter.stats(),
            protocols: self.inner.protocols.stats(),
            cache: self.inner.cache.as_ref().map(DeliveryCache::stats),
        }
    }
}

impl Drop for DistributionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.dispatch_task.lock().take() {
            handle.abort();
        }
    }
}

impl ManagerInner {
    async fn deliver(&self, request_id: String, request: DeliveryRequest) {
        if let Err(error) = self.try_deliver(&request_id, &request).await {
            warn!(request_id = %request_id, %error, "delivery failed");
            self.tracker.update_status(
                &request_id,
                DeliveryStatus::Failed,
                error.to_string(),
                Some(json!({
                    "error": error.to_string(),
                    "error_type": error.kind(),
                })),
            );
        }
    }

    async fn try_deliver(
        &self,
        request_id: &str,
        request: &DeliveryRequest,
    ) -> DistributionResult<()> {
        let (cell, cached) = self.resolve_cell(request).await?;

        let handler = self.protocols.get(&request.protocol).ok_or_else(|| {
            DistributionError::UnsupportedProtocol {
                protocol: request.protocol.clone(),
            }
        })?;

        self.tracker.update_status(
            request_id,
            DeliveryStatus::InProgress,
            format!("Delivering cell using {} protocol", request.protocol),
            Some(json!({
                "cell_id": cell.id,
                "protocol": request.protocol,
                "cached": cached,
            })),
        );

        let outcome = handler
            .deliver(
                &cell,
                &request.assembler_id,
                &request.quantum_signature,
                &request.options,
            )
            .await;

        if !outcome.success {
            return Err(DistributionError::Transport {
                message: outcome
                    .error
                    .unwrap_or_else(|| "delivery failed".to_string()),
            });
        }

        self.tracker.update_status(
            request_id,
            DeliveryStatus::Completed,
            "Cell delivered successfully",
            Some(json!({
                "cell_id": cell.id,
                "protocol": request.protocol,
                "delivery_time_ms": outcome.delivery_time_ms(),
                "cached": cached,
            })),
        );
        Ok(())
    }

    /// Resolve the cell for a request, consulting the cache first for
    /// directly-addressed cells. Freshly resolved cells are verified and
    /// then cached; cached cells skip re-verification.
    async fn resolve_cell(&self, request: &DeliveryRequest) -> DistributionResult<(Cell, bool)> {
        if let (Some(cache), Some(cell_id)) = (self.cache.as_ref(), request.cell_id.as_deref()) {
            if let Some(cell) = cache.get(cell_id) {
                debug!(cell_id, "resolved cell from cache");
                return Ok((cell, true));
            }
        }

        let cell = if let Some(cell_id) = request.cell_id.as_deref() {
            self.repository.get_cell(cell_id).await?
        } else if let Some(capability) = request.capability.as_deref() {
            self.repository
                .find_cell_for_capability(
                    capability,
                    request.version.as_deref(),
                    request.constraints.as_ref(),
                )
                .await?
        } else {
            return Err(DistributionError::validation(
                "either cell_id or capability is required",
            ));
        };

        self.verifier
            .verify_cell(&cell, &request.quantum_signature)
            .await?;

        if let Some(cache) = self.cache.as_ref() {
            cache.add(&cell.id, cell.clone());
        }
        Ok((cell, false))
    }
}
