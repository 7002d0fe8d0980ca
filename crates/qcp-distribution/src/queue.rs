//! Priority delivery queue.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use parking_lot::Mutex;
use tokio::sync::Notify;

use qcp_core::DeliveryRequest;

/// One queued delivery, ordered by `(priority, request_id)`.
///
/// Lower priority values are served first; the request id breaks ties so
/// ordering is total and the request payload never participates in
/// comparison.
#[derive(Debug)]
pub struct QueuedDelivery {
    /// Scheduling priority (lower is served first).
    pub priority: i32,
    /// Request id assigned at submission.
    pub request_id: String,
    /// The request itself.
    pub request: DeliveryRequest,
}

impl PartialEq for QueuedDelivery {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.request_id == other.request_id
    }
}

impl Eq for QueuedDelivery {}

impl PartialOrd for QueuedDelivery {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedDelivery {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.request_id.cmp(&other.request_id))
    }
}

/// Mutex-guarded min-heap with async hand-off to the dispatch loop.
#[derive(Default)]
pub struct DeliveryQueue {
    heap: Mutex<BinaryHeap<Reverse<QueuedDelivery>>>,
    notify: Notify,
}

impl DeliveryQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a delivery and wake the dispatch loop.
    pub fn push(&self, entry: QueuedDelivery) {
        self.heap.lock().push(Reverse(entry));
        self.notify.notify_one();
    }

    /// Dequeue the highest-priority delivery, if any.
    #[must_use]
    pub fn try_pop(&self) -> Option<QueuedDelivery> {
        self.heap.lock().pop().map(|Reverse(entry)| entry)
    }

    /// Dequeue the highest-priority delivery, waiting for one to arrive.
    pub async fn pop(&self) -> QueuedDelivery {
        loop {
            // Register for wakeup before checking, so a push between the
            // check and the await is not lost.
            let notified = self.notify.notified();
            if let Some(entry) = self.try_pop() {
                return entry;
            }
            notified.await;
        }
    }

    /// Number of queued deliveries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.lock().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.lock().is_empty()
    }
}
