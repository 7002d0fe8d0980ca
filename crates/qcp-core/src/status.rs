//! Delivery lifecycle status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a delivery request.
///
/// Transitions: `Queued -> InProgress -> {Completed | Failed | Cancelled}`.
/// `Queued` and `InProgress` are the only cancellable states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    /// Accepted and waiting in the priority queue.
    Queued,
    /// Dequeued; resolution/verification/transport in flight.
    InProgress,
    /// Delivered successfully.
    Completed,
    /// Terminal failure (not-found, verification, protocol, transport).
    Failed,
    /// Cancelled before a terminal transition.
    Cancelled,
}

impl DeliveryStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether a request in this status may still be cancelled.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Queued | Self::InProgress)
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "QUEUED"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}
