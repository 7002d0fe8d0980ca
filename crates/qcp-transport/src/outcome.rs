//! Structured delivery result.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

/// Result of one delivery attempt.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    /// Whether the assembler accepted the cell.
    pub success: bool,

    /// HTTP status code, when the transport has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Delivery id acknowledged by the assembler (WebSocket).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<String>,

    /// Response body returned by the assembler, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,

    /// Transport round-trip time.
    pub delivery_time: Duration,
}

impl DeliveryOutcome {
    /// Build a successful outcome.
    #[must_use]
    pub const fn success(delivery_time: Duration) -> Self {
        Self {
            success: true,
            status_code: None,
            error: None,
            delivery_id: None,
            response: None,
            delivery_time,
        }
    }

    /// Build a failed outcome.
    #[must_use]
    pub fn failure(error: impl Into<String>, delivery_time: Duration) -> Self {
        Self {
            success: false,
            status_code: None,
            error: Some(error.into()),
            delivery_id: None,
            response: None,
            delivery_time,
        }
    }

    /// Attach the transport status code.
    #[must_use]
    pub const fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Attach the acknowledged delivery id.
    #[must_use]
    pub fn with_delivery_id(mut self, delivery_id: impl Into<String>) -> Self {
        self.delivery_id = Some(delivery_id.into());
        self
    }

    /// Attach the assembler's response body.
    #[must_use]
    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    /// Delivery time in milliseconds.
    #[must_use]
    pub const fn delivery_time_ms(&self) -> u128 {
        self.delivery_time.as_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_outcome_has_no_error() {
        let outcome = DeliveryOutcome::success(Duration::from_millis(12)).with_status_code(200);
        assert!(outcome.success);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.status_code, Some(200));
        assert_eq!(outcome.delivery_time_ms(), 12);
    }

    #[test]
    fn failure_outcome_carries_error() {
        let outcome = DeliveryOutcome::failure("connection refused", Duration::from_millis(3));
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("connection refused"));
    }
}
