//! Delivery request and options value objects.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default delivery priority (lower is served first).
pub const DEFAULT_PRIORITY: i32 = 5;

/// One queued intent to deliver a cell (or capability match) to an assembler.
///
/// Requests are created by the caller, immutable once enqueued, and consumed
/// exactly once by one delivery task. At least one of `cell_id` and
/// `capability` must be set; the selection criteria (`capability`, `version`,
/// `constraints`) are only consulted when `cell_id` is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRequest {
    /// Unique request id; generated at submission when absent.
    #[serde(default)]
    pub request_id: Option<String>,

    /// Requester identity; rate limiting and addressing key.
    pub assembler_id: String,

    /// Specific cell to deliver.
    #[serde(default)]
    pub cell_id: Option<String>,

    /// Capability to resolve when `cell_id` is absent.
    #[serde(default)]
    pub capability: Option<String>,

    /// Version selector for capability resolution.
    #[serde(default)]
    pub version: Option<String>,

    /// Additional constraints for capability resolution.
    #[serde(default)]
    pub constraints: Option<Map<String, Value>>,

    /// Transport protocol name.
    #[serde(default = "DeliveryRequest::default_protocol")]
    pub protocol: String,

    /// Opaque verification token, threaded through to the transport headers.
    #[serde(default)]
    pub quantum_signature: String,

    /// Priority; lower values are served first.
    #[serde(default = "DeliveryRequest::default_priority")]
    pub priority: i32,

    /// Per-delivery transport options.
    #[serde(default)]
    pub options: DeliveryOptions,

    /// Set at ingestion time by the distribution manager.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl DeliveryRequest {
    fn default_protocol() -> String {
        "http".to_string()
    }

    const fn default_priority() -> i32 {
        DEFAULT_PRIORITY
    }

    /// Create a request for a specific cell.
    #[must_use]
    pub fn for_cell(assembler_id: impl Into<String>, cell_id: impl Into<String>) -> Self {
        Self {
            request_id: None,
            assembler_id: assembler_id.into(),
            cell_id: Some(cell_id.into()),
            capability: None,
            version: None,
            constraints: None,
            protocol: Self::default_protocol(),
            quantum_signature: String::new(),
            priority: DEFAULT_PRIORITY,
            options: DeliveryOptions::default(),
            timestamp: None,
        }
    }

    /// Create a request resolved by capability.
    #[must_use]
    pub fn for_capability(assembler_id: impl Into<String>, capability: impl Into<String>) -> Self {
        Self {
            request_id: None,
            assembler_id: assembler_id.into(),
            cell_id: None,
            capability: Some(capability.into()),
            version: None,
            constraints: None,
            protocol: Self::default_protocol(),
            quantum_signature: String::new(),
            priority: DEFAULT_PRIORITY,
            options: DeliveryOptions::default(),
            timestamp: None,
        }
    }

    /// Set an explicit request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Set the transport protocol.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Set the quantum signature.
    #[must_use]
    pub fn with_quantum_signature(mut self, signature: impl Into<String>) -> Self {
        self.quantum_signature = signature.into();
        self
    }

    /// Set the priority (lower is served first).
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set a version selector for capability resolution.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set per-delivery transport options.
    #[must_use]
    pub fn with_options(mut self, options: DeliveryOptions) -> Self {
        self.options = options;
        self
    }
}

/// Per-delivery transport options.
///
/// The well-known fields are typed; anything else the caller supplies is
/// preserved in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryOptions {
    /// Explicit endpoint override for the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Custom headers merged into the transport request.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// Caller-supplied delivery id (WebSocket ack correlation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<String>,

    /// Free-form passthrough fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeliveryOptions {
    /// Create empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint override.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Add a custom header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the delivery id.
    #[must_use]
    pub fn with_delivery_id(mut self, delivery_id: impl Into<String>) -> Self {
        self.delivery_id = Some(delivery_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_cell_defaults() {
        let request = DeliveryRequest::for_cell("a1", "c1");
        assert_eq!(request.assembler_id, "a1");
        assert_eq!(request.cell_id.as_deref(), Some("c1"));
        assert_eq!(request.protocol, "http");
        assert_eq!(request.priority, DEFAULT_PRIORITY);
        assert!(request.request_id.is_none());
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let request: DeliveryRequest =
            serde_json::from_str(r#"{"assembler_id": "a1", "cell_id": "c1"}"#).unwrap();
        assert_eq!(request.protocol, "http");
        assert_eq!(request.priority, DEFAULT_PRIORITY);
        assert!(request.options.endpoint.is_none());
    }

    #[test]
    fn options_preserve_extra_fields() {
        let options: DeliveryOptions = serde_json::from_str(
            r#"{"endpoint": "https://a.example/api", "compression": "zstd"}"#,
        )
        .unwrap();
        assert_eq!(options.endpoint.as_deref(), Some("https://a.example/api"));
        assert_eq!(options.extra["compression"], "zstd");
    }
}
