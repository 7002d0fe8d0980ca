//! HTTP delivery handler.
//!
//! POSTs the JSON-serialized cell to the assembler's delivery endpoint and
//! treats 200/201/202 as acceptance.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use qcp_core::{Cell, DeliveryOptions};

use crate::{DeliveryOutcome, ProtocolHandler, ProtocolStats, ProtocolStatsSnapshot, TransportError};

/// Header carrying the target assembler id.
pub const HEADER_ASSEMBLER_ID: &str = "X-QCC-Assembler-ID";
/// Header carrying the provider id.
pub const HEADER_PROVIDER_ID: &str = "X-QCC-Provider-ID";
/// Header carrying the quantum signature.
pub const HEADER_QUANTUM_SIGNATURE: &str = "X-QCC-Quantum-Signature";

const QCC_USER_AGENT: &str = "QCC-Provider/1.0";

/// Configuration for the HTTP handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Provider id sent in delivery headers.
    pub provider_id: String,

    /// Overall request timeout.
    pub timeout: Duration,

    /// Skip TLS certificate verification (insecure; test environments only).
    pub danger_accept_invalid_certs: bool,
}

impl HttpConfig {
    /// Set the provider id.
    #[must_use]
    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = provider_id.into();
        self
    }

    /// Set the overall request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disable TLS certificate verification.
    #[must_use]
    pub const fn with_danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.danger_accept_invalid_certs = accept;
        self
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            provider_id: "default-provider".to_string(),
            timeout: Duration::from_secs(60),
            danger_accept_invalid_certs: false,
        }
    }
}

/// Delivers cells over HTTP/HTTPS.
pub struct HttpHandler {
    config: HttpConfig,
    client: reqwest::Client,
    stats: ProtocolStats,
}

impl HttpHandler {
    /// Create a new HTTP handler.
    ///
    /// # Errors
    /// Returns [`TransportError::ClientBuild`] if the underlying client
    /// cannot be constructed.
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        if config.danger_accept_invalid_certs {
            warn!("TLS certificate verification is disabled for the HTTP handler");
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.danger_accept_invalid_certs)
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;
        Ok(Self {
            config,
            client,
            stats: ProtocolStats::new(),
        })
    }

    /// Resolve the delivery endpoint for an assembler.
    ///
    /// An explicit `options.endpoint` wins; otherwise the conventional
    /// per-assembler URL is derived from the assembler id.
    #[must_use]
    pub fn resolve_endpoint(assembler_id: &str, options: &DeliveryOptions) -> String {
        options.endpoint.clone().unwrap_or_else(|| {
            format!("https://assembler-{assembler_id}.cellcomputing.ai/api/v1/cells")
        })
    }
}

#[async_trait]
impl ProtocolHandler for HttpHandler {
    fn name(&self) -> &str {
        "http"
    }

    async fn deliver(
        &self,
        cell: &Cell,
        assembler_id: &str,
        quantum_signature: &str,
        options: &DeliveryOptions,
    ) -> DeliveryOutcome {
        let endpoint = Self::resolve_endpoint(assembler_id, options);
        debug!(assembler_id, %endpoint, cell_id = %cell.id, "delivering cell over http");

        let mut request = self
            .client
            .post(&endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, QCC_USER_AGENT)
            .header(HEADER_ASSEMBLER_ID, assembler_id)
            .header(HEADER_PROVIDER_ID, &self.config.provider_id)
            .header(HEADER_QUANTUM_SIGNATURE, quantum_signature)
            .json(cell);
        for (key, value) in &options.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let start = Instant::now();
        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let elapsed = start.elapsed();
                let body: Option<Value> = response.json().await.ok();
                let success = matches!(status, 200 | 201 | 202);
                self.stats.record(elapsed, success);

                if success {
                    let mut outcome =
                        DeliveryOutcome::success(elapsed).with_status_code(status);
                    if let Some(body) = body {
                        outcome = outcome.with_response(body);
                    }
                    outcome
                } else {
                    warn!(assembler_id, status, "http delivery rejected");
                    let mut outcome = DeliveryOutcome::failure(
                        format!("HTTP delivery failed with status {status}"),
                        elapsed,
                    )
                    .with_status_code(status);
                    if let Some(body) = body {
                        outcome = outcome.with_response(body);
                    }
                    outcome
                }
            }
            Err(e) => {
                let elapsed = start.elapsed();
                self.stats.record(elapsed, false);
                error!(assembler_id, error = %e, "http delivery error");
                DeliveryOutcome::failure(format!("HTTP client error: {e}"), elapsed)
            }
        }
    }

    fn stats(&self) -> ProtocolStatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_defaults_to_assembler_convention() {
        let endpoint = HttpHandler::resolve_endpoint("a1", &DeliveryOptions::default());
        assert_eq!(
            endpoint,
            "https://assembler-a1.cellcomputing.ai/api/v1/cells"
        );
    }

    #[test]
    fn endpoint_override_wins() {
        let options = DeliveryOptions::new().with_endpoint("http://127.0.0.1:9000/cells");
        let endpoint = HttpHandler::resolve_endpoint("a1", &options);
        assert_eq!(endpoint, "http://127.0.0.1:9000/cells");
    }

    #[test]
    fn handler_reports_protocol_name() {
        let handler = HttpHandler::new(HttpConfig::default()).unwrap();
        assert_eq!(handler.name(), "http");
    }
}
