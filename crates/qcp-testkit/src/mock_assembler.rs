//! Mock assembler HTTP endpoint.
//!
//! Wraps wiremock with the cell-delivery patterns the pipeline tests need.

use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A mock assembler accepting HTTP cell deliveries.
pub struct MockAssemblerServer {
    server: MockServer,
}

impl MockAssemblerServer {
    /// Start a new mock assembler.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Delivery endpoint URL for this assembler.
    #[must_use]
    pub fn cells_endpoint(&self) -> String {
        format!("{}/api/v1/cells", self.server.uri())
    }

    /// Underlying wiremock server for advanced configuration.
    #[must_use]
    pub const fn inner(&self) -> &MockServer {
        &self.server
    }

    /// Accept every cell delivery with the given status code.
    pub async fn accept_deliveries(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/api/v1/cells"))
            .and(header_exists("X-QCC-Assembler-ID"))
            .and(header_exists("X-QCC-Quantum-Signature"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(serde_json::json!({"status": "accepted"})),
            )
            .mount(&self.server)
            .await;
    }

    /// Reject every cell delivery with the given status code.
    pub async fn reject_deliveries(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/api/v1/cells"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(serde_json::json!({"status": "rejected"})),
            )
            .mount(&self.server)
            .await;
    }

    /// Number of delivery requests received so far.
    pub async fn delivery_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}
