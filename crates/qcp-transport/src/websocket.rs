//! WebSocket delivery handler.
//!
//! Keeps one pooled connection per assembler, sends a typed `cell_delivery`
//! envelope, and requires an `ack` carrying the exact delivery id.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error};
use uuid::Uuid;

use qcp_core::{Cell, DeliveryOptions};

use crate::{
    DeliveryOutcome, ProtocolHandler, ProtocolStats, ProtocolStatsSnapshot, TransportError,
    HEADER_ASSEMBLER_ID, HEADER_PROVIDER_ID, HEADER_QUANTUM_SIGNATURE,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration for the WebSocket handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    /// Provider id sent in connection headers.
    pub provider_id: String,

    /// Connection establishment timeout.
    pub connect_timeout: Duration,

    /// How long to wait for an acknowledgement.
    pub ack_timeout: Duration,
}

impl WebSocketConfig {
    /// Set the provider id.
    #[must_use]
    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = provider_id.into();
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the acknowledgement timeout.
    #[must_use]
    pub const fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            provider_id: "default-provider".to_string(),
            connect_timeout: Duration::from_secs(30),
            ack_timeout: Duration::from_secs(10),
        }
    }
}

/// Delivers cells over a pooled per-assembler WebSocket connection.
pub struct WebSocketHandler {
    config: WebSocketConfig,
    // Connections are checked out for one delivery and returned if healthy;
    // a stale pooled connection is replaced lazily on the next delivery.
    connections: Mutex<HashMap<String, WsStream>>,
    stats: ProtocolStats,
}

impl WebSocketHandler {
    /// Create a new WebSocket handler.
    #[must_use]
    pub fn new(config: WebSocketConfig) -> Self {
        Self {
            config,
            connections: Mutex::new(HashMap::new()),
            stats: ProtocolStats::new(),
        }
    }

    /// Resolve the delivery endpoint for an assembler.
    #[must_use]
    pub fn resolve_endpoint(assembler_id: &str, options: &DeliveryOptions) -> String {
        options.endpoint.clone().unwrap_or_else(|| {
            format!("wss://assembler-{assembler_id}.cellcomputing.ai/api/v1/ws")
        })
    }

    fn checkout(&self, assembler_id: &str) -> Option<WsStream> {
        self.connections.lock().remove(assembler_id)
    }

    fn checkin(&self, assembler_id: &str, conn: WsStream) {
        self.connections
            .lock()
            .insert(assembler_id.to_string(), conn);
    }

    async fn connect(
        &self,
        endpoint: &str,
        assembler_id: &str,
        quantum_signature: &str,
    ) -> Result<WsStream, TransportError> {
        let mut request = endpoint
            .into_client_request()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        let headers = request.headers_mut();
        for (name, value) in [
            (HEADER_ASSEMBLER_ID, assembler_id),
            (HEADER_PROVIDER_ID, self.config.provider_id.as_str()),
            (HEADER_QUANTUM_SIGNATURE, quantum_signature),
        ] {
            headers.insert(
                name,
                HeaderValue::from_str(value)
                    .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?,
            );
        }

        let connect =
            tokio::time::timeout(self.config.connect_timeout, connect_async(request)).await;
        let Ok(ws_result) = connect else {
            return Err(TransportError::ConnectionFailed(format!(
                "connect timed out after {:?}",
                self.config.connect_timeout
            )));
        };
        let (stream, _response) =
            ws_result.map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        debug!(assembler_id, %endpoint, "websocket connection established");
        Ok(stream)
    }

    async fn deliver_inner(
        &self,
        endpoint: &str,
        cell: &Cell,
        assembler_id: &str,
        quantum_signature: &str,
        delivery_id: &str,
    ) -> Result<Value, TransportError> {
        let envelope = serde_json::json!({
            "type": "cell_delivery",
            "cell": cell,
            "quantum_signature": quantum_signature,
            "timestamp": Utc::now(),
            "delivery_id": delivery_id,
        })
        .to_string();

        let mut conn = match self.checkout(assembler_id) {
            Some(conn) => conn,
            None => {
                self.connect(endpoint, assembler_id, quantum_signature)
                    .await?
            }
        };

        if conn.send(Message::Text(envelope.clone().into())).await.is_err() {
            // Pooled connection went stale; reconnect once.
            conn = self
                .connect(endpoint, assembler_id, quantum_signature)
                .await?;
            conn.send(Message::Text(envelope.into()))
                .await
                .map_err(|e| TransportError::WebSocket(e.to_string()))?;
        }

        let ack = match tokio::time::timeout(
            self.config.ack_timeout,
            Self::await_ack(&mut conn, delivery_id),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(TransportError::AckTimeout(self.config.ack_timeout)),
        };

        self.checkin(assembler_id, conn);
        Ok(ack)
    }

    async fn await_ack(conn: &mut WsStream, delivery_id: &str) -> Result<Value, TransportError> {
        while let Some(message) = conn.next().await {
            match message.map_err(|e| TransportError::WebSocket(e.to_string()))? {
                Message::Text(text) => {
                    let value: Value = serde_json::from_str(text.as_str())
                        .map_err(|e| TransportError::InvalidAck(e.to_string()))?;
                    let is_ack = value.get("type").and_then(Value::as_str) == Some("ack");
                    let id_matches =
                        value.get("delivery_id").and_then(Value::as_str) == Some(delivery_id);
                    if is_ack && id_matches {
                        return Ok(value);
                    }
                    return Err(TransportError::InvalidAck(
                        "acknowledgement did not match the delivery id".to_string(),
                    ));
                }
                Message::Close(_) => {
                    return Err(TransportError::WebSocket(
                        "connection closed before acknowledgement".to_string(),
                    ));
                }
                // Pings/pongs/binary frames are not acknowledgements.
                _ => {}
            }
        }
        Err(TransportError::WebSocket(
            "connection ended before acknowledgement".to_string(),
        ))
    }
}

#[async_trait]
impl ProtocolHandler for WebSocketHandler {
    fn name(&self) -> &str {
        "websocket"
    }

    async fn deliver(
        &self,
        cell: &Cell,
        assembler_id: &str,
        quantum_signature: &str,
        options: &DeliveryOptions,
    ) -> DeliveryOutcome {
        let endpoint = Self::resolve_endpoint(assembler_id, options);
        let delivery_id = options
            .delivery_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        debug!(assembler_id, %endpoint, cell_id = %cell.id, %delivery_id, "delivering cell over websocket");

        let start = Instant::now();
        match self
            .deliver_inner(&endpoint, cell, assembler_id, quantum_signature, &delivery_id)
            .await
        {
            Ok(ack) => {
                let elapsed = start.elapsed();
                self.stats.record(elapsed, true);
                DeliveryOutcome::success(elapsed)
                    .with_delivery_id(delivery_id)
                    .with_response(ack)
            }
            Err(e) => {
                let elapsed = start.elapsed();
                self.stats.record(elapsed, false);
                error!(assembler_id, error = %e, "websocket delivery failed");
                DeliveryOutcome::failure(e.to_string(), elapsed)
            }
        }
    }

    fn stats(&self) -> ProtocolStatsSnapshot {
        self.stats.snapshot()
    }
}
