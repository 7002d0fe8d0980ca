//! Loopback WebSocket assembler that acknowledges cell deliveries.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;

/// How the mock assembler responds to `cell_delivery` envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckBehavior {
    /// Reply with a matching `ack`.
    Ack,
    /// Reply with an `ack` carrying a wrong delivery id.
    WrongDeliveryId,
    /// Never reply, forcing an ack timeout.
    Silent,
}

/// A WebSocket server that plays the assembler side of the delivery wire
/// contract.
pub struct MockAckServer {
    addr: SocketAddr,
    deliveries: Arc<AtomicUsize>,
    accept_task: JoinHandle<()>,
}

impl MockAckServer {
    /// Start the server on an ephemeral loopback port.
    ///
    /// # Panics
    /// Panics if the loopback listener cannot be bound.
    pub async fn start(behavior: AckBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback listener");
        let addr = listener.local_addr().expect("listener address");
        let deliveries = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&deliveries);
        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    while let Some(Ok(message)) = ws.next().await {
                        let Message::Text(text) = message else {
                            continue;
                        };
                        let Ok(envelope) = serde_json::from_str::<Value>(text.as_str()) else {
                            continue;
                        };
                        if envelope.get("type").and_then(Value::as_str) != Some("cell_delivery") {
                            continue;
                        }
                        counter.fetch_add(1, Ordering::SeqCst);

                        let delivery_id = match behavior {
                            AckBehavior::Ack => envelope
                                .get("delivery_id")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                            AckBehavior::WrongDeliveryId => "mismatched".to_string(),
                            AckBehavior::Silent => continue,
                        };
                        let ack = serde_json::json!({
                            "type": "ack",
                            "delivery_id": delivery_id,
                        })
                        .to_string();
                        if ws.send(Message::Text(ack.into())).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });

        Self {
            addr,
            deliveries,
            accept_task,
        }
    }

    /// WebSocket endpoint URL for this assembler.
    #[must_use]
    pub fn ws_endpoint(&self) -> String {
        format!("ws://{}/api/v1/ws", self.addr)
    }

    /// Number of `cell_delivery` envelopes received so far.
    #[must_use]
    pub fn delivery_count(&self) -> usize {
        self.deliveries.load(Ordering::SeqCst)
    }
}

impl Drop for MockAckServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}
