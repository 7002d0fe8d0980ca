//! QCP Transport - Protocol handlers for cell delivery
//!
//! Pluggable transports that move a resolved cell to an assembler:
//!
//! - **HTTP**: POST the JSON cell to the assembler's delivery endpoint
//! - **WebSocket**: typed `cell_delivery` envelope over a pooled
//!   per-assembler connection, acknowledged by delivery id
//!
//! Every handler reports attempts, successes, failures, and delivery time
//! through the shared [`ProtocolStats`] routine so cross-protocol stats are
//! comparable, and every handler degrades to a structured
//! [`DeliveryOutcome`] instead of propagating errors to the orchestrator.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod http;
mod outcome;
mod registry;
mod stats;
mod websocket;

pub use http::*;
pub use outcome::*;
pub use registry::*;
pub use stats::*;
pub use websocket::*;

use async_trait::async_trait;
use thiserror::Error;

use qcp_core::{Cell, DeliveryOptions};

/// Transport-layer error.
///
/// These never cross the handler boundary: `deliver` folds them into a
/// failed [`DeliveryOutcome`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client construction failed: {0}")]
    ClientBuild(String),

    /// Connecting to the assembler failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Sending or receiving on an established connection failed.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The acknowledgement did not arrive in time.
    #[error("Acknowledgement timed out after {0:?}")]
    AckTimeout(std::time::Duration),

    /// The acknowledgement was malformed or did not match the delivery id.
    #[error("Invalid acknowledgement: {0}")]
    InvalidAck(String),
}

/// Common contract for delivery transports.
#[async_trait]
pub trait ProtocolHandler: Send + Sync {
    /// Protocol name used for registry lookup and stats labeling.
    fn name(&self) -> &str;

    /// Deliver a cell to an assembler.
    ///
    /// Always returns a structured outcome; transport failures are reported
    /// through [`DeliveryOutcome::error`], never as panics or errors.
    async fn deliver(
        &self,
        cell: &Cell,
        assembler_id: &str,
        quantum_signature: &str,
        options: &DeliveryOptions,
    ) -> DeliveryOutcome;

    /// Snapshot the handler's delivery statistics.
    fn stats(&self) -> ProtocolStatsSnapshot;
}
