//! QCP Distribution - Cell distribution pipeline orchestration
//!
//! Ties the pipeline together around a [`DistributionManager`]:
//!
//! - **Submission**: validation, per-assembler rate limiting, request id and
//!   timestamp stamping
//! - **Scheduling**: a priority queue drained by one dispatch loop that
//!   spawns an independent task per delivery
//! - **Resolution**: cache-first cell lookup, repository fall-through, and
//!   signature verification before any transport send
//! - **Tracking**: per-request status history from `QUEUED` to a terminal
//!   state, with aggregate counters
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use qcp_core::DeliveryRequest;
//! use qcp_distribution::{DistributionConfig, DistributionManager};
//! use qcp_testkit::{InMemoryRepository, StaticVerifier};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = DistributionManager::new(
//!     Arc::new(InMemoryRepository::new()),
//!     Arc::new(StaticVerifier::passing()),
//!     DistributionConfig::default(),
//! )?;
//! manager.start();
//!
//! let request_id = manager.submit(DeliveryRequest::for_cell("assembler-1", "cell-1"))?;
//! let record = manager.get_status(&request_id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod manager;
mod queue;
mod tracking;

pub use config::*;
pub use manager::*;
pub use queue::*;
pub use tracking::*;
