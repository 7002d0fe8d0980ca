//! QCP Testkit - Mock assemblers and collaborator fixtures
//!
//! Test infrastructure for exercising the distribution pipeline without
//! real assemblers or repository/verification services:
//!
//! - [`MockAssemblerServer`]: wiremock-backed HTTP delivery endpoint
//! - [`MockAckServer`]: loopback WebSocket server that acks deliveries
//! - [`InMemoryRepository`] / [`StaticVerifier`]: collaborator stubs

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod ack_server;
mod fixtures;
mod mock_assembler;

pub use ack_server::*;
pub use fixtures::*;
pub use mock_assembler::*;
