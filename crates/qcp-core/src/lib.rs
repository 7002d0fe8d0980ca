//! QCP Core - Core types and traits for the QCP cell distribution pipeline
//!
//! This crate provides the foundational value objects, error taxonomy, and
//! collaborator traits shared by the distribution pipeline:
//!
//! - **Value objects**: [`Cell`], [`DeliveryRequest`], [`DeliveryOptions`]
//! - **Lifecycle**: [`DeliveryStatus`]
//! - **Errors**: [`DistributionError`]
//! - **Collaborators**: [`CellRepository`], [`CellVerifier`]

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod cell;
mod error;
mod repository;
mod request;
mod status;

pub use cell::*;
pub use error::*;
pub use repository::*;
pub use request::*;
pub use status::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
