//! QCP Rate Limit - Per-assembler request rate limiting
//!
//! Gate-keeps delivery submissions with three independent sliding windows
//! (second / minute / hour) per assembler:
//!
//! - **Trusted bypass**: configured assembler ids always pass and consume
//!   no quota
//! - **Window attribution**: every rejection records which window caused it
//! - **Non-blocking**: [`AssemblerRateLimiter::allow`] never suspends the
//!   caller; it is a mutex-guarded O(window) check
//!
//! # Quick Start
//!
//! ```rust
//! use qcp_ratelimit::{AssemblerRateLimiter, RateLimitConfig};
//!
//! let limiter = AssemblerRateLimiter::new(RateLimitConfig::default());
//! if limiter.allow("assembler-1") {
//!     // submit the request
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod multi_window;

pub use multi_window::*;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Configuration for the assembler rate limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per second per assembler.
    pub max_requests_per_second: u32,

    /// Maximum requests per minute per assembler.
    pub max_requests_per_minute: u32,

    /// Maximum requests per hour per assembler.
    pub max_requests_per_hour: u32,

    /// Assembler ids exempt from rate limiting.
    #[serde(default)]
    pub trusted_assemblers: HashSet<String>,
}

impl RateLimitConfig {
    /// Create a configuration with explicit ceilings.
    #[must_use]
    pub fn new(per_second: u32, per_minute: u32, per_hour: u32) -> Self {
        Self {
            max_requests_per_second: per_second,
            max_requests_per_minute: per_minute,
            max_requests_per_hour: per_hour,
            trusted_assemblers: HashSet::new(),
        }
    }

    /// Mark an assembler as trusted.
    #[must_use]
    pub fn with_trusted_assembler(mut self, assembler_id: impl Into<String>) -> Self {
        self.trusted_assemblers.insert(assembler_id.into());
        self
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(5, 60, 1000)
    }
}

/// Rate limiter statistics snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RateLimiterStats {
    /// Requests checked.
    pub total_requests: u64,
    /// Requests allowed.
    pub allowed_requests: u64,
    /// Requests rejected.
    pub limited_requests: u64,
    /// Rejections attributed to the one-second window.
    pub limited_by_second: u64,
    /// Rejections attributed to the one-minute window.
    pub limited_by_minute: u64,
    /// Rejections attributed to the one-hour window.
    pub limited_by_hour: u64,
    /// Percentage of requests rejected.
    pub limited_percentage: f64,
}
