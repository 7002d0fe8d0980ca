//! QCP Telemetry - Logging setup for the cell distribution provider
//!
//! Structured logging on top of `tracing`:
//!
//! - **JSON or pretty output**, selected by configuration
//! - **Env-filter override**: `RUST_LOG` takes precedence over the
//!   configured level
//! - **Redaction helpers** for sensitive request fields
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use qcp_telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(TelemetryConfig::new("qcp-provider").with_log_level("debug"))?;
//! tracing::info!(assembler_id = "assembler-1", "provider started");
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod logging;

pub use logging::*;

/// Configuration for telemetry initialization.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for identifying logs.
    pub service_name: String,

    /// Log level filter (e.g., "info", "debug", "trace").
    pub log_level: String,

    /// Enable JSON log output.
    pub json_logs: bool,

    /// Fields to redact from logged payloads.
    pub redact_fields: Vec<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "qcp-provider".to_string(),
            log_level: "info".to_string(),
            json_logs: true,
            redact_fields: vec![
                "quantum_signature".to_string(),
                "authorization".to_string(),
                "token".to_string(),
                "secret".to_string(),
            ],
        }
    }
}

impl TelemetryConfig {
    /// Create a configuration with the given service name.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable or disable JSON logs.
    #[must_use]
    pub const fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// Add fields to redact from logged payloads.
    #[must_use]
    pub fn with_redact_fields(mut self, fields: Vec<String>) -> Self {
        self.redact_fields.extend(fields);
        self
    }
}

/// Telemetry error type.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),
}

/// Initialize the telemetry system.
///
/// Call once at startup; a second initialization fails because the global
/// subscriber is already set.
///
/// # Errors
/// Returns an error if the logging subscriber cannot be installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    init_logging(&config)
}
