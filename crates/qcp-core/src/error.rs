//! Distribution error taxonomy.
//!
//! Submission-time errors (`Validation`, `RateLimited`) are the only errors
//! that propagate synchronously to the caller of `submit`. Everything
//! discovered after enqueueing is recorded against the delivery record and
//! surfaced through `get_status`/`stats`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the cell distribution pipeline.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "category")]
pub enum DistributionError {
    /// A required request field is missing or malformed.
    #[error("Invalid delivery request: {message}")]
    Validation { message: String },

    /// The assembler exceeded a configured rate ceiling.
    #[error("Rate limit exceeded for assembler {assembler_id}")]
    RateLimited { assembler_id: String },

    /// No cell matched the requested id or capability.
    #[error("Cell not found: {message}")]
    CellNotFound { message: String },

    /// The verification service rejected the cell.
    #[error("Cell verification failed: {message}")]
    VerificationFailed { message: String },

    /// No handler is registered under the requested protocol name.
    #[error("Unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },

    /// The transport returned a structured failure.
    #[error("Transport failure: {message}")]
    Transport { message: String },

    /// Repository collaborator failure other than not-found.
    #[error("Repository error: {message}")]
    Repository { message: String },
}

impl DistributionError {
    /// Short machine-readable error kind, recorded in failure details.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::RateLimited { .. } => "rate_limited",
            Self::CellNotFound { .. } => "not_found",
            Self::VerificationFailed { .. } => "verification_failed",
            Self::UnsupportedProtocol { .. } => "unsupported_protocol",
            Self::Transport { .. } => "transport",
            Self::Repository { .. } => "repository",
        }
    }

    /// Convenience constructor for validation errors.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Convenience constructor for not-found errors.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::CellNotFound {
            message: message.into(),
        }
    }
}

/// Result alias for distribution operations.
pub type DistributionResult<T> = Result<T, DistributionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_matches_variant() {
        let err = DistributionError::UnsupportedProtocol {
            protocol: "carrier-pigeon".into(),
        };
        assert_eq!(err.kind(), "unsupported_protocol");
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn error_serializes_with_category_tag() {
        let err = DistributionError::not_found("no cell c9");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["category"], "CellNotFound");
        assert_eq!(json["message"], "no cell c9");
    }
}
