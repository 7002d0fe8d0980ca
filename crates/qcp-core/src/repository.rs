//! Collaborator traits consumed by the distribution pipeline.
//!
//! The repository and verification services are external to this pipeline;
//! they are reached only through these narrow async contracts.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{Cell, DistributionResult};

/// Resolves cells by id or by capability match.
#[async_trait]
pub trait CellRepository: Send + Sync {
    /// Fetch a cell by id.
    ///
    /// # Errors
    /// Returns [`crate::DistributionError::CellNotFound`] if no cell exists
    /// under `cell_id`.
    async fn get_cell(&self, cell_id: &str) -> DistributionResult<Cell>;

    /// Find the best cell for a capability, optionally narrowed by version
    /// and constraints.
    ///
    /// # Errors
    /// Returns [`crate::DistributionError::CellNotFound`] if nothing matches.
    async fn find_cell_for_capability(
        &self,
        capability: &str,
        version: Option<&str>,
        constraints: Option<&Map<String, Value>>,
    ) -> DistributionResult<Cell>;
}

/// Verifies a cell against a caller-supplied quantum signature.
#[async_trait]
pub trait CellVerifier: Send + Sync {
    /// Verify a cell before delivery.
    ///
    /// # Errors
    /// Returns [`crate::DistributionError::VerificationFailed`] when the
    /// signature/security/compatibility checks reject the cell.
    async fn verify_cell(&self, cell: &Cell, quantum_signature: &str) -> DistributionResult<()>;
}
