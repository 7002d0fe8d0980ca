//! Collaborator stubs and cell fixtures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use qcp_core::{Cell, CellRepository, CellVerifier, DistributionError, DistributionResult};

/// A deterministic test cell.
#[must_use]
pub fn test_cell(cell_id: &str) -> Cell {
    Cell::new("test", "testing")
        .with_id(cell_id)
        .with_provider("test-provider")
        .with_package_field("entry", Value::String("main.wasm".into()))
}

/// In-memory repository stub that counts lookups.
#[derive(Default)]
pub struct InMemoryRepository {
    cells: Mutex<HashMap<String, Cell>>,
    lookups: AtomicUsize,
}

impl InMemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cell, keyed by its id.
    pub fn insert(&self, cell: Cell) {
        self.cells.lock().insert(cell.id.clone(), cell);
    }

    /// Number of repository lookups performed (by id or capability).
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CellRepository for InMemoryRepository {
    async fn get_cell(&self, cell_id: &str) -> DistributionResult<Cell> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.cells.lock().get(cell_id).cloned().ok_or_else(|| {
            DistributionError::not_found(format!("no cell with id {cell_id}"))
        })
    }

    async fn find_cell_for_capability(
        &self,
        capability: &str,
        version: Option<&str>,
        _constraints: Option<&Map<String, Value>>,
    ) -> DistributionResult<Cell> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.cells
            .lock()
            .values()
            .find(|cell| {
                cell.capability == capability
                    && version.map_or(true, |version| cell.version == version)
            })
            .cloned()
            .ok_or_else(|| {
                DistributionError::not_found(format!("no cell for capability {capability}"))
            })
    }
}

/// Verifier stub with a fixed pass/fail answer.
pub struct StaticVerifier {
    accept: bool,
}

impl StaticVerifier {
    /// A verifier that accepts every cell.
    #[must_use]
    pub const fn passing() -> Self {
        Self { accept: true }
    }

    /// A verifier that rejects every cell.
    #[must_use]
    pub const fn failing() -> Self {
        Self { accept: false }
    }
}

#[async_trait]
impl CellVerifier for StaticVerifier {
    async fn verify_cell(&self, cell: &Cell, _quantum_signature: &str) -> DistributionResult<()> {
        if self.accept {
            Ok(())
        } else {
            Err(DistributionError::VerificationFailed {
                message: format!("signature rejected for cell {}", cell.id),
            })
        }
    }
}
