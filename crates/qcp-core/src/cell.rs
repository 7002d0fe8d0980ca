//! Cell value object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A deployable unit of payload/code distributed to an assembler.
///
/// Cells are owned by the repository service; the distribution pipeline only
/// holds transient copies (cached or in-flight). The canonical wire
/// representation is the JSON serialization of this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Unique cell identifier.
    pub id: String,

    /// Type of the cell.
    #[serde(default)]
    pub cell_type: String,

    /// Primary capability provided by the cell.
    #[serde(default)]
    pub capability: String,

    /// Cell version.
    #[serde(default = "Cell::default_version")]
    pub version: String,

    /// Provider that supplied the cell.
    #[serde(default)]
    pub provider: String,

    /// Creation timestamp.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Serializable package body.
    #[serde(default)]
    pub package: Map<String, Value>,
}

impl Cell {
    fn default_version() -> String {
        "1.0.0".to_string()
    }

    /// Create a new cell with a generated id.
    #[must_use]
    pub fn new(cell_type: impl Into<String>, capability: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            cell_type: cell_type.into(),
            capability: capability.into(),
            version: Self::default_version(),
            provider: String::new(),
            created_at: Utc::now(),
            package: Map::new(),
        }
    }

    /// Set the cell id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the cell version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the provider id.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Attach a package field.
    #[must_use]
    pub fn with_package_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.package.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_builder_sets_fields() {
        let cell = Cell::new("ui", "text_editor")
            .with_id("c1")
            .with_version("2.1.0")
            .with_provider("provider-1")
            .with_package_field("entry", Value::String("main.wasm".into()));

        assert_eq!(cell.id, "c1");
        assert_eq!(cell.cell_type, "ui");
        assert_eq!(cell.capability, "text_editor");
        assert_eq!(cell.version, "2.1.0");
        assert_eq!(cell.package["entry"], "main.wasm");
    }

    #[test]
    fn cell_round_trips_through_json() {
        let cell = Cell::new("compute", "hashing").with_id("c2");
        let json = serde_json::to_string(&cell).unwrap();
        let back: Cell = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cell);
    }

    #[test]
    fn cell_deserializes_with_missing_optional_fields() {
        let cell: Cell = serde_json::from_str(r#"{"id": "c3"}"#).unwrap();
        assert_eq!(cell.id, "c3");
        assert_eq!(cell.version, "1.0.0");
        assert!(cell.package.is_empty());
    }
}
