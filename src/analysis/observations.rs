//! Loading usage tables produced by the static-analysis tool.
//!
//! The tool writes one JSON object per module, keyed by plural element
//! kind, each holding element names and their counts:
//!
//! ```json
//! { "classes": { "mysql::server": 2 }, "functions": { "mysql_password": 1 } }
//! ```
//!
//! Document order is kept, so rows come out in the order the tool wrote them.

use std::fs;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use super::attribution::UsageObservation;

/// Errors that can occur while loading a usage table.
#[derive(Error, Debug)]
pub enum ObservationError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected an object of element counts for kind '{kind}'")]
    NotAnObject { kind: String },

    #[error("Invalid count for {kind} '{element}': {value}")]
    InvalidCount {
        kind: String,
        element: String,
        value: String,
    },
}

/// Result type for loading operations.
pub type ObservationResult<T> = Result<T, ObservationError>;

/// An ordered `kind → element → count` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationTable {
    observations: Vec<UsageObservation>,
}

impl ObservationTable {
    /// Parse a table from JSON text.
    ///
    /// The top-level value must be an object of objects, or an empty
    /// object for modules without manifests.
    pub fn parse_str(content: &str) -> ObservationResult<Self> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(&value)
    }

    /// Parse a table from a JSON file.
    pub fn from_file(path: &Path) -> ObservationResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse_str(&content)
    }

    fn from_value(value: &Value) -> ObservationResult<Self> {
        let Some(kinds) = value.as_object() else {
            return Err(ObservationError::NotAnObject {
                kind: "<root>".to_string(),
            });
        };

        let mut observations = Vec::new();
        for (kind, elements) in kinds {
            let elements = elements
                .as_object()
                .ok_or_else(|| ObservationError::NotAnObject { kind: kind.clone() })?;

            for (element, count) in elements {
                let count = count.as_u64().ok_or_else(|| ObservationError::InvalidCount {
                    kind: kind.clone(),
                    element: element.clone(),
                    value: count.to_string(),
                })?;
                observations.push(UsageObservation::new(kind.as_str(), element.as_str(), count));
            }
        }

        Ok(Self { observations })
    }

    pub fn observations(&self) -> &[UsageObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "types": { "file": 4, "mysql_user": 1 },
        "classes": { "mysql::server": 2 },
        "functions": { "stdlib::ensure": 3 }
    }"#;

    #[test]
    fn test_parse_str_keeps_document_order() {
        let table = ObservationTable::parse_str(SAMPLE).unwrap();

        let flattened: Vec<_> = table
            .observations()
            .iter()
            .map(|o| (o.kind.as_str(), o.element.as_str(), o.count))
            .collect();
        assert_eq!(
            flattened,
            vec![
                ("types", "file", 4),
                ("types", "mysql_user", 1),
                ("classes", "mysql::server", 2),
                ("functions", "stdlib::ensure", 3),
            ]
        );
    }

    #[test]
    fn test_empty_table() {
        let table = ObservationTable::parse_str("{}").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_invalid_json() {
        let result = ObservationTable::parse_str("{ nope");
        assert!(matches!(result.unwrap_err(), ObservationError::Json(_)));
    }

    #[test]
    fn test_kind_not_an_object() {
        let result = ObservationTable::parse_str(r#"{"classes": ["a"]}"#);
        assert!(matches!(
            result.unwrap_err(),
            ObservationError::NotAnObject { kind } if kind == "classes"
        ));
    }

    #[test]
    fn test_negative_count_rejected() {
        let result = ObservationTable::parse_str(r#"{"classes": {"a": -1}}"#);
        assert!(matches!(
            result.unwrap_err(),
            ObservationError::InvalidCount { element, .. } if element == "a"
        ));
    }

    #[test]
    fn test_root_not_an_object() {
        let result = ObservationTable::parse_str("[]");
        assert!(matches!(result.unwrap_err(), ObservationError::NotAnObject { .. }));
    }

    #[test]
    fn test_from_file_missing() {
        let result = ObservationTable::from_file(Path::new("/nonexistent/usage.json"));
        assert!(matches!(result.unwrap_err(), ObservationError::FileRead(_)));
    }
}
