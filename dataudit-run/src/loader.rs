//! Audit collection loading.
//!
//! Collections are JSON documents: an array of audit definitions in
//! execution order. Loading is the host's concern — the engine only ever
//! sees the in-memory [`AuditCollection`].

use std::path::Path;

use dataudit_core::{AuditCollection, AuditError, Result};

/// Loads an audit collection from a JSON file.
///
/// # Errors
/// Returns an I/O error when the file cannot be read and a serialization
/// error when it is not a valid collection document.
pub fn load_collection(path: &Path) -> Result<AuditCollection> {
    let contents = std::fs::read_to_string(path).map_err(|e| AuditError::Io {
        context: format!("Failed to read audit file {}", path.display()),
        source: e,
    })?;

    let collection: AuditCollection =
        serde_json::from_str(&contents).map_err(|e| AuditError::Serialization {
            context: format!("Failed to parse audit file {}", path.display()),
            source: e,
        })?;

    Ok(collection)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_collection_preserves_order() {
        let file = write_temp(
            r#"[
                {
                    "name": "first",
                    "connection_string": "Data Source=audits.db",
                    "provider": "sqlite",
                    "sql_statement": "SELECT id FROM orders WHERE total IS NULL",
                    "tests": [{"test_returned_rows": false}]
                },
                {
                    "name": "second",
                    "connection_string": "Server=db1;Database=sales",
                    "provider": "postgresql",
                    "sql_statement": "SELECT id FROM shipments",
                    "tests": [{
                        "criteria": "COUNTROWS",
                        "operator": ">",
                        "row_count": 100,
                        "test_returned_rows": true
                    }]
                }
            ]"#,
        );

        let collection = load_collection(file.path()).unwrap();

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get(0).unwrap().name, "first");
        assert_eq!(collection.get(1).unwrap().name, "second");
        assert_eq!(collection.get(1).unwrap().tests[0].row_count, 100);
    }

    #[test]
    fn test_load_collection_missing_file() {
        let result = load_collection(Path::new("does-not-exist.json"));
        assert!(matches!(result, Err(AuditError::Io { .. })));
    }

    #[test]
    fn test_load_collection_invalid_json() {
        let file = write_temp("{not json");
        let result = load_collection(file.path());
        assert!(matches!(result, Err(AuditError::Serialization { .. })));
    }

    #[test]
    fn test_load_collection_unknown_operator_rejected() {
        let file = write_temp(
            r#"[{
                "name": "bad",
                "connection_string": "Data Source=a.db",
                "provider": "sqlite",
                "sql_statement": "SELECT 1",
                "tests": [{"operator": "<>"}]
            }]"#,
        );

        let result = load_collection(file.path());
        assert!(matches!(result, Err(AuditError::Serialization { .. })));
    }
}
