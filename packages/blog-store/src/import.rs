//! Bulk import of fixture files into a collection.
//!
//! A fixture file is either a JSON array of objects or newline-delimited
//! JSON objects (blank lines ignored). The whole file is parsed and
//! validated before the collection is touched, so an import either
//! applies completely or not at all.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::database::Database;
use crate::document::{json_kind, Document};
use crate::error::StoreError;
use crate::persistence::classify_io_error;

/// How imported documents combine with the existing collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Drop the collection, then insert
    Drop,
    /// Insert alongside existing documents
    Append,
}

/// Outcome of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Target collection
    pub collection: String,
    /// Number of documents imported
    pub imported: usize,
    /// Number of documents removed by the drop step
    pub dropped: usize,
}

/// Reads and parses a fixture file.
pub fn parse_fixture(path: &Path) -> Result<Vec<Document>, StoreError> {
    parse_fixture_with(path, |_| Ok(()))
}

/// Reads and parses a fixture file, checking every record with `validate`.
///
/// A rejected record is reported as `Import` with its 1-based record number.
pub fn parse_fixture_with<F>(path: &Path, validate: F) -> Result<Vec<Document>, StoreError>
where
    F: Fn(&Document) -> Result<(), StoreError>,
{
    let text = fs::read_to_string(path)
        .map_err(|e| classify_io_error(e, &format!("Failed to read {}", path.display())))?;
    parse_records(path, &text, validate)
}

/// Parses fixture text. `path` is only used for error reporting.
pub fn parse_fixture_str(path: &Path, text: &str) -> Result<Vec<Document>, StoreError> {
    parse_records(path, text, |_| Ok(()))
}

fn parse_records<F>(path: &Path, text: &str, validate: F) -> Result<Vec<Document>, StoreError>
where
    F: Fn(&Document) -> Result<(), StoreError>,
{
    let import_error = |record: usize, reason: String| StoreError::Import {
        path: path.to_path_buf(),
        record,
        reason,
    };

    let trimmed = text.trim_start();
    let values: Vec<(usize, Value)> = if trimmed.starts_with('[') {
        let parsed: Value =
            serde_json::from_str(trimmed).map_err(|e| import_error(0, e.to_string()))?;
        match parsed {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i + 1, v))
                .collect(),
            other => return Err(import_error(0, format!("expected array, got {}", json_kind(&other)))),
        }
    } else {
        let mut values = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let value =
                serde_json::from_str(line).map_err(|e| import_error(i + 1, e.to_string()))?;
            values.push((i + 1, value));
        }
        values
    };

    let mut seen = HashSet::with_capacity(values.len());
    let mut documents = Vec::with_capacity(values.len());
    for (record, value) in values {
        let doc = Document::from_value(value).map_err(|e| import_error(record, e.to_string()))?;
        validate(&doc).map_err(|e| import_error(record, e.to_string()))?;
        if !seen.insert(doc.id) {
            return Err(import_error(record, format!("duplicate id {}", doc.id)));
        }
        documents.push(doc);
    }
    Ok(documents)
}

impl Database {
    /// Imports a fixture file into a collection.
    ///
    /// # Arguments
    /// * `collection` - Target collection name
    /// * `path` - Fixture file
    /// * `mode` - Drop-before-import or append
    ///
    /// # Returns
    /// `Result<ImportReport, StoreError>`; on error the collection is unchanged.
    pub fn import_file(
        &self,
        collection: &str,
        path: &Path,
        mode: ImportMode,
    ) -> Result<ImportReport, StoreError> {
        self.import_file_with(collection, path, mode, |_| Ok(()))
    }

    /// Like [`Database::import_file`], rejecting the whole file if any
    /// record fails `validate`.
    pub fn import_file_with<F>(
        &self,
        collection: &str,
        path: &Path,
        mode: ImportMode,
        validate: F,
    ) -> Result<ImportReport, StoreError>
    where
        F: Fn(&Document) -> Result<(), StoreError>,
    {
        let documents = parse_fixture_with(path, validate)?;
        let report = self.import_documents(collection, documents, mode)?;
        tracing::info!(
            "Imported {} document(s) into {}.{} from {}",
            report.imported,
            self.name(),
            collection,
            path.display()
        );
        Ok(report)
    }

    /// Imports already parsed documents into a collection.
    pub fn import_documents(
        &self,
        collection: &str,
        documents: Vec<Document>,
        mode: ImportMode,
    ) -> Result<ImportReport, StoreError> {
        let imported = documents.len();
        let dropped = match mode {
            ImportMode::Drop => {
                let dropped = self.count(collection)?;
                self.replace_collection(collection, documents)?;
                dropped
            }
            ImportMode::Append => {
                self.append_collection(collection, documents)?;
                0
            }
        };
        Ok(ImportReport {
            collection: collection.to_string(),
            imported,
            dropped,
        })
    }
}
