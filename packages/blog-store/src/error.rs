//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Document store errors.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Document not found in collection
    #[error("Document '{id}' not found in collection '{collection}'")]
    DocumentNotFound { collection: String, id: String },

    /// Identifier is not a 24 character hex string
    #[error("Invalid document id '{0}'")]
    InvalidId(String),

    /// Document with this id already exists
    #[error("Duplicate id '{id}' in collection '{collection}'")]
    DuplicateId { collection: String, id: String },

    /// Document failed model validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Required field missing from a document
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    /// Fixture file could not be imported
    #[error("Import of '{}' failed at record {record}: {reason}", path.display())]
    Import {
        path: PathBuf,
        record: usize,
        reason: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Lock poisoned (RwLock poisoned)
    #[error("Lock poisoned")]
    LockPoisoned,

    /// Data corruption detected
    #[error("Data corruption detected: {0}")]
    DataCorruption(String),

    /// I/O error during persistence
    #[error("I/O error: {0}")]
    IoError(String),

    /// Transient I/O error that may succeed on retry
    #[error("Transient I/O error: {0}")]
    TransientIoError(String),
}

impl StoreError {
    /// Returns true for errors caused by the caller's input rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidId(_)
                | StoreError::DuplicateId { .. }
                | StoreError::Validation(_)
                | StoreError::MissingField(_)
        )
    }
}
