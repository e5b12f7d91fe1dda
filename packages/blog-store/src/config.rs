//! Store configuration.

use std::path::PathBuf;

use crate::error::StoreError;

/// Name of the production database. Test suites must never target it.
pub const PRODUCTION_DATABASE: &str = "blog-app";

/// Name used when a configuration does not set one.
pub const DEFAULT_DATABASE: &str = "scratch";

/// Checks that `name` is usable as a single path component.
///
/// Accepts ASCII alphanumerics, `_`, `-` and `.`; rejects empty names,
/// names starting with `.`, and names containing `..`.
pub fn validate_name(kind: &str, name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    if !valid {
        return Err(StoreError::Validation(format!(
            "{} name '{}' must be a plain name (letters, digits, '_', '-', '.')",
            kind, name
        )));
    }
    Ok(())
}

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database name
    pub name: String,
    /// Root directory for snapshot files (None = memory only)
    pub data_dir: Option<PathBuf>,
    /// Initial capacity of a newly created collection
    pub initial_collection_capacity: usize,
    /// Maximum retry attempts for transient I/O errors
    pub persistence_max_retries: u32,
    /// Delay between retry attempts in milliseconds
    pub persistence_retry_delay_ms: u64,
}

impl StoreConfig {
    /// Creates an in-memory configuration for the named database.
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Directory holding this database's snapshot files, if persistence is enabled.
    ///
    /// # Errors
    /// `Validation` when the name would escape `data_dir`.
    pub fn database_dir(&self) -> Result<Option<PathBuf>, StoreError> {
        let Some(dir) = &self.data_dir else {
            return Ok(None);
        };
        validate_name("database", &self.name)?;
        Ok(Some(dir.join(&self.name)))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DATABASE.to_string(),
            data_dir: None,
            initial_collection_capacity: 64,
            persistence_max_retries: 3,      // Default retry attempts
            persistence_retry_delay_ms: 100, // 100ms delay between retries
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_must_stay_inside_data_dir() {
        for bad in ["", "../precious", "..", ".hidden", "a/b", "a\\b", "x..y", "/abs"] {
            assert!(validate_name("database", bad).is_err(), "{:?} accepted", bad);
        }
        for good in ["test-blog-app", "blog_app.v2", PRODUCTION_DATABASE] {
            assert!(validate_name("database", good).is_ok(), "{:?} rejected", good);
        }

        let escaping = StoreConfig {
            name: "../precious".to_string(),
            data_dir: Some(PathBuf::from("/tmp/data")),
            ..Default::default()
        };
        assert!(matches!(escaping.database_dir(), Err(StoreError::Validation(_))));

        // In-memory databases never touch the filesystem
        assert_eq!(StoreConfig::in_memory("../x").database_dir().unwrap(), None);
    }

    #[test]
    fn test_default_is_not_production() {
        assert_ne!(StoreConfig::default().name, PRODUCTION_DATABASE);
    }
}
