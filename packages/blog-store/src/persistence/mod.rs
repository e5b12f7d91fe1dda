//! Snapshot persistence for collections.
//!
//! Each save writes every collection as a JSON array to
//! `<collection>.<generation>.json` inside the database directory, then
//! swaps in a new `manifest.json` naming those files with a CRC32 checksum
//! each. Files of older generations are removed only after the manifest
//! is in place, so an interrupted save leaves the previous snapshot intact.

mod io_utils;

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{validate_name, StoreConfig};
use crate::database::Collection;
use crate::document::Document;
use crate::error::StoreError;

pub use io_utils::{classify_io_error, retry_io_operation};

const MANIFEST_FILE: &str = "manifest.json";
const MANIFEST_VERSION: u32 = 1;

/// On-disk manifest listing snapshot files and their checksums.
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    #[serde(default)]
    generation: u64,
    collections: BTreeMap<String, ManifestEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestEntry {
    file: String,
    checksum: u32,
    documents: usize,
}

/// Reads and writes collection snapshots for one database directory.
#[derive(Debug)]
pub struct SnapshotManager {
    /// Database directory path
    dir: PathBuf,
    /// Maximum retry attempts for transient I/O errors
    max_retries: u32,
    /// Delay between retry attempts in milliseconds
    retry_delay_ms: u64,
}

impl SnapshotManager {
    /// Returns a manager when the configuration enables persistence.
    ///
    /// # Errors
    /// `Validation` when the database name is not a plain directory name.
    pub fn from_config(config: &StoreConfig) -> Result<Option<Self>, StoreError> {
        Ok(config.database_dir()?.map(|dir| Self {
            dir,
            max_retries: config.persistence_max_retries,
            retry_delay_ms: config.persistence_retry_delay_ms,
        }))
    }

    /// Database directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes every collection under a new generation, then the manifest,
    /// then removes files of earlier generations.
    pub fn save(&self, collections: &HashMap<String, Collection>) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| classify_io_error(e, "Failed to create database directory"))?;

        let generation = self.current_generation() + 1;
        let mut manifest = Manifest {
            version: MANIFEST_VERSION,
            generation,
            collections: BTreeMap::new(),
        };

        for (name, docs) in collections {
            let file = collection_file_name(name, generation)?;
            let values: Vec<Value> = docs.iter().map(Document::to_value).collect();
            let bytes = serde_json::to_vec(&values)
                .map_err(|e| StoreError::SerializationError(e.to_string()))?;
            let checksum = checksum(&bytes);

            retry_io_operation(
                || self.write_atomic(&file, &bytes),
                self.max_retries,
                self.retry_delay_ms,
                "collection snapshot",
            )?;

            manifest.collections.insert(
                name.clone(),
                ManifestEntry {
                    file,
                    checksum,
                    documents: docs.len(),
                },
            );
        }

        let manifest_bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        retry_io_operation(
            || self.write_atomic(MANIFEST_FILE, &manifest_bytes),
            self.max_retries,
            self.retry_delay_ms,
            "snapshot manifest",
        )?;

        self.remove_stale_files(&manifest);
        tracing::debug!(
            "Saved {} collection snapshot(s) to {} (generation {})",
            collections.len(),
            self.dir.display(),
            generation
        );
        Ok(())
    }

    /// Loads all collections listed in the manifest. A missing manifest yields no collections.
    pub fn load(&self) -> Result<HashMap<String, Collection>, StoreError> {
        let manifest_path = self.dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Ok(HashMap::new());
        }

        let manifest_bytes = fs::read(&manifest_path)
            .map_err(|e| classify_io_error(e, "Failed to read snapshot manifest"))?;
        let manifest: Manifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| StoreError::DataCorruption(format!("Unreadable manifest: {}", e)))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(StoreError::SerializationError(format!(
                "Unsupported manifest version: {}",
                manifest.version
            )));
        }

        let mut collections = HashMap::with_capacity(manifest.collections.len());
        for (name, entry) in manifest.collections {
            let bytes = fs::read(self.dir.join(&entry.file))
                .map_err(|e| classify_io_error(e, "Failed to read collection snapshot"))?;
            let actual = checksum(&bytes);
            if actual != entry.checksum {
                return Err(StoreError::DataCorruption(format!(
                    "Checksum mismatch for collection '{}': expected {:08x}, got {:08x}",
                    name, entry.checksum, actual
                )));
            }
            let values: Vec<Value> = serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::DataCorruption(format!("{}: {}", entry.file, e)))?;
            let docs = values
                .into_iter()
                .map(Document::from_value)
                .collect::<Result<Collection, _>>()?;
            if docs.len() != entry.documents {
                return Err(StoreError::DataCorruption(format!(
                    "Collection '{}' has {} documents, manifest records {}",
                    name,
                    docs.len(),
                    entry.documents
                )));
            }
            collections.insert(name, docs);
        }

        Ok(collections)
    }

    /// Removes the database directory. Missing directories are ignored.
    pub fn remove_all(&self) -> Result<(), StoreError> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(classify_io_error(e, "Failed to remove database directory")),
        }
    }

    /// Generation of the manifest on disk, 0 when there is none or it is unreadable.
    fn current_generation(&self) -> u64 {
        fs::read(self.dir.join(MANIFEST_FILE))
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Manifest>(&bytes).ok())
            .map_or(0, |manifest| manifest.generation)
    }

    /// Deletes snapshot files the manifest no longer names. Failures are logged only.
    fn remove_stale_files(&self, manifest: &Manifest) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to list {}: {}", self.dir.display(), e);
                return;
            }
        };
        for entry in entries.flatten() {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let referenced = file_name == MANIFEST_FILE
                || manifest.collections.values().any(|e| e.file == file_name);
            let snapshot_file = file_name.ends_with(".json") || file_name.ends_with(".tmp");
            if referenced || !snapshot_file || !entry.path().is_file() {
                continue;
            }
            if let Err(e) = fs::remove_file(entry.path()) {
                tracing::warn!("Failed to remove stale snapshot {}: {}", file_name, e);
            }
        }
    }

    fn write_atomic(&self, file_name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let temp_path = self.dir.join(format!("{}.tmp", file_name));
        let final_path = self.dir.join(file_name);

        let mut file = File::create(&temp_path)
            .map_err(|e| classify_io_error(e, "Failed to create temp file"))?;
        file.write_all(bytes)
            .map_err(|e| classify_io_error(e, "Failed to write snapshot"))?;
        file.sync_all()
            .map_err(|e| classify_io_error(e, "Failed to sync snapshot"))?;

        // Atomic rename
        fs::rename(&temp_path, &final_path)
            .map_err(|e| classify_io_error(e, "Failed to rename snapshot file"))
    }
}

fn checksum(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

fn collection_file_name(name: &str, generation: u64) -> Result<String, StoreError> {
    validate_name("collection", name)?;
    Ok(format!("{}.{}.json", name, generation))
}
