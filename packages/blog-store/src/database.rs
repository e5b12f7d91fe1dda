//! Database container managing named document collections.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::config::StoreConfig;
use crate::document::{Document, Fields};
use crate::error::StoreError;
use crate::object_id::ObjectId;
use crate::persistence::SnapshotManager;

/// Documents of one collection, in insertion order.
pub type Collection = Vec<Document>;

/// Database container holding all collections.
#[derive(Debug)]
pub struct Database {
    /// Store configuration
    config: StoreConfig,
    /// Map of collection name to documents
    collections: RwLock<HashMap<String, Collection>>,
}

impl Database {
    /// Creates a new empty database.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Opens a database, loading any snapshot found under the configured data directory.
    ///
    /// # Returns
    /// `Result<Database, StoreError>` with `DataCorruption` if a snapshot fails
    /// checksum verification, `Validation` if the name is not a plain
    /// directory name.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let collections = match SnapshotManager::from_config(&config)? {
            Some(snapshots) => snapshots.load()?,
            None => HashMap::new(),
        };
        tracing::info!(
            "Opened database '{}' with {} collection(s)",
            config.name,
            collections.len()
        );
        Ok(Self {
            collections: RwLock::new(collections),
            config,
        })
    }

    /// Database name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Inserts a document into a collection, creating the collection if needed.
    ///
    /// # Returns
    /// `Result<ObjectId, StoreError>` with the document id, or `DuplicateId`.
    pub fn insert(&self, collection: &str, document: Document) -> Result<ObjectId, StoreError> {
        let mut collections = self.collections.write().map_err(|_| StoreError::LockPoisoned)?;
        let docs = collections
            .entry(collection.to_string())
            .or_insert_with(|| Vec::with_capacity(self.config.initial_collection_capacity));
        if docs.iter().any(|d| d.id == document.id) {
            return Err(StoreError::DuplicateId {
                collection: collection.to_string(),
                id: document.id.to_hex(),
            });
        }
        let id = document.id;
        docs.push(document);
        Ok(id)
    }

    /// Returns all documents of a collection. A missing collection is empty.
    pub fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    /// Finds a document by id.
    pub fn find_by_id(&self, collection: &str, id: &ObjectId) -> Result<Document, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::LockPoisoned)?;
        collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| &d.id == id))
            .cloned()
            .ok_or_else(|| not_found(collection, id))
    }

    /// Replaces the given top-level fields of a document.
    ///
    /// # Returns
    /// `Result<Document, StoreError>` with the document after the update.
    pub fn update_fields(
        &self,
        collection: &str,
        id: &ObjectId,
        updates: Fields,
    ) -> Result<Document, StoreError> {
        let mut collections = self.collections.write().map_err(|_| StoreError::LockPoisoned)?;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| &d.id == id))
            .ok_or_else(|| not_found(collection, id))?;
        doc.set_fields(updates);
        Ok(doc.clone())
    }

    /// Deletes a document by id.
    pub fn delete(&self, collection: &str, id: &ObjectId) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(|_| StoreError::LockPoisoned)?;
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| not_found(collection, id))?;
        let index = docs
            .iter()
            .position(|d| &d.id == id)
            .ok_or_else(|| not_found(collection, id))?;
        docs.remove(index);
        Ok(())
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(collections.get(collection).map_or(0, Vec::len))
    }

    /// Replaces a collection's contents in one step.
    pub fn replace_collection(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(|_| StoreError::LockPoisoned)?;
        collections.insert(collection.to_string(), documents);
        Ok(())
    }

    /// Appends documents to a collection, rejecting the whole batch on any duplicate id.
    pub fn append_collection(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(|_| StoreError::LockPoisoned)?;
        let docs = collections.entry(collection.to_string()).or_default();
        if let Some(dup) = documents
            .iter()
            .find(|new| docs.iter().any(|existing| existing.id == new.id))
        {
            return Err(StoreError::DuplicateId {
                collection: collection.to_string(),
                id: dup.id.to_hex(),
            });
        }
        docs.extend(documents);
        Ok(())
    }

    /// Drops a collection.
    ///
    /// # Returns
    /// `Result<bool, StoreError>` with true if the collection existed.
    pub fn drop_collection(&self, collection: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(collections.remove(collection).is_some())
    }

    /// Drops every collection and any snapshot files. Dropping an empty database is a no-op.
    pub fn drop_database(&self) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(|_| StoreError::LockPoisoned)?;
        let dropped = collections.len();
        collections.clear();
        if let Some(snapshots) = SnapshotManager::from_config(&self.config)? {
            snapshots.remove_all()?;
        }
        tracing::debug!(
            "Dropped database '{}' ({} collection(s))",
            self.config.name,
            dropped
        );
        Ok(())
    }

    /// Returns the names of all collections.
    pub fn collection_names(&self) -> Vec<String> {
        match self.collections.read() {
            Ok(collections) => collections.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Writes all collections to the data directory. No-op for in-memory databases.
    pub fn flush(&self) -> Result<(), StoreError> {
        let Some(snapshots) = SnapshotManager::from_config(&self.config)? else {
            return Ok(());
        };
        let collections = self.collections.read().map_err(|_| StoreError::LockPoisoned)?;
        snapshots.save(&collections)
    }
}

fn not_found(collection: &str, id: &ObjectId) -> StoreError {
    StoreError::DocumentNotFound {
        collection: collection.to_string(),
        id: id.to_hex(),
    }
}
