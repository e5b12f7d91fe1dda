//! Blog post model layer over a document collection.

use std::path::Path;

use crate::database::Database;
use crate::document::Document;
use crate::error::StoreError;
use crate::import::{ImportMode, ImportReport};
use crate::model::{BlogPost, BlogPostPatch, NewBlogPost};
use crate::object_id::ObjectId;

/// Default collection holding blog posts.
pub const POSTS_COLLECTION: &str = "blogposts";

/// Typed access to the blog post collection.
#[derive(Debug, Clone, Copy)]
pub struct Posts<'a> {
    db: &'a Database,
    collection: &'a str,
}

impl<'a> Posts<'a> {
    /// Posts stored in the default collection.
    pub fn new(db: &'a Database) -> Self {
        Self::in_collection(db, POSTS_COLLECTION)
    }

    /// Posts stored in a named collection.
    pub fn in_collection(db: &'a Database, collection: &'a str) -> Self {
        Self { db, collection }
    }

    pub fn collection(&self) -> &str {
        self.collection
    }

    /// Stores a new post and returns it with its assigned id.
    pub fn create(&self, post: NewBlogPost) -> Result<BlogPost, StoreError> {
        let document = Document::new(ObjectId::new(), post.into_fields()?);
        let id = self.db.insert(self.collection, document)?;
        self.find_by_id(&id)
    }

    /// All posts in insertion order.
    pub fn find_all(&self) -> Result<Vec<BlogPost>, StoreError> {
        self.db
            .find_all(self.collection)?
            .iter()
            .map(BlogPost::from_document)
            .collect()
    }

    pub fn find_by_id(&self, id: &ObjectId) -> Result<BlogPost, StoreError> {
        BlogPost::from_document(&self.db.find_by_id(self.collection, id)?)
    }

    /// Applies a partial update.
    ///
    /// # Errors
    /// `Validation` when the patch carries a different id, `DocumentNotFound`
    /// for unknown ids.
    pub fn update(&self, id: &ObjectId, patch: BlogPostPatch) -> Result<BlogPost, StoreError> {
        if let Some(body_id) = patch.id {
            if &body_id != id {
                return Err(StoreError::Validation(format!(
                    "request path id ({}) and request body id ({}) must match",
                    id, body_id
                )));
            }
        }
        let updated = self
            .db
            .update_fields(self.collection, id, patch.into_fields()?)?;
        BlogPost::from_document(&updated)
    }

    pub fn delete(&self, id: &ObjectId) -> Result<(), StoreError> {
        self.db.delete(self.collection, id)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        self.db.count(self.collection)
    }

    /// Imports a fixture file, refusing it unless every record is a valid
    /// blog post. The collection is left unchanged on error.
    pub fn import_file(&self, path: &Path, mode: ImportMode) -> Result<ImportReport, StoreError> {
        self.db
            .import_file_with(self.collection, path, mode, |doc| {
                BlogPost::from_document(doc).map(|_| ())
            })
    }
}
