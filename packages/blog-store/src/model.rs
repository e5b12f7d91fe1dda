//! Blog post model types and their mapping to documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{Document, Fields};
use crate::error::StoreError;
use crate::object_id::ObjectId;

/// Post author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub first_name: String,
    pub last_name: String,
}

impl Author {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// "First Last", trimmed when either part is empty.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A stored blog post as exposed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    /// Store-assigned identifier
    pub id: ObjectId,
    pub author: Author,
    pub title: String,
    pub content: String,
}

impl BlogPost {
    /// Maps a stored document to a post.
    pub fn from_document(document: &Document) -> Result<Self, StoreError> {
        let NewBlogPost {
            author,
            title,
            content,
        } = NewBlogPost::from_fields(&document.fields)?;
        Ok(Self {
            id: document.id,
            author,
            title,
            content,
        })
    }
}

/// Input for creating a post. All fields are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBlogPost {
    pub author: Author,
    pub title: String,
    pub content: String,
}

impl NewBlogPost {
    /// Fields a create request must carry, in the order they are checked.
    pub const REQUIRED_FIELDS: [&'static str; 3] = ["title", "content", "author"];

    pub fn new(author: Author, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author,
            title: title.into(),
            content: content.into(),
        }
    }

    /// Validates a JSON body, naming the first missing required field.
    pub fn from_value(value: &Value) -> Result<Self, StoreError> {
        match value {
            Value::Object(map) => Self::from_fields(map),
            _ => Err(StoreError::Validation(
                "request body must be a JSON object".to_string(),
            )),
        }
    }

    fn from_fields(fields: &Map<String, Value>) -> Result<Self, StoreError> {
        for field in Self::REQUIRED_FIELDS {
            if fields.get(field).map_or(true, Value::is_null) {
                return Err(StoreError::MissingField(field));
            }
        }
        let mut known = Map::with_capacity(Self::REQUIRED_FIELDS.len());
        for field in Self::REQUIRED_FIELDS {
            if let Some(value) = fields.get(field) {
                known.insert(field.to_string(), value.clone());
            }
        }
        serde_json::from_value(Value::Object(known))
            .map_err(|e| StoreError::Validation(e.to_string()))
    }

    /// Document body for this post.
    pub fn into_fields(self) -> Result<Fields, StoreError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StoreError::SerializationError(
                "post did not serialize to an object".to_string(),
            )),
            Err(e) => Err(StoreError::SerializationError(e.to_string())),
        }
    }
}

/// Partial update of a post. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPostPatch {
    /// Must equal the target id when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl BlogPostPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn author(mut self, author: Author) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_id(mut self, id: ObjectId) -> Self {
        self.id = Some(id);
        self
    }

    /// Names of the fields this patch changes.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.author.is_some() {
            changed.push("author");
        }
        if self.title.is_some() {
            changed.push("title");
        }
        if self.content.is_some() {
            changed.push("content");
        }
        changed
    }

    /// True when no updatable field is set.
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    /// Document fields to set, excluding the identifier.
    pub fn into_fields(self) -> Result<Fields, StoreError> {
        let mut fields = Fields::new();
        if let Some(author) = self.author {
            let author = serde_json::to_value(author)
                .map_err(|e| StoreError::SerializationError(e.to_string()))?;
            fields.insert("author".to_string(), author);
        }
        if let Some(title) = self.title {
            fields.insert("title".to_string(), Value::String(title));
        }
        if let Some(content) = self.content {
            fields.insert("content".to_string(), Value::String(content));
        }
        Ok(fields)
    }
}
