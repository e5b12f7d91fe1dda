//! Stored document representation.

use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::object_id::ObjectId;

/// Top-level document fields.
pub type Fields = Map<String, Value>;

/// Keys that carry the identifier and are never stored in `fields`.
const ID_KEYS: [&str; 2] = ["id", "_id"];

/// A document stored in a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-assigned identifier, immutable once assigned
    pub id: ObjectId,
    /// Document body without identifier keys
    pub fields: Fields,
}

impl Document {
    /// Creates a document, stripping any identifier keys from `fields`.
    pub fn new(id: ObjectId, mut fields: Fields) -> Self {
        for key in ID_KEYS {
            fields.remove(key);
        }
        Self { id, fields }
    }

    /// Builds a document from a JSON object.
    ///
    /// An identifier is taken from `id` or `_id` when present, either as a
    /// hex string or in extended JSON form (`{"$oid": "..."}`); otherwise a
    /// fresh one is generated.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        let fields = match value {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::Validation(format!(
                    "document must be a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let mut id = None;
        for key in ID_KEYS {
            if let Some(raw) = fields.get(key) {
                id = Some(parse_id_value(raw)?);
                break;
            }
        }

        Ok(Self::new(id.unwrap_or_default(), fields))
    }

    /// Renders the document as a JSON object with the identifier under `id`.
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len() + 1);
        map.insert("id".to_string(), Value::String(self.id.to_hex()));
        for (key, value) in &self.fields {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    /// Returns a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Replaces the given top-level fields, leaving all others untouched.
    ///
    /// Identifier keys in `updates` are ignored.
    pub fn set_fields(&mut self, updates: Fields) {
        for (key, value) in updates {
            if ID_KEYS.contains(&key.as_str()) {
                continue;
            }
            self.fields.insert(key, value);
        }
    }
}

fn parse_id_value(raw: &Value) -> Result<ObjectId, StoreError> {
    match raw {
        Value::String(s) => s.parse(),
        Value::Object(map) => match map.get("$oid") {
            Some(Value::String(s)) => s.parse(),
            _ => Err(StoreError::InvalidId(raw.to_string())),
        },
        other => Err(StoreError::InvalidId(other.to_string())),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
