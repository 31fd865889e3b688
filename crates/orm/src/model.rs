//! Model trait - typed views over records
//!
//! Models are read-only here: they describe a table, declare its
//! relationships, and decode from a [`Record`] through serde.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ModelResult;
use crate::record::Record;
use crate::relationships::RelationshipMetadata;

/// Core trait for database models
pub trait Model: Serialize + DeserializeOwned + Send + Sync + Sized {
    /// Table name for this model
    fn table_name() -> &'static str;

    /// Primary key value
    fn primary_key(&self) -> i64;

    /// Relationships this model declares, keyed by relationship name
    fn relationships() -> Vec<RelationshipMetadata> {
        Vec::new()
    }

    /// Decode a model from a record's column values. Relations are ignored.
    fn from_record(record: &Record) -> ModelResult<Self> {
        Ok(serde_json::from_value(Value::Object(record.fields().clone()))?)
    }

    /// Column values for this model
    fn to_fields(&self) -> ModelResult<serde_json::Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(crate::error::ModelError::Serialization(format!(
                "Model for '{}' serialized to {} instead of an object",
                Self::table_name(),
                other
            ))),
        }
    }
}
