//! Records - read-only snapshots returned by the storage collaborator
//!
//! A record is a table name, its column values, and whichever relations a
//! loading strategy has populated so far. Reading a relation that was never
//! populated fails with [`ModelError::NotLoaded`] rather than pretending it
//! is empty.

use std::collections::BTreeMap;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{ModelError, ModelResult};
use crate::model::Model;

/// A populated relationship
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// Single-valued relationship (belongsTo, hasOne); `None` when the reference is null
    One(Option<Box<Record>>),
    /// Collection-valued relationship (hasMany, manyToMany)
    Many(Vec<Record>),
}

impl Relation {
    /// Records held by the relation, in order
    pub fn records(&self) -> Vec<&Record> {
        match self {
            Relation::One(Some(record)) => vec![record.as_ref()],
            Relation::One(None) => Vec::new(),
            Relation::Many(records) => records.iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Relation::One(record) => usize::from(record.is_some()),
            Relation::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn records_mut(&mut self) -> Vec<&mut Record> {
        match self {
            Relation::One(Some(record)) => vec![record.as_mut()],
            Relation::One(None) => Vec::new(),
            Relation::Many(records) => records.iter_mut().collect(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Relation::One(Some(record)) => record.to_json(),
            Relation::One(None) => Value::Null,
            Relation::Many(records) => Value::Array(records.iter().map(Record::to_json).collect()),
        }
    }
}

/// A row from the storage collaborator plus its populated relations
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    table: String,
    fields: Map<String, Value>,
    relations: BTreeMap<String, Relation>,
}

impl Record {
    pub fn new(table: &str, fields: Map<String, Value>) -> Self {
        Self {
            table: table.to_string(),
            fields,
            relations: BTreeMap::new(),
        }
    }

    /// Build a record from a JSON object
    pub fn from_json(table: &str, value: Value) -> ModelResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self::new(table, fields)),
            other => Err(ModelError::Serialization(format!(
                "Expected a JSON object for a '{}' row, got {}",
                table, other
            ))),
        }
    }

    /// Build a record from a typed model
    pub fn from_model<M: Model>(model: &M) -> ModelResult<Self> {
        Ok(Self::new(M::table_name(), model.to_fields()?))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Raw column value
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Typed column value
    pub fn value<T: DeserializeOwned>(&self, column: &str) -> ModelResult<T> {
        let value = self.fields.get(column).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| {
            ModelError::Serialization(format!("Column '{}.{}': {}", self.table, column, e))
        })
    }

    /// Primary key value
    pub fn id(&self) -> ModelResult<&Value> {
        match self.fields.get("id") {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(ModelError::Database(format!(
                "Record from '{}' has no primary key",
                self.table
            ))),
        }
    }

    /// Stable identity of this instance within its table
    pub fn identity(&self) -> ModelResult<String> {
        Ok(crate::relationships::hydration::key_string(self.id()?))
    }

    /// Decode the record into a typed model
    pub fn decode<M: Model>(&self) -> ModelResult<M> {
        M::from_record(self)
    }

    /// Whether a relation has been populated
    pub fn is_loaded(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Names of the populated relations
    pub fn loaded_relations(&self) -> Vec<&str> {
        self.relations.keys().map(String::as_str).collect()
    }

    /// A populated relation; fails fast when it was not loaded
    pub fn related(&self, name: &str) -> ModelResult<&Relation> {
        self.relations
            .get(name)
            .ok_or_else(|| ModelError::NotLoaded(format!("{}.{}", self.table, name)))
    }

    /// A populated single-valued relation
    pub fn related_one(&self, name: &str) -> ModelResult<Option<&Record>> {
        match self.related(name)? {
            Relation::One(record) => Ok(record.as_deref()),
            Relation::Many(_) => Err(ModelError::InvalidPath(format!(
                "'{}.{}' is a collection, not a single record",
                self.table, name
            ))),
        }
    }

    /// A populated collection-valued relation
    pub fn related_many(&self, name: &str) -> ModelResult<&[Record]> {
        match self.related(name)? {
            Relation::Many(records) => Ok(records),
            Relation::One(_) => Err(ModelError::InvalidPath(format!(
                "'{}.{}' is a single record, not a collection",
                self.table, name
            ))),
        }
    }

    /// Follow a dotted path of populated relations, collecting every record at its end
    pub fn related_path(&self, path: &str) -> ModelResult<Vec<&Record>> {
        let mut frontier = vec![self];
        for segment in path.split('.') {
            let mut next = Vec::new();
            for record in frontier {
                next.extend(record.related(segment)?.records());
            }
            frontier = next;
        }
        Ok(frontier)
    }

    /// Decode the models held by a populated relation
    pub fn related_models<M: Model>(&self, name: &str) -> ModelResult<Vec<M>> {
        self.related(name)?.records().into_iter().map(|record| record.decode::<M>()).collect()
    }

    pub fn set_relation(&mut self, name: &str, relation: Relation) {
        self.relations.insert(name.to_string(), relation);
    }

    pub(crate) fn relation_mut(&mut self, name: &str) -> Option<&mut Relation> {
        self.relations.get_mut(name)
    }

    /// JSON view: columns plus populated relations under their names
    pub fn to_json(&self) -> Value {
        let mut object = self.fields.clone();
        for (name, relation) in &self.relations {
            object.insert(name.clone(), relation.to_json());
        }
        Value::Object(object)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
