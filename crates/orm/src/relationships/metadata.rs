//! Relationship Metadata System - Core metadata definitions for relationships
//!
//! Every relationship is described by one pair of columns: `local_key` on the
//! parent row and `related_key` on the related row. Loading matches the two,
//! whatever the relationship type:
//!
//! | type       | local_key (parent)      | related_key (related)   |
//! |------------|-------------------------|-------------------------|
//! | BelongsTo  | foreign key column      | primary key             |
//! | HasOne     | primary key             | foreign key column      |
//! | HasMany    | primary key             | foreign key column      |
//! | ManyToMany | array of related ids    | primary key             |

use serde::{Deserialize, Serialize};
use crate::error::{ModelError, ModelResult};

/// Defines the type of relationship between models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    /// One-to-one relationship (hasOne)
    HasOne,
    /// One-to-many relationship (hasMany)
    HasMany,
    /// Many-to-one relationship (belongsTo)
    BelongsTo,
    /// Many-to-many relationship through an array of ids on the parent
    ManyToMany,
}

impl RelationshipType {
    /// Returns true if this relationship returns a collection
    pub fn is_collection(self) -> bool {
        matches!(self, Self::HasMany | Self::ManyToMany)
    }

    /// Returns true if the parent's local key holds an array of keys
    pub fn has_array_key(self) -> bool {
        matches!(self, Self::ManyToMany)
    }
}

/// Relationship metadata containing everything the loaders need
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipMetadata {
    /// The type of relationship
    pub relationship_type: RelationshipType,

    /// Name of the relationship as used in paths (e.g. "Author")
    pub name: String,

    /// Table declaring the relationship
    pub parent_table: String,

    /// The related model's table name
    pub related_table: String,

    /// Column on the parent row
    pub local_key: String,

    /// Column on the related row
    pub related_key: String,
}

impl RelationshipMetadata {
    /// Many-to-one: `parent.foreign_key -> related.id`
    pub fn belongs_to(parent_table: &str, name: &str, related_table: &str, foreign_key: &str) -> Self {
        Self::new(RelationshipType::BelongsTo, parent_table, name, related_table, foreign_key, "id")
    }

    /// One-to-one: `related.foreign_key -> parent.id`
    pub fn has_one(parent_table: &str, name: &str, related_table: &str, foreign_key: &str) -> Self {
        Self::new(RelationshipType::HasOne, parent_table, name, related_table, "id", foreign_key)
    }

    /// One-to-many: `related.foreign_key -> parent.id`
    pub fn has_many(parent_table: &str, name: &str, related_table: &str, foreign_key: &str) -> Self {
        Self::new(RelationshipType::HasMany, parent_table, name, related_table, "id", foreign_key)
    }

    /// Many-to-many: `parent.id_array[] -> related.id`
    pub fn many_to_many(parent_table: &str, name: &str, related_table: &str, id_array: &str) -> Self {
        Self::new(RelationshipType::ManyToMany, parent_table, name, related_table, id_array, "id")
    }

    fn new(
        relationship_type: RelationshipType,
        parent_table: &str,
        name: &str,
        related_table: &str,
        local_key: &str,
        related_key: &str,
    ) -> Self {
        Self {
            relationship_type,
            name: name.to_string(),
            parent_table: parent_table.to_string(),
            related_table: related_table.to_string(),
            local_key: local_key.to_string(),
            related_key: related_key.to_string(),
        }
    }

    pub fn is_collection(&self) -> bool {
        self.relationship_type.is_collection()
    }

    /// Validate the relationship metadata for consistency
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.is_empty() || self.name.contains('.') {
            return Err(ModelError::Configuration(format!(
                "Relationship name '{}' must be non-empty and contain no '.'",
                self.name
            )));
        }

        for (what, value) in [
            ("parent table", &self.parent_table),
            ("related table", &self.related_table),
            ("local key", &self.local_key),
            ("related key", &self.related_key),
        ] {
            if value.is_empty() {
                return Err(ModelError::Configuration(format!(
                    "Relationship '{}' must specify a {}",
                    self.name, what
                )));
            }
        }

        Ok(())
    }
}
