//! Relationship Registry - Runtime metadata storage and path resolution

use std::collections::HashMap;
use std::sync::Arc;
use dashmap::DashMap;

use crate::error::{ModelError, ModelResult};
use crate::model::Model;
use super::metadata::RelationshipMetadata;

/// Thread-safe relationship registry: table -> relationship name -> metadata
#[derive(Debug, Clone, Default)]
pub struct RelationshipRegistry {
    relationships: Arc<DashMap<String, HashMap<String, RelationshipMetadata>>>,
}

impl RelationshipRegistry {
    /// Create a new empty relationship registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relationship under its parent table
    pub fn register(&self, metadata: RelationshipMetadata) -> ModelResult<()> {
        metadata.validate()?;

        let mut table_relationships = self
            .relationships
            .entry(metadata.parent_table.clone())
            .or_default();

        if table_relationships.contains_key(&metadata.name) {
            return Err(ModelError::Configuration(format!(
                "Relationship '{}' is already registered on '{}'",
                metadata.name, metadata.parent_table
            )));
        }

        table_relationships.insert(metadata.name.clone(), metadata);
        Ok(())
    }

    /// Register every relationship a model declares
    pub fn register_model<M: Model>(&self) -> ModelResult<()> {
        // Make the table known even when it declares nothing
        self.relationships.entry(M::table_name().to_string()).or_default();

        for metadata in M::relationships() {
            if metadata.parent_table != M::table_name() {
                return Err(ModelError::Configuration(format!(
                    "Relationship '{}' declared by '{}' names parent table '{}'",
                    metadata.name,
                    M::table_name(),
                    metadata.parent_table
                )));
            }
            self.register(metadata)?;
        }
        Ok(())
    }

    /// Get relationship metadata by table and relationship name
    pub fn get(&self, table: &str, relationship_name: &str) -> Option<RelationshipMetadata> {
        self.relationships
            .get(table)?
            .get(relationship_name)
            .cloned()
    }

    /// Check if a relationship exists
    pub fn has_relationship(&self, table: &str, relationship_name: &str) -> bool {
        self.relationships
            .get(table)
            .map(|relationships| relationships.contains_key(relationship_name))
            .unwrap_or(false)
    }

    /// Whether a table has been registered
    pub fn has_table(&self, table: &str) -> bool {
        self.relationships.contains_key(table)
    }

    /// Get all relationship names for a table, sorted
    pub fn relationship_names(&self, table: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .relationships
            .get(table)
            .map(|relationships| relationships.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Resolve a chain of segments starting at `table`.
    ///
    /// `path` is only used to name the offending path in the error.
    pub fn resolve_chain(
        &self,
        table: &str,
        segments: &[String],
        path: &str,
    ) -> ModelResult<Vec<RelationshipMetadata>> {
        let mut current = table.to_string();
        let mut chain = Vec::with_capacity(segments.len());

        for segment in segments {
            let metadata = self.get(&current, segment).ok_or_else(|| {
                ModelError::InvalidPath(format!(
                    "'{}' is not a relationship of '{}' (in path '{}')",
                    segment, current, path
                ))
            })?;
            current = metadata.related_table.clone();
            chain.push(metadata);
        }

        Ok(chain)
    }

    /// Total number of registered relationships
    pub fn len(&self) -> usize {
        self.relationships.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RelationshipRegistry {
        let registry = RelationshipRegistry::new();
        registry
            .register(RelationshipMetadata::belongs_to("courses", "Author", "authors", "author_id"))
            .unwrap();
        registry
            .register(RelationshipMetadata::has_one("authors", "Address", "addresses", "author_id"))
            .unwrap();
        registry
    }

    #[test]
    fn test_relationship_registration() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert!(registry.has_relationship("courses", "Author"));
        assert!(!registry.has_relationship("courses", "Tags"));
        assert_eq!(registry.relationship_names("authors"), vec!["Address".to_string()]);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = registry();
        let result = registry.register(RelationshipMetadata::belongs_to("courses", "Author", "authors", "author_id"));
        assert!(matches!(result, Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_resolve_chain() {
        let registry = registry();
        let segments = vec!["Author".to_string(), "Address".to_string()];
        let chain = registry.resolve_chain("courses", &segments, "Author.Address").unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].related_table, "addresses");
    }

    #[test]
    fn test_resolve_chain_unknown_segment() {
        let registry = registry();
        let segments = vec!["Author".to_string(), "Moderator".to_string()];
        let err = registry.resolve_chain("courses", &segments, "Author.Moderator").unwrap_err();
        assert_eq!(
            err,
            ModelError::InvalidPath(
                "'Moderator' is not a relationship of 'authors' (in path 'Author.Moderator')".to_string()
            )
        );
    }
}
