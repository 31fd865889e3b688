//! Relationship paths - parsing and resolution of dotted include paths
//!
//! `"Author"`, `"Author.Address"` and `"Tags.Moderator"` are parsed once into
//! a tree of segment names. Requested paths that share a prefix share a node,
//! so `["Author", "Author.Address"]` becomes one `Author` node with an
//! `Address` child. Resolution walks the tree against the registry and yields
//! [`ResolvedPath`]s, which is what backends consume.

use crate::error::{ModelError, ModelResult};
use crate::query::Filter;
use super::metadata::RelationshipMetadata;
use super::registry::RelationshipRegistry;

/// A requested relationship path with an optional filter on its last segment
#[derive(Debug, Clone, PartialEq)]
pub struct PathSpec {
    pub path: String,
    pub filter: Option<Filter>,
}

impl PathSpec {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            filter: None,
        }
    }

    pub fn filtered(path: &str, filter: Filter) -> Self {
        Self {
            path: path.to_string(),
            filter: Some(filter),
        }
    }

    /// Split the path into its segments
    pub fn segments(&self) -> ModelResult<Vec<String>> {
        parse_segments(&self.path)
    }
}

/// Split a dotted path, rejecting empty segments
pub fn parse_segments(path: &str) -> ModelResult<Vec<String>> {
    let segments: Vec<String> = path.split('.').map(|s| s.trim().to_string()).collect();
    if segments.iter().any(String::is_empty) {
        return Err(ModelError::InvalidPath(format!(
            "Path '{}' contains an empty segment",
            path
        )));
    }
    Ok(segments)
}

/// One node of an unresolved path tree
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathNode {
    pub name: String,
    pub filter: Option<Filter>,
    pub children: Vec<PathNode>,
}

/// Unresolved tree of requested relationship paths
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathTree {
    roots: Vec<PathNode>,
}

impl PathTree {
    /// Build a tree from requested paths, merging shared prefixes.
    ///
    /// Filters attach to the last segment of their path; two filters landing
    /// on the same node are ANDed.
    pub fn from_specs(specs: &[PathSpec]) -> ModelResult<Self> {
        let mut tree = PathTree::default();
        for spec in specs {
            let segments = spec.segments()?;
            insert(&mut tree.roots, &segments, spec.filter.as_ref());
        }
        Ok(tree)
    }

    pub fn nodes(&self) -> &[PathNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Resolve every node against the registry, starting at `table`
    pub fn resolve(&self, table: &str, registry: &RelationshipRegistry) -> ModelResult<Vec<ResolvedPath>> {
        resolve_nodes(&self.roots, table, registry, "")
    }
}

fn insert(nodes: &mut Vec<PathNode>, segments: &[String], filter: Option<&Filter>) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };

    let index = match nodes.iter().position(|node| &node.name == first) {
        Some(index) => index,
        None => {
            nodes.push(PathNode {
                name: first.clone(),
                ..PathNode::default()
            });
            nodes.len() - 1
        }
    };
    let node = &mut nodes[index];

    if rest.is_empty() {
        if let Some(filter) = filter {
            node.filter = Some(match node.filter.take() {
                Some(existing) => existing.and(filter.clone()),
                None => filter.clone(),
            });
        }
    } else {
        insert(&mut node.children, rest, filter);
    }
}

fn resolve_nodes(
    nodes: &[PathNode],
    table: &str,
    registry: &RelationshipRegistry,
    prefix: &str,
) -> ModelResult<Vec<ResolvedPath>> {
    nodes
        .iter()
        .map(|node| {
            let path = if prefix.is_empty() {
                node.name.clone()
            } else {
                format!("{}.{}", prefix, node.name)
            };
            let metadata = registry.get(table, &node.name).ok_or_else(|| {
                ModelError::InvalidPath(format!(
                    "'{}' is not a relationship of '{}' (in path '{}')",
                    node.name, table, path
                ))
            })?;
            let children = resolve_nodes(&node.children, &metadata.related_table, registry, &path)?;
            Ok(ResolvedPath {
                metadata,
                filter: node.filter.clone().unwrap_or_default(),
                children,
            })
        })
        .collect()
}

/// A relationship path node bound to its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    pub metadata: RelationshipMetadata,
    /// Extra predicate on the related rows; `Filter::all()` when none was given
    pub filter: Filter,
    pub children: Vec<ResolvedPath>,
}

impl ResolvedPath {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Dotted names of every leaf path below and including this node
    pub fn leaf_paths(&self) -> Vec<String> {
        if self.children.is_empty() {
            return vec![self.metadata.name.clone()];
        }
        self.children
            .iter()
            .flat_map(ResolvedPath::leaf_paths)
            .map(|child| format!("{}.{}", self.metadata.name, child))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RelationshipRegistry {
        let registry = RelationshipRegistry::new();
        for metadata in [
            RelationshipMetadata::belongs_to("courses", "Author", "authors", "author_id"),
            RelationshipMetadata::many_to_many("courses", "Tags", "tags", "tag_ids"),
            RelationshipMetadata::has_one("authors", "Address", "addresses", "author_id"),
            RelationshipMetadata::belongs_to("tags", "Moderator", "moderators", "moderator_id"),
        ] {
            registry.register(metadata).unwrap();
        }
        registry
    }

    #[test]
    fn test_parse_segments() {
        assert_eq!(parse_segments("Author.Address").unwrap(), vec!["Author", "Address"]);
        assert!(matches!(parse_segments("Author..Address"), Err(ModelError::InvalidPath(_))));
        assert!(matches!(parse_segments(""), Err(ModelError::InvalidPath(_))));
    }

    #[test]
    fn test_shared_prefixes_merge() {
        let tree = PathTree::from_specs(&[
            PathSpec::new("Author"),
            PathSpec::new("Author.Address"),
            PathSpec::new("Tags.Moderator"),
        ])
        .unwrap();

        assert_eq!(tree.nodes().len(), 2);
        assert_eq!(tree.nodes()[0].name, "Author");
        assert_eq!(tree.nodes()[0].children.len(), 1);
        assert_eq!(tree.nodes()[1].children[0].name, "Moderator");
    }

    #[test]
    fn test_filters_attach_to_last_segment() {
        let tree = PathTree::from_specs(&[
            PathSpec::filtered("Tags", Filter::all().where_ne("name", "legacy")),
            PathSpec::filtered("Tags", Filter::all().where_gt("id", 1)),
        ])
        .unwrap();

        let filter = tree.nodes()[0].filter.as_ref().unwrap();
        assert_eq!(filter.conditions().len(), 2);
    }

    #[test]
    fn test_resolve_tree() {
        let tree = PathTree::from_specs(&[PathSpec::new("Author.Address"), PathSpec::new("Tags.Moderator")]).unwrap();
        let resolved = tree.resolve("courses", &registry()).unwrap();

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].metadata.related_table, "authors");
        assert_eq!(resolved[0].children[0].metadata.related_table, "addresses");
        assert!(resolved[1].filter.is_all());
        assert_eq!(resolved[1].leaf_paths(), vec!["Tags.Moderator".to_string()]);
    }

    #[test]
    fn test_resolve_reports_full_path() {
        let tree = PathTree::from_specs(&[PathSpec::new("Tags.Address")]).unwrap();
        let err = tree.resolve("courses", &registry()).unwrap_err();
        assert_eq!(
            err,
            ModelError::InvalidPath("'Address' is not a relationship of 'tags' (in path 'Tags.Address')".to_string())
        );
    }
}
