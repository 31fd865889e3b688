//! Relationships Module - metadata, path resolution, hydration and the lazy memo

pub mod cache;
pub mod hydration;
pub mod metadata;
pub mod path;
pub mod registry;

pub use cache::{CacheKey, CacheMetrics, LazyCache};
pub use hydration::{attach, distinct_key_values, hydrate_joined, key_string, key_values, RelatedIndex};
pub use metadata::{RelationshipMetadata, RelationshipType};
pub use path::{parse_segments, PathNode, PathSpec, PathTree, ResolvedPath};
pub use registry::RelationshipRegistry;
