//! Lazy relationship cache - memo of on-demand loads within one session
//!
//! Keyed by (table, instance id, relationship). A hit means the relation was
//! already fetched once in this unit of work and must not cost another round
//! trip.

use std::collections::HashMap;

use crate::record::Relation;

/// Cache key for relationships
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    model_type: String,
    model_id: String,
    relationship: String,
}

impl CacheKey {
    pub fn new(model_type: &str, model_id: &str, relationship: &str) -> Self {
        Self {
            model_type: model_type.to_string(),
            model_id: model_id.to_string(),
            relationship: relationship.to_string(),
        }
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
}

impl CacheMetrics {
    /// Hit ratio in `[0.0, 1.0]`; zero lookups read as 0.0
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Per-session memo of lazily loaded relations
#[derive(Debug, Default)]
pub struct LazyCache {
    entries: HashMap<CacheKey, Relation>,
    metrics: CacheMetrics,
}

impl LazyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a relation, counting the hit or miss
    pub fn get(&mut self, key: &CacheKey) -> Option<&Relation> {
        match self.entries.get(key) {
            Some(relation) => {
                self.metrics.hits += 1;
                Some(relation)
            }
            None => {
                self.metrics.misses += 1;
                None
            }
        }
    }

    pub fn store(&mut self, key: CacheKey, relation: Relation) {
        self.entries.insert(key, relation);
        self.metrics.stores += 1;
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.metrics
    }
}
