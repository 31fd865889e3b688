//! Fetch requests

use crate::model::Model;
use crate::query::Filter;
use crate::relationships::PathSpec;

/// What to fetch: a root table, a root filter, and the relationship paths to bring along
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub table: String,
    pub filter: Filter,
    /// Paths in request order; explicit loading issues its queries in this order
    pub paths: Vec<PathSpec>,
    /// Exactly one root must match
    pub single: bool,
}

impl FetchRequest {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            filter: Filter::all(),
            paths: Vec::new(),
            single: false,
        }
    }

    pub fn for_model<M: Model>() -> Self {
        Self::new(M::table_name())
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = self.filter.and(filter);
        self
    }

    pub fn with(mut self, path: &str) -> Self {
        self.paths.push(PathSpec::new(path));
        self
    }

    /// Load `path`, keeping only related rows that also match `filter`
    pub fn with_filtered(mut self, path: &str, filter: Filter) -> Self {
        self.paths.push(PathSpec::filtered(path, filter));
        self
    }

    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn path_names(&self) -> Vec<&str> {
        self.paths.iter().map(|spec| spec.path.as_str()).collect()
    }
}
