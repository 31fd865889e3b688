//! Unit of work
//!
//! A [`Session`] owns one connection for its whole life, the lazy memo and a
//! log of every round trip it sent. All loading strategies run here:
//!
//! - **Lazy** fetches roots only; [`Session::load_lazy`] brings a path in on
//!   demand, one round trip per (instance, segment) the first time.
//! - **Eager** sends a single `join` for roots and every requested path.
//! - **Explicit** fetches roots, then sends one batched query per distinct
//!   path, in request order.
//!
//! The connection goes back to the pool when the session is dropped, whether
//! or not its last call succeeded.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::backends::DatabaseConnection;
use crate::error::{ModelError, ModelResult};
use crate::query::Filter;
use crate::record::{Record, Relation};
use crate::relationships::{
    attach, distinct_key_values, key_values, parse_segments, CacheKey, CacheMetrics, LazyCache, PathTree,
    RelatedIndex, RelationshipMetadata, RelationshipRegistry,
};
use super::config::LoadingConfig;
use super::request::FetchRequest;
use super::strategy::LoadingStrategy;

/// Which storage capability a round trip used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundTripKind {
    Query,
    Join,
}

impl fmt::Display for RoundTripKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundTripKind::Query => write!(f, "query"),
            RoundTripKind::Join => write!(f, "join"),
        }
    }
}

/// One completed round trip
#[derive(Debug, Clone, PartialEq)]
pub struct QueryLogEntry {
    pub kind: RoundTripKind,
    pub table: String,
    /// Rendered root filter
    pub filter: String,
    /// Leaf paths populated by a join; empty for plain queries
    pub paths: Vec<String>,
    pub rows: usize,
}

/// One step of an explicit load: populate `metadata` on every record reached through `prefix`
struct ExplicitStep {
    path: String,
    prefix: Vec<String>,
    metadata: RelationshipMetadata,
    filter: Filter,
}

pub struct Session {
    id: Uuid,
    connection: Box<dyn DatabaseConnection>,
    registry: Arc<RelationshipRegistry>,
    config: LoadingConfig,
    cache: LazyCache,
    log: Vec<QueryLogEntry>,
    roots_fetched: usize,
    lazy_round_trips: usize,
    warned_n_plus_one: bool,
    span: Span,
}

impl Session {
    pub fn new(
        connection: Box<dyn DatabaseConnection>,
        registry: Arc<RelationshipRegistry>,
        config: LoadingConfig,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            connection,
            registry,
            config,
            cache: LazyCache::new(),
            log: Vec::new(),
            roots_fetched: 0,
            lazy_round_trips: 0,
            warned_n_plus_one: false,
            span: info_span!("session", id = %id),
        }
    }

    /// Round trips sent so far
    pub fn round_trips(&self) -> usize {
        self.log.len()
    }

    pub fn query_log(&self) -> &[QueryLogEntry] {
        &self.log
    }

    pub fn lazy_cache_stats(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    /// Fetch the roots `request` names, populated according to `strategy`
    pub async fn fetch(&mut self, request: &FetchRequest, strategy: LoadingStrategy) -> ModelResult<Vec<Record>> {
        let span = self.span.clone();
        async move {
            let before = self.round_trips();
            let records = match strategy {
                LoadingStrategy::Lazy => self.fetch_lazy(request).await?,
                LoadingStrategy::Eager => self.fetch_eager(request).await?,
                LoadingStrategy::Explicit => self.fetch_explicit(request).await?,
            };
            self.roots_fetched += records.len();

            info!(
                strategy = %strategy,
                table = %request.table,
                roots = records.len(),
                round_trips = self.round_trips() - before,
                "fetch completed"
            );
            Ok(records)
        }
        .instrument(span)
        .await
    }

    /// Fetch exactly one root
    pub async fn fetch_one(&mut self, request: &FetchRequest, strategy: LoadingStrategy) -> ModelResult<Record> {
        let request = request.clone().single();
        let mut records = self.fetch(&request, strategy).await?;
        records.pop().ok_or(ModelError::NotFound(request.table))
    }

    /// Populate `path` on `root` on demand.
    ///
    /// Each segment is memoized per (table, id, relationship): the first
    /// access for an instance costs one round trip, repeats cost none.
    /// Segments already populated by another strategy are left as they are.
    pub async fn load_lazy(&mut self, root: &mut Record, path: &str) -> ModelResult<()> {
        let span = self.span.clone();
        async move {
            let segments = parse_segments(path)?;
            let chain = self.registry.resolve_chain(root.table(), &segments, path)?;

            let mut frontier: Vec<&mut Record> = vec![root];
            for metadata in &chain {
                for record in frontier.iter_mut() {
                    self.load_segment(record, metadata).await?;
                }
                frontier = frontier
                    .into_iter()
                    .filter_map(|record| record.relation_mut(&metadata.name))
                    .flat_map(Relation::records_mut)
                    .collect();
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn load_segment(&mut self, record: &mut Record, metadata: &RelationshipMetadata) -> ModelResult<()> {
        if record.is_loaded(&metadata.name) {
            return Ok(());
        }

        let key = CacheKey::new(record.table(), &record.identity()?, &metadata.name);
        if let Some(relation) = self.cache.get(&key) {
            record.set_relation(&metadata.name, relation.clone());
            return Ok(());
        }

        let filter = Filter::all().where_in(&metadata.related_key, key_values(record, &metadata.local_key));
        let related = self.query(&metadata.related_table, &filter).await?;
        let relation = RelatedIndex::new(&related, &metadata.related_key).relation_for(metadata, record);

        self.cache.store(key, relation.clone());
        record.set_relation(&metadata.name, relation);

        self.lazy_round_trips += 1;
        if self.lazy_round_trips > self.roots_fetched && !self.warned_n_plus_one {
            self.warned_n_plus_one = true;
            warn!(
                lazy_round_trips = self.lazy_round_trips,
                roots = self.roots_fetched,
                relationship = %format!("{}.{}", metadata.parent_table, metadata.name),
                "lazy loading has issued more round trips than roots fetched (N+1)"
            );
        }
        Ok(())
    }

    async fn fetch_lazy(&mut self, request: &FetchRequest) -> ModelResult<Vec<Record>> {
        // Paths are loaded later, but an unknown one must still fail before any query
        PathTree::from_specs(&request.paths)?.resolve(&request.table, &self.registry)?;

        let roots = self.query(&request.table, &request.filter).await?;
        check_singleton(request, roots.len())?;
        Ok(roots)
    }

    async fn fetch_eager(&mut self, request: &FetchRequest) -> ModelResult<Vec<Record>> {
        let paths = PathTree::from_specs(&request.paths)?.resolve(&request.table, &self.registry)?;

        let roots = self.connection.join(&request.table, &paths, &request.filter).await?;
        let leaves: Vec<String> = paths.iter().flat_map(|path| path.leaf_paths()).collect();
        self.record(RoundTripKind::Join, &request.table, &request.filter, leaves, roots.len());

        check_singleton(request, roots.len())?;
        Ok(roots)
    }

    async fn fetch_explicit(&mut self, request: &FetchRequest) -> ModelResult<Vec<Record>> {
        let plan = self.plan_explicit(request)?;

        let mut roots = self.query(&request.table, &request.filter).await?;
        check_singleton(request, roots.len())?;

        for step in plan {
            let keys = {
                let parents = records_at(&mut roots, &step.prefix);
                distinct_key_values(parents.into_iter().map(|parent| &*parent), &step.metadata.local_key)
            };
            debug!(path = %step.path, keys = keys.len(), "explicit path");

            let filter = Filter::all()
                .where_in(&step.metadata.related_key, keys)
                .and(step.filter);
            let related = self.query(&step.metadata.related_table, &filter).await?;
            attach(records_at(&mut roots, &step.prefix), &step.metadata, &related);
        }
        Ok(roots)
    }

    /// Distinct paths in request order, each resolved and checked against its prefix
    fn plan_explicit(&self, request: &FetchRequest) -> ModelResult<Vec<ExplicitStep>> {
        let mut steps: Vec<ExplicitStep> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for spec in &request.paths {
            let segments = spec.segments()?;
            let path = segments.join(".");

            if let Some(step) = steps.iter_mut().find(|step| step.path == path) {
                if let Some(filter) = &spec.filter {
                    step.filter = std::mem::take(&mut step.filter).and(filter.clone());
                }
                continue;
            }

            let chain = self.registry.resolve_chain(&request.table, &segments, &path)?;
            let prefix = segments[..segments.len() - 1].to_vec();
            if !prefix.is_empty() && !seen.contains(&prefix.join(".")) {
                return Err(ModelError::InvalidPath(format!(
                    "Path '{}' is missing its prefix '{}'; explicit loading needs it earlier in the request",
                    path,
                    prefix.join(".")
                )));
            }

            let Some(metadata) = chain.into_iter().last() else {
                continue;
            };
            seen.insert(path.clone());
            steps.push(ExplicitStep {
                path,
                prefix,
                metadata,
                filter: spec.filter.clone().unwrap_or_default(),
            });
        }
        Ok(steps)
    }

    async fn query(&mut self, table: &str, filter: &Filter) -> ModelResult<Vec<Record>> {
        let records = self.connection.query(table, filter).await?;
        self.record(RoundTripKind::Query, table, filter, Vec::new(), records.len());
        Ok(records)
    }

    fn record(&mut self, kind: RoundTripKind, table: &str, filter: &Filter, paths: Vec<String>, rows: usize) {
        if self.config.log_queries {
            debug!(kind = %kind, table, filter = %filter, rows, "round trip");
        }
        self.log.push(QueryLogEntry {
            kind,
            table: table.to_string(),
            filter: filter.to_string(),
            paths,
            rows,
        });
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("round_trips", &self.log.len())
            .field("roots_fetched", &self.roots_fetched)
            .finish()
    }
}

fn check_singleton(request: &FetchRequest, count: usize) -> ModelResult<()> {
    if !request.single {
        return Ok(());
    }
    match count {
        0 => Err(ModelError::NotFound(request.table.clone())),
        1 => Ok(()),
        count => Err(ModelError::AmbiguousSingleton {
            table: request.table.clone(),
            count,
        }),
    }
}

/// Every record reached from `roots` by following the populated `prefix`
fn records_at<'a>(roots: &'a mut [Record], prefix: &[String]) -> Vec<&'a mut Record> {
    let mut frontier: Vec<&'a mut Record> = roots.iter_mut().collect();
    for segment in prefix {
        frontier = frontier
            .into_iter()
            .filter_map(|record| record.relation_mut(segment))
            .flat_map(Relation::records_mut)
            .collect();
    }
    frontier
}
