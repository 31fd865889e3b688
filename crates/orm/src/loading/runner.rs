//! Loading strategy runner - the entry point for fetching course data

use std::sync::Arc;
use serde::Serialize;
use tracing::info;
use loadkit_core::{AppConfig, AppConfigTrait};

use crate::backends::{DatabaseBackendType, DatabasePool, DatabasePoolStats, MemoryDatabase, PostgresPool};
use crate::error::{ModelError, ModelResult};
use crate::models::course_catalog;
use crate::record::Record;
use crate::relationships::{CacheMetrics, RelationshipRegistry};
use crate::seeding::Dataset;
use super::config::LoadingConfig;
use super::request::FetchRequest;
use super::session::Session;
use super::strategy::LoadingStrategy;

/// Records of a one-shot fetch with the round trips they cost
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub strategy: LoadingStrategy,
    pub records: Vec<Record>,
    pub round_trips: usize,
}

/// Round trips one strategy needed for a request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyReport {
    pub strategy: LoadingStrategy,
    pub roots: usize,
    pub round_trips: usize,
    /// Memo counters; only lazy loading uses the memo
    #[serde(skip)]
    pub lazy_cache: Option<CacheMetrics>,
}

pub struct LoadingStrategyRunner {
    pool: Arc<dyn DatabasePool>,
    registry: Arc<RelationshipRegistry>,
    config: LoadingConfig,
}

impl LoadingStrategyRunner {
    pub fn new(pool: Arc<dyn DatabasePool>, registry: RelationshipRegistry, config: LoadingConfig) -> Self {
        Self {
            pool,
            registry: Arc::new(registry),
            config,
        }
    }

    /// Runner over the course catalogue, backed by PostgreSQL when a
    /// database URL is configured and by the in-memory database otherwise
    pub async fn from_config(app: &AppConfig, config: LoadingConfig) -> ModelResult<Self> {
        app.validate()?;
        let backend = DatabaseBackendType::from_url(app.database_url.as_deref()).map_err(ModelError::Configuration)?;

        let pool: Arc<dyn DatabasePool> = match (backend, app.database_url.as_deref()) {
            (DatabaseBackendType::PostgreSQL, Some(url)) => {
                Arc::new(PostgresPool::connect(url, config.max_connections).await?)
            }
            _ => {
                let dataset = match &app.dataset_path {
                    Some(path) => Dataset::from_file(path).await?,
                    None => Dataset::demo(),
                };
                Arc::new(MemoryDatabase::with_dataset(dataset)?)
            }
        };

        info!(backend = %pool.backend_type(), default_strategy = %config.default_strategy, "loading runner ready");
        Ok(Self::new(pool, course_catalog()?, config))
    }

    pub fn registry(&self) -> &RelationshipRegistry {
        &self.registry
    }

    pub fn config(&self) -> &LoadingConfig {
        &self.config
    }

    pub fn pool_stats(&self) -> DatabasePoolStats {
        self.pool.stats()
    }

    /// Open a unit of work on its own connection
    pub async fn session(&self) -> ModelResult<Session> {
        let connection = self.pool.acquire().await?;
        Ok(Session::new(connection, Arc::clone(&self.registry), self.config.clone()))
    }

    /// Open a session, fetch, and release the session
    pub async fn fetch(&self, request: &FetchRequest, strategy: LoadingStrategy) -> ModelResult<FetchOutcome> {
        let mut session = self.session().await?;
        let records = session.fetch(request, strategy).await?;
        Ok(FetchOutcome {
            strategy,
            records,
            round_trips: session.round_trips(),
        })
    }

    /// [`fetch`](Self::fetch) with the configured default strategy
    pub async fn fetch_default(&self, request: &FetchRequest) -> ModelResult<FetchOutcome> {
        self.fetch(request, self.config.default_strategy).await
    }

    /// Run `request` under every strategy, each in a fresh session.
    ///
    /// Lazy touches every requested path of every root, so its count is the
    /// full on-demand cost.
    pub async fn compare(&self, request: &FetchRequest) -> ModelResult<Vec<StrategyReport>> {
        let mut reports = Vec::with_capacity(LoadingStrategy::ALL.len());

        for strategy in LoadingStrategy::ALL {
            let mut session = self.session().await?;
            let mut records = session.fetch(request, strategy).await?;

            let lazy_cache = if strategy == LoadingStrategy::Lazy {
                for root in records.iter_mut() {
                    for spec in &request.paths {
                        session.load_lazy(root, &spec.path).await?;
                    }
                }
                Some(session.lazy_cache_stats())
            } else {
                None
            };

            reports.push(StrategyReport {
                strategy,
                roots: records.len(),
                round_trips: session.round_trips(),
                lazy_cache,
            });
        }
        Ok(reports)
    }
}
