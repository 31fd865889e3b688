//! # loadkit-orm: relationship loading strategies
//!
//! Fetches course catalogue records together with their related records
//! using one of three strategies, and counts what each costs:
//!
//! - **Lazy**: roots now, each relationship on first access (N+1 prone)
//! - **Eager**: roots and every requested path in a single join
//! - **Explicit**: roots, then one batched query per requested path
//!
//! ```no_run
//! use loadkit_orm::{FetchRequest, Filter, LoadingConfig, LoadingStrategy, LoadingStrategyRunner};
//! use loadkit_orm::{course_catalog, Dataset, MemoryDatabase};
//! use std::sync::Arc;
//!
//! # async fn demo() -> loadkit_orm::ModelResult<()> {
//! let database = MemoryDatabase::with_dataset(Dataset::demo())?;
//! let runner = LoadingStrategyRunner::new(Arc::new(database), course_catalog()?, LoadingConfig::default());
//!
//! let request = FetchRequest::new("courses").filter(Filter::by_id(2)).with("Tags");
//! let outcome = runner.fetch(&request, LoadingStrategy::Eager).await?;
//! assert_eq!(outcome.round_trips, 1);
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod error;
pub mod loading;
pub mod model;
pub mod models;
pub mod query;
pub mod record;
pub mod relationships;
pub mod seeding;
pub mod sql;

pub use backends::{DatabaseBackendType, DatabaseConnection, DatabasePool, DatabasePoolStats, MemoryDatabase, PostgresPool};
pub use error::{ModelError, ModelResult, OrmError, OrmResult};
pub use loading::{
    FetchOutcome, FetchRequest, LoadingConfig, LoadingStrategy, LoadingStrategyRunner, QueryLogEntry, RoundTripKind,
    Session, StrategyReport,
};
pub use model::Model;
pub use models::{course_catalog, Address, Author, Course, Moderator, Tag};
pub use query::{Filter, QueryOperator, WhereCondition};
pub use record::{Record, Relation};
pub use relationships::{PathSpec, RelationshipMetadata, RelationshipRegistry, RelationshipType};
pub use seeding::Dataset;
