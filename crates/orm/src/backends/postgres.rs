//! PostgreSQL Backend Implementation
//!
//! Implements the storage capabilities on top of a sqlx pool. Statements come
//! from [`crate::sql`] and always return one jsonb `record` column.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};

use crate::error::{OrmError, OrmResult};
use crate::query::Filter;
use crate::record::Record;
use crate::relationships::{hydrate_joined, ResolvedPath};
use crate::sql::{join_sql, select_sql, SqlStatement};
use super::core::{DatabaseBackendType, DatabaseConnection, DatabasePool, DatabasePoolStats};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct PoolCounters {
    acquired: AtomicU64,
    released: AtomicU64,
    round_trips: AtomicU64,
}

/// PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PostgresPool {
    pool: PgPool,
    counters: Arc<PoolCounters>,
}

impl PostgresPool {
    /// Connect to `database_url` with at most `max_connections` connections
    pub async fn connect(database_url: &str, max_connections: u32) -> OrmResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing sqlx pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            counters: Arc::new(PoolCounters::default()),
        }
    }
}

#[async_trait]
impl DatabasePool for PostgresPool {
    async fn acquire(&self) -> OrmResult<Box<dyn DatabaseConnection>> {
        let conn = self.pool.acquire().await?;
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(PostgresConnection {
            conn,
            counters: Arc::clone(&self.counters),
        }))
    }

    fn stats(&self) -> DatabasePoolStats {
        DatabasePoolStats {
            acquired: self.counters.acquired.load(Ordering::SeqCst),
            released: self.counters.released.load(Ordering::SeqCst),
            round_trips: self.counters.round_trips.load(Ordering::SeqCst),
        }
    }

    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::PostgreSQL
    }
}

/// PostgreSQL connection; returned to the pool on drop
pub struct PostgresConnection {
    conn: PoolConnection<Postgres>,
    counters: Arc<PoolCounters>,
}

impl PostgresConnection {
    async fn fetch_documents(&mut self, statement: &SqlStatement) -> OrmResult<Vec<Value>> {
        let query = bind_params(sqlx::query(&statement.sql), &statement.params)?;
        let rows = query.fetch_all(&mut *self.conn).await?;
        self.counters.round_trips.fetch_add(1, Ordering::SeqCst);

        rows.iter()
            .map(|row| row.try_get::<Value, _>("record").map_err(OrmError::from))
            .collect()
    }
}

#[async_trait]
impl DatabaseConnection for PostgresConnection {
    async fn query(&mut self, table: &str, filter: &Filter) -> OrmResult<Vec<Record>> {
        let statement = select_sql(table, filter);
        self.fetch_documents(&statement)
            .await?
            .into_iter()
            .map(|document| Record::from_json(table, document))
            .collect()
    }

    async fn join(&mut self, table: &str, paths: &[ResolvedPath], filter: &Filter) -> OrmResult<Vec<Record>> {
        let statement = join_sql(table, paths, filter);
        self.fetch_documents(&statement)
            .await?
            .into_iter()
            .map(|document| hydrate_joined(table, document, paths))
            .collect()
    }
}

impl Drop for PostgresConnection {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Bind JSON parameters as their natural PostgreSQL types
fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [Value],
) -> OrmResult<Query<'q, Postgres, PgArguments>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<i64>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    query.bind(i)
                } else if let Some(f) = n.as_f64() {
                    query.bind(f)
                } else {
                    return Err(OrmError::Database(format!("Invalid number parameter: {}", n)));
                }
            }
            Value::String(s) => query.bind(s.as_str()),
            other => {
                return Err(OrmError::Database(format!("Unsupported parameter type: {}", other)));
            }
        };
    }
    Ok(query)
}
