//! Core Storage Collaborator Traits
//!
//! The loading system talks to storage through exactly two capabilities:
//! `query` (rows of one table matching a filter) and `join` (rows of one
//! table with a tree of relationship paths populated, in one round trip).
//! A connection is acquired once per unit of work and released when it is
//! dropped.

use async_trait::async_trait;

use crate::error::OrmResult;
use crate::query::Filter;
use crate::record::Record;
use crate::relationships::ResolvedPath;

/// Abstract storage connection: every call is one round trip
#[async_trait]
pub trait DatabaseConnection: Send {
    /// Rows of `table` matching `filter`
    async fn query(&mut self, table: &str, filter: &Filter) -> OrmResult<Vec<Record>>;

    /// Rows of `table` matching `filter`, with every path in `paths` populated
    async fn join(&mut self, table: &str, paths: &[ResolvedPath], filter: &Filter) -> OrmResult<Vec<Record>>;
}

/// Abstract connection pool
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Acquire a connection; it is returned to the pool when dropped
    async fn acquire(&self) -> OrmResult<Box<dyn DatabaseConnection>>;

    /// Get pool statistics
    fn stats(&self) -> DatabasePoolStats;

    /// Which backend this is, for logs
    fn backend_type(&self) -> DatabaseBackendType;
}

/// Pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatabasePoolStats {
    /// Connections handed out so far
    pub acquired: u64,
    /// Connections given back so far
    pub released: u64,
    /// Round trips completed over all connections
    pub round_trips: u64,
}

impl DatabasePoolStats {
    /// Connections currently checked out
    pub fn active(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

/// Backend type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseBackendType {
    PostgreSQL,
    Memory,
}

impl DatabaseBackendType {
    /// Pick the backend a connection URL asks for; no URL means in-memory
    pub fn from_url(url: Option<&str>) -> Result<Self, String> {
        match url {
            None => Ok(DatabaseBackendType::Memory),
            Some(url) => {
                let scheme = url.split_once("://").map(|(scheme, _)| scheme).unwrap_or(url);
                scheme.parse()
            }
        }
    }
}

impl std::fmt::Display for DatabaseBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseBackendType::PostgreSQL => write!(f, "postgresql"),
            DatabaseBackendType::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for DatabaseBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(DatabaseBackendType::PostgreSQL),
            "memory" | "mem" => Ok(DatabaseBackendType::Memory),
            _ => Err(format!("Unsupported database backend: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_url() {
        assert_eq!(DatabaseBackendType::from_url(None), Ok(DatabaseBackendType::Memory));
        assert_eq!(
            DatabaseBackendType::from_url(Some("postgres://localhost/catalog")),
            Ok(DatabaseBackendType::PostgreSQL)
        );
        assert_eq!(DatabaseBackendType::from_url(Some("memory")), Ok(DatabaseBackendType::Memory));
        assert!(DatabaseBackendType::from_url(Some("mysql://localhost/catalog")).is_err());
    }

    #[test]
    fn test_pool_stats_active() {
        let stats = DatabasePoolStats { acquired: 3, released: 2, round_trips: 7 };
        assert_eq!(stats.active(), 1);
        assert_eq!(DatabasePoolStats::default().active(), 0);
    }
}
